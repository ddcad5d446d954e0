use cabana_core::services::PartyService;

use crate::cli::WallCommands;
use crate::commands::common::{format_quote_lines, join_words, now_ms};
use crate::error::CliError;

pub async fn run_wall(service: &PartyService, command: WallCommands) -> Result<(), CliError> {
    match command {
        WallCommands::Add { author, text } => run_wall_add(service, &author, &text).await,
        WallCommands::List { limit, json } => run_wall_list(service, limit, json).await,
    }
}

pub async fn run_wall_add(
    service: &PartyService,
    author: &str,
    text_parts: &[String],
) -> Result<(), CliError> {
    let text = join_words(text_parts).ok_or(CliError::EmptyText)?;
    let quote = service.post_quote(&text, author).await?;
    println!("{}", quote.id);
    Ok(())
}

pub async fn run_wall_list(
    service: &PartyService,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let mut quotes = service.quotes().await;
    quotes.truncate(limit);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&quotes)?);
    } else {
        for line in format_quote_lines(&quotes, now_ms()) {
            println!("{line}");
        }
    }

    Ok(())
}
