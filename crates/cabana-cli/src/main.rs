//! Cabana CLI - run the party from the terminal
//!
//! Every command works offline; with Supabase credentials in the environment
//! the same records are shared with every other device.

mod cli;
mod commands;
mod error;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cabana_core::config::AppConfig;

use crate::cli::{Cli, Commands};
use crate::commands::common::{open_service, resolve_db_path};
use crate::commands::complain::{run_complain, run_complaints};
use crate::commands::completions::run_completions;
use crate::commands::dare::{run_dare, run_roast};
use crate::commands::join::{run_join, run_logout, run_participants, run_whoami};
use crate::commands::status::run_status;
use crate::commands::vote::{run_leaderboard, run_unvote, run_vote};
use crate::commands::wall::run_wall;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cabana=info,cabana_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    if let Commands::Completions { shell, output } = &command {
        return run_completions(*shell, output.as_deref());
    }

    let config = AppConfig::from_env();
    let db_path = resolve_db_path(cli.db_path, &config);
    let service = open_service(&config, &db_path).await?;

    match command {
        Commands::Join { name } => run_join(&service, &name).await?,
        Commands::Whoami => run_whoami(&service)?,
        Commands::Logout => run_logout(&service),
        Commands::Participants { json } => run_participants(&service, json).await?,
        Commands::Vote {
            category,
            candidate,
        } => run_vote(&service, category, &candidate).await?,
        Commands::Unvote { category } => run_unvote(&service, category).await?,
        Commands::Leaderboard { category, json } => {
            run_leaderboard(&service, category, json).await?;
        }
        Commands::Wall { command } => run_wall(&service, command).await?,
        Commands::Complain { text } => run_complain(&service, &text).await?,
        Commands::Complaints { limit, json } => run_complaints(&service, limit, json).await?,
        Commands::Roast { name } => run_roast(&service, &name).await?,
        Commands::Dare => run_dare(&service).await,
        Commands::Watch { collection } => run_watch(&service, collection).await?,
        Commands::Status => run_status(&service, &db_path),
        Commands::Completions { .. } => {}
    }

    Ok(())
}
