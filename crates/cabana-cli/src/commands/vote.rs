use cabana_core::services::PartyService;
use cabana_core::Category;

use crate::commands::common::{format_standing_lines, join_words, CategoryStandings};
use crate::error::CliError;

pub async fn run_vote(
    service: &PartyService,
    category: Category,
    candidate_parts: &[String],
) -> Result<(), CliError> {
    let candidate = join_words(candidate_parts).ok_or(CliError::EmptyName)?;
    let vote = service.cast_vote(category, &candidate).await?;
    println!(
        "{} {}: voted for {}",
        category.emoji(),
        category.title(),
        vote.candidate
    );
    Ok(())
}

pub async fn run_unvote(service: &PartyService, category: Category) -> Result<(), CliError> {
    service.retract_vote(category).await?;
    println!("Vote in {} withdrawn", category.title());
    Ok(())
}

pub async fn run_leaderboard(
    service: &PartyService,
    category: Option<Category>,
    as_json: bool,
) -> Result<(), CliError> {
    let boards = collect_standings(service, category).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&boards)?);
    } else {
        for board in &boards {
            for line in format_standing_lines(board.category, &board.standings) {
                println!("{line}");
            }
        }
    }

    Ok(())
}

pub async fn collect_standings(
    service: &PartyService,
    category: Option<Category>,
) -> Vec<CategoryStandings> {
    let categories = category.map_or_else(|| Category::ALL.to_vec(), |category| vec![category]);
    let votes = service.votes().await;

    categories
        .into_iter()
        .map(|category| CategoryStandings {
            category,
            title: category.title().to_string(),
            standings: cabana_core::leaderboard::tally(&votes, category),
        })
        .collect()
}
