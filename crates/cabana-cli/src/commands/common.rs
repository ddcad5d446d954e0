use std::path::{Path, PathBuf};

use cabana_core::config::AppConfig;
use cabana_core::leaderboard::Standing;
use cabana_core::services::PartyService;
use cabana_core::{Category, Complaint, Participant, Quote, Vote};
use chrono::Utc;
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct CategoryStandings {
    pub category: Category,
    pub title: String,
    pub standings: Vec<Standing>,
}

pub async fn open_service(config: &AppConfig, db_path: &Path) -> Result<PartyService, CliError> {
    Ok(PartyService::open(config, db_path).await?)
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>, config: &AppConfig) -> PathBuf {
    cli_db_path
        .or_else(|| config.db_path.clone())
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cabana")
        .join("cabana.db")
}

/// Join positional words into one trimmed text, `None` when blank.
pub fn join_words(parts: &[String]) -> Option<String> {
    let text = parts.join(" ");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn format_participant_lines(participants: &[Participant], now_ms: i64) -> Vec<String> {
    participants
        .iter()
        .map(|participant| {
            format!(
                "{:<20} joined {}",
                participant.name,
                format_relative_time(participant.joined_at.timestamp_millis(), now_ms)
            )
        })
        .collect()
}

pub fn format_vote_lines(votes: &[Vote]) -> Vec<String> {
    votes
        .iter()
        .map(|vote| format!("{} -> {} [{}]", vote.voter, vote.candidate, vote.category))
        .collect()
}

pub fn format_quote_lines(quotes: &[Quote], now_ms: i64) -> Vec<String> {
    quotes
        .iter()
        .map(|quote| {
            format!(
                "\"{}\" - {} (added by {}, {})",
                quote.text,
                quote.author,
                quote.added_by,
                format_relative_time(quote.timestamp, now_ms)
            )
        })
        .collect()
}

pub fn format_complaint_lines(complaints: &[Complaint], now_ms: i64) -> Vec<String> {
    let mut lines = Vec::new();
    for complaint in complaints {
        lines.push(format!(
            "[{}] {}",
            format_relative_time(complaint.timestamp, now_ms),
            complaint.text
        ));
        if !complaint.ai_reply.is_empty() {
            lines.push(format!("    Manager: {}", complaint.ai_reply));
        }
    }
    lines
}

pub fn format_standing_lines(category: Category, standings: &[Standing]) -> Vec<String> {
    let mut lines = vec![format!("{} {}", category.emoji(), category.title())];
    if standings.is_empty() {
        lines.push("    no votes yet".to_string());
    }
    for (index, standing) in standings.iter().enumerate() {
        let noun = if standing.votes == 1 { "vote" } else { "votes" };
        lines.push(format!(
            "    {}. {} ({} {noun})",
            index + 1,
            standing.candidate,
            standing.votes
        ));
    }
    lines
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}
