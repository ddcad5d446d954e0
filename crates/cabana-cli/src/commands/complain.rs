use cabana_core::services::PartyService;

use crate::commands::common::{format_complaint_lines, join_words, now_ms};
use crate::error::CliError;

pub async fn run_complain(service: &PartyService, text_parts: &[String]) -> Result<(), CliError> {
    let text = join_words(text_parts).ok_or(CliError::EmptyText)?;
    let complaint = service.file_complaint(&text).await?;
    println!("Complaint filed anonymously.");
    if !complaint.ai_reply.is_empty() {
        println!("Manager: {}", complaint.ai_reply);
    }
    Ok(())
}

pub async fn run_complaints(
    service: &PartyService,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let mut complaints = service.complaints().await;
    complaints.truncate(limit);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&complaints)?);
    } else {
        for line in format_complaint_lines(&complaints, now_ms()) {
            println!("{line}");
        }
    }

    Ok(())
}
