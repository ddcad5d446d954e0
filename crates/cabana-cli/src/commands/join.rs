use cabana_core::services::PartyService;

use crate::commands::common::{format_participant_lines, join_words, now_ms};
use crate::error::CliError;

pub async fn run_join(service: &PartyService, name_parts: &[String]) -> Result<(), CliError> {
    let name = join_words(name_parts).ok_or(CliError::EmptyName)?;
    let participant = service.join(&name).await?;
    println!("Welcome, {}!", participant.name);
    Ok(())
}

pub fn run_whoami(service: &PartyService) -> Result<(), CliError> {
    let name = service.active_user().ok_or(CliError::NotJoined)?;
    println!("{name}");
    Ok(())
}

pub fn run_logout(service: &PartyService) {
    match service.logout() {
        Some(name) => println!("Bye, {name}."),
        None => println!("Nobody was joined on this device."),
    }
}

pub async fn run_participants(service: &PartyService, as_json: bool) -> Result<(), CliError> {
    let participants = service.participants().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&participants)?);
    } else {
        for line in format_participant_lines(&participants, now_ms()) {
            println!("{line}");
        }
    }

    Ok(())
}
