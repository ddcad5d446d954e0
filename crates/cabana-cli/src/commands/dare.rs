use cabana_core::services::PartyService;

use crate::commands::common::join_words;
use crate::error::CliError;

pub async fn run_dare(service: &PartyService) {
    println!("{}", service.spin_dare().await);
}

pub async fn run_roast(service: &PartyService, name_parts: &[String]) -> Result<(), CliError> {
    let name = join_words(name_parts).ok_or(CliError::EmptyName)?;
    println!("{}", service.roast(&name).await);
    Ok(())
}
