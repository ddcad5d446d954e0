use std::path::Path;

use cabana_core::services::PartyService;
use cabana_core::{Complaint, Participant, Quote, Vote};

pub fn run_status(service: &PartyService, db_path: &Path) {
    for line in status_lines(service, db_path) {
        println!("{line}");
    }
}

/// Summary of this device's view; counts come from the local snapshot only.
pub fn status_lines(service: &PartyService, db_path: &Path) -> Vec<String> {
    let sync = service.sync();
    let backend = sync.remote().backend_name().unwrap_or("none");

    vec![
        format!("Database:     {}", db_path.display()),
        format!("Remote:       {} ({backend})", sync.connection_state()),
        format!(
            "Joined as:    {}",
            service.active_user().as_deref().unwrap_or("-")
        ),
        format!("Generator:    {}", service.generator_provider()),
        format!("Participants: {}", sync.snapshot::<Participant>().len()),
        format!("Votes:        {}", sync.snapshot::<Vote>().len()),
        format!("Quotes:       {}", sync.snapshot::<Quote>().len()),
        format!("Complaints:   {}", sync.snapshot::<Complaint>().len()),
    ]
}
