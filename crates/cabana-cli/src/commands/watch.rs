use cabana_core::services::PartyService;
use cabana_core::{Collection, Complaint, Participant, Quote, Subscription, SyncRecord, Vote};

use crate::commands::common::{
    format_complaint_lines, format_participant_lines, format_quote_lines, format_vote_lines,
    now_ms,
};
use crate::error::CliError;

pub async fn run_watch(service: &PartyService, collection: Collection) -> Result<(), CliError> {
    let subscription = match collection {
        Collection::Participants => watch::<Participant, _>(service, |records| {
            format_participant_lines(records, now_ms())
        }),
        Collection::Votes => watch::<Vote, _>(service, format_vote_lines),
        Collection::Quotes => {
            watch::<Quote, _>(service, |records| format_quote_lines(records, now_ms()))
        }
        Collection::Complaints => watch::<Complaint, _>(service, |records| {
            format_complaint_lines(records, now_ms())
        }),
    };

    tracing::info!(
        "Watching {collection} ({}); press Ctrl-C to stop",
        service.sync().connection_state()
    );
    tokio::signal::ctrl_c().await?;
    subscription.cancel();
    Ok(())
}

fn watch<T, F>(service: &PartyService, render: F) -> Subscription
where
    T: SyncRecord,
    F: Fn(&[T]) -> Vec<String> + Send + Sync + 'static,
{
    service.sync().subscribe(move |records: Vec<T>| {
        println!("--- {} ({}) ---", T::COLLECTION, records.len());
        for line in render(&records) {
            println!("{line}");
        }
    })
}
