//! Data models for Cabana

mod category;
mod complaint;
mod participant;
mod quote;
mod record;
mod vote;

pub use category::Category;
pub use complaint::Complaint;
pub use participant::Participant;
pub use quote::Quote;
pub use record::{Collection, ConflictPolicy, SyncRecord};
pub use vote::Vote;

use serde::{Deserialize, Deserializer};

/// Accept an id sent either as a JSON string or as a number.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Signed(number) => number.to_string(),
        RawId::Unsigned(number) => number.to_string(),
    })
}
