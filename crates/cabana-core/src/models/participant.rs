//! Participant model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Collection, ConflictPolicy, SyncRecord};

/// Someone who joined the party under a free-text display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Display name, case-sensitive and unique
    pub name: String,
    /// When the name was first used; rows without one decode as the epoch
    #[serde(default, alias = "joinedAt")]
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            joined_at: Utc::now(),
        }
    }
}

impl SyncRecord for Participant {
    type Key = String;

    const COLLECTION: Collection = Collection::Participants;
    const ON_CONFLICT: ConflictPolicy = ConflictPolicy::KeepExisting;

    fn key(&self) -> String {
        self.name.clone()
    }

    fn sort_for_display(records: &mut [Self]) {
        records.sort_by_key(|participant| participant.joined_at);
    }
}
