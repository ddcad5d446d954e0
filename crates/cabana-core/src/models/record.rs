//! Collection identity and the record contract shared by all synced types.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The four synced record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Participants,
    Votes,
    Quotes,
    Complaints,
}

impl Collection {
    pub const ALL: [Self; 4] = [
        Self::Participants,
        Self::Votes,
        Self::Quotes,
        Self::Complaints,
    ];

    /// Remote table name.
    pub const fn table(self) -> &'static str {
        match self {
            Self::Participants => "users",
            Self::Votes => "votes",
            Self::Quotes => "quotes",
            Self::Complaints => "complaints",
        }
    }

    /// Fixed Local Store key for the serialized collection blob.
    pub const fn local_key(self) -> &'static str {
        match self {
            Self::Participants => "cabana_users",
            Self::Votes => "cabana_votes",
            Self::Quotes => "cabana_quotes",
            Self::Complaints => "cabana_complaints",
        }
    }

    /// Columns forming the remote uniqueness constraint used for upserts.
    pub const fn conflict_columns(self) -> &'static [&'static str] {
        match self {
            Self::Participants => &["name"],
            Self::Votes => &["voter", "category"],
            Self::Quotes | Self::Complaints => &["id"],
        }
    }

    pub fn from_table(table: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|collection| collection.table() == table)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Participants => "participants",
            Self::Votes => "votes",
            Self::Quotes => "quotes",
            Self::Complaints => "complaints",
        };
        f.write_str(name)
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "participants" | "users" => Ok(Self::Participants),
            "votes" => Ok(Self::Votes),
            "quotes" | "wall" => Ok(Self::Quotes),
            "complaints" => Ok(Self::Complaints),
            other => Err(format!("unknown collection '{other}'")),
        }
    }
}

/// What a write does when a record with the same identity already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// The new record replaces the old one (upsert).
    Replace,
    /// The first record is kept; later writes are ignored.
    KeepExisting,
}

/// A record type kept in sync between the Local Store and the Remote Store.
pub trait SyncRecord:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Identity used to collapse duplicates during merge.
    type Key: Eq + Hash + Clone + fmt::Debug + Send;

    const COLLECTION: Collection;
    const ON_CONFLICT: ConflictPolicy = ConflictPolicy::Replace;

    fn key(&self) -> Self::Key;

    /// Put records into display order. Must be a stable sort.
    fn sort_for_display(records: &mut [Self]) {
        let _ = records;
    }
}
