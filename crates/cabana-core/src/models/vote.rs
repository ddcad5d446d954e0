//! Vote model

use serde::{Deserialize, Serialize};

use super::{Category, Collection, SyncRecord};

/// One participant's pick for one category.
///
/// At most one vote exists per `(voter, category)`; a newer vote replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: String,
    pub candidate: String,
    pub category: Category,
}

impl Vote {
    #[must_use]
    pub fn new(voter: impl Into<String>, candidate: impl Into<String>, category: Category) -> Self {
        Self {
            voter: voter.into(),
            candidate: candidate.into(),
            category,
        }
    }
}

impl SyncRecord for Vote {
    type Key = (String, Category);

    const COLLECTION: Collection = Collection::Votes;

    fn key(&self) -> Self::Key {
        (self.voter.clone(), self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_ignores_candidate() {
        let first = Vote::new("Ana", "Ion", Category::Mfp);
        let second = Vote::new("Ana", "Radu", Category::Mfp);
        assert_eq!(first.key(), second.key());
        assert_ne!(first.key(), Vote::new("Ana", "Ion", Category::Dj).key());
    }

    #[test]
    fn decodes_remote_row() {
        let row = serde_json::json!({
            "id": 12,
            "voter": "Ana",
            "candidate": "Radu",
            "category": "MFP",
            "created_at": "2025-07-01T20:15:00Z"
        });
        let vote: Vote = serde_json::from_value(row).unwrap();
        assert_eq!(vote, Vote::new("Ana", "Radu", Category::Mfp));
    }
}
