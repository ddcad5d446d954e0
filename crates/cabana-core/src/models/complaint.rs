//! Complaint model

use serde::{Deserialize, Serialize};

use super::{id_from_string_or_number, Collection, SyncRecord};
use crate::util::{new_record_id, unix_millis_now};

/// An anonymous complaint and the generated manager reply.
///
/// There is no author field: the submitter is never persisted or transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub text: String,
    /// Empty when generation failed and no fallback was applied
    #[serde(default, alias = "aiReply")]
    pub ai_reply: String,
    /// Creation timestamp (Unix ms)
    #[serde(default = "unix_millis_now")]
    pub timestamp: i64,
}

impl Complaint {
    #[must_use]
    pub fn new(text: impl Into<String>, ai_reply: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            text: text.into(),
            ai_reply: ai_reply.into(),
            timestamp: unix_millis_now(),
        }
    }
}

impl SyncRecord for Complaint {
    type Key = String;

    const COLLECTION: Collection = Collection::Complaints;

    fn key(&self) -> String {
        self.id.clone()
    }

    fn sort_for_display(records: &mut [Self]) {
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_fields_are_exactly_the_anonymous_set() {
        let complaint = Complaint::new("Nu e apa calda", "Am notat tichetul.");
        let value = serde_json::to_value(&complaint).unwrap();
        let mut keys = value
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        keys.sort();
        assert_eq!(keys, vec!["ai_reply", "id", "text", "timestamp"]);
    }

    #[test]
    fn missing_reply_decodes_as_empty() {
        let complaint: Complaint = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "text": "Prea zgomot",
            "timestamp": 5
        }))
        .unwrap();
        assert_eq!(complaint.ai_reply, "");
    }

    #[test]
    fn submitter_sent_by_a_foreign_client_is_dropped() {
        let complaint: Complaint = serde_json::from_value(serde_json::json!({
            "id": "c2",
            "text": "x",
            "ai_reply": "y",
            "timestamp": 5,
            "submitted_by": "Ana"
        }))
        .unwrap();
        let rendered = serde_json::to_string(&complaint).unwrap();
        assert!(!rendered.contains("Ana"));
    }
}
