//! Quote model

use serde::{Deserialize, Serialize};

use super::{id_from_string_or_number, Collection, SyncRecord};
use crate::util::{new_record_id, unix_millis_now};

/// Something somebody said, pinned to the wall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub text: String,
    /// Who said it (not necessarily a participant)
    pub author: String,
    /// Participant who posted it
    #[serde(alias = "addedBy")]
    pub added_by: String,
    /// Creation timestamp (Unix ms)
    #[serde(default = "unix_millis_now")]
    pub timestamp: i64,
}

impl Quote {
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        author: impl Into<String>,
        added_by: impl Into<String>,
    ) -> Self {
        Self {
            id: new_record_id(),
            text: text.into(),
            author: author.into(),
            added_by: added_by.into(),
            timestamp: unix_millis_now(),
        }
    }
}

impl SyncRecord for Quote {
    type Key = String;

    const COLLECTION: Collection = Collection::Quotes;

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
    fn accepts_numeric_id_and_camel_case_alias() {
        let row = serde_json::json!({
            "id": 1_700_000_000_000_i64,
            "text": "Ha ha cee?",
            "author": "Ion",
            "addedBy": "Ana",
            "timestamp": 1_700_000_000_000_i64
        });
        let quote: Quote = serde_json::from_value(row).unwrap();
        assert_eq!(quote.id, "1700000000000");
        assert_eq!(quote.added_by, "Ana");
    }

    #[test]
    fn serializes_with_underscore_field_names() {
        let quote = Quote::new("text", "Ion", "Ana");
        let value = serde_json::to_value(&quote).unwrap();
        assert!(value.get("added_by").is_some());
        assert!(value.get("addedBy").is_none());
    }

    #[test]
    fn display_order_is_newest_first() {
        let mut old = Quote::new("old", "A", "B");
        old.timestamp = 1;
        let mut new = Quote::new("new", "A", "B");
        new.timestamp = 2;

        let mut records = vec![old, new];
        Quote::sort_for_display(&mut records);
        assert_eq!(records[0].text, "new");
    }
}
