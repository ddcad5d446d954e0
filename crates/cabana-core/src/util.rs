//! Small helpers for text, clocks and record ids.

/// Longest response excerpt kept in an error message.
const EXCERPT_CHARS: usize = 180;

/// Trimmed text, or `None` when absent or blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Leading part of a response body, for error messages.
pub fn body_excerpt(body: &str) -> String {
    body.trim().chars().take(EXCERPT_CHARS).collect()
}

/// Current Unix timestamp in milliseconds.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Fresh opaque record id (UUID v7, time-sortable).
pub fn new_record_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
