//! Error types for cabana-core

use thiserror::Error;

/// Result type alias using cabana-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cabana-core operations
///
/// Sync operations never surface these; they are only returned while opening
/// stores and by input validation in the service facade.
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An operation needs a display name but nobody joined on this device
    #[error("No active participant on this device; join first")]
    NoActiveUser,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Async runtime unavailable
    #[error("Runtime error: {0}")]
    Runtime(String),
}
