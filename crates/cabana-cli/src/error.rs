use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] cabana_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No text provided")]
    EmptyText,
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Nobody has joined on this device. Run `cabana join <NAME>` first.")]
    NotJoined,
}
