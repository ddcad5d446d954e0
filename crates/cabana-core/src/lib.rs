//! cabana-core - Core library for Cabana
//!
//! This crate contains the record models, the on-device store, the optional
//! remote store adapters, and the sync coordinator that keeps both views
//! consistent for every client (CLI today).

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod leaderboard;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Category, Collection, Complaint, Participant, Quote, SyncRecord, Vote};
pub use state::ConnectionState;
pub use sync::{RemoteMirror, Subscription, SyncCoordinator};
