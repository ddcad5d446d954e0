//! Database layer for Cabana

mod connection;
mod local_store;
mod migrations;

pub use connection::Database;
pub use local_store::{LocalStore, ACTIVE_USER_KEY};
