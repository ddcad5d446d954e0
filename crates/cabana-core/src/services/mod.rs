//! Shared services used by client apps.

mod party;

pub use party::PartyService;
