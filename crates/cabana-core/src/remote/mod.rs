//! Remote Store: the optional networked database and its push feed.

mod memory;
mod realtime;
mod supabase;

pub use memory::MemoryRemote;
pub use realtime::{RealtimeConfig, RealtimeFeed};
pub use supabase::SupabaseRemote;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::RemoteCredentials;
use crate::models::{Collection, ConflictPolicy};
use crate::state::ConnectionState;
use crate::sync::{Listener, ListenerId};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote store is not configured.")]
    NotConfigured,
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Remote table is not provisioned: {0}")]
    TableMissing(String),
    #[error("Remote API error: {0}")]
    Api(String),
    #[error("Realtime feed error: {0}")]
    Realtime(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Row filter for remote deletes: every column must equal its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matcher {
    filters: Vec<(String, String)>,
}

impl Matcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    /// Whether a JSON row satisfies every filter. Numbers compare by their
    /// decimal rendering.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|(column, expected)| match row.get(column) {
            Some(Value::String(actual)) => actual == expected,
            Some(Value::Number(actual)) => actual.to_string() == *expected,
            Some(Value::Bool(actual)) => actual.to_string() == *expected,
            _ => false,
        })
    }
}

/// Networked database with CRUD plus a payload-free change feed.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Smoke-test read used by the bootstrap.
    async fn probe(&self) -> RemoteResult<()>;

    async fn fetch_all(&self, collection: Collection) -> RemoteResult<Vec<Value>>;

    /// Insert-or-replace keyed by `conflict_columns`. With
    /// [`ConflictPolicy::KeepExisting`] an existing row is left untouched.
    async fn upsert(
        &self,
        collection: Collection,
        row: Value,
        conflict_columns: &'static [&'static str],
        policy: ConflictPolicy,
    ) -> RemoteResult<()>;

    async fn delete(&self, collection: Collection, matcher: &Matcher) -> RemoteResult<()>;

    /// Fire `listener` whenever any client changes a row of `collection`.
    fn subscribe_to_changes(&self, collection: Collection, listener: Listener) -> ListenerId;

    fn unsubscribe_from_changes(&self, collection: Collection, id: ListenerId);
}

/// Connection state plus the store handle, decided once per process.
#[derive(Clone)]
pub struct RemoteContext {
    state: ConnectionState,
    store: Option<Arc<dyn RemoteStore>>,
}

impl RemoteContext {
    /// No remote configured: every operation stays local.
    #[must_use]
    pub const fn offline() -> Self {
        Self {
            state: ConnectionState::Offline,
            store: None,
        }
    }

    const fn failed() -> Self {
        Self {
            state: ConnectionState::Error,
            store: None,
        }
    }

    /// Build the Supabase store from credentials and run the one-shot
    /// bootstrap. Missing credentials mean Offline.
    pub async fn bootstrap(credentials: Option<&RemoteCredentials>) -> Self {
        let Some(credentials) = credentials else {
            tracing::info!("Remote store not configured; running offline");
            return Self::offline();
        };

        match SupabaseRemote::new(credentials.url(), credentials.anon_key()) {
            Ok(store) => Self::initialize(Arc::new(store)).await,
            Err(error) => {
                tracing::error!("Remote store setup failed: {error}");
                Self::failed()
            }
        }
    }

    /// Probe `store` and settle on Connected or Error. A probe that only
    /// finds unprovisioned tables still counts as Connected.
    pub async fn initialize(store: Arc<dyn RemoteStore>) -> Self {
        tracing::info!(
            "Remote store {}: {}",
            store.backend_name(),
            ConnectionState::Connecting
        );

        match store.probe().await {
            Ok(()) => {}
            Err(RemoteError::TableMissing(detail)) => {
                tracing::warn!("Remote tables not provisioned yet ({detail}); continuing");
            }
            Err(error) => {
                tracing::error!(
                    "Remote store {} failed bootstrap: {error}; remote sync disabled",
                    store.backend_name()
                );
                return Self::failed();
            }
        }

        tracing::info!(
            "Remote store {}: {}",
            store.backend_name(),
            ConnectionState::Connected
        );
        Self {
            state: ConnectionState::Connected,
            store: Some(store),
        }
    }

    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// The store, only while Connected.
    pub fn connected_store(&self) -> Option<&Arc<dyn RemoteStore>> {
        if self.state.is_connected() {
            self.store.as_ref()
        } else {
            None
        }
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.store.as_ref().map(|store| store.backend_name())
    }
}

impl std::fmt::Debug for RemoteContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteContext")
            .field("state", &self.state)
            .field("backend", &self.backend_name())
            .finish()
    }
}
