//! Payload-free "collection changed" notifications.
//!
//! Used for the same-device signal (every local write publishes its
//! collection) and reused by remote adapters to fan out push events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::Collection;

/// Callback invoked with no payload when a collection changes.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`ChangeBus::listen`], used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Topic-per-collection publish/subscribe bus.
#[derive(Default)]
pub struct ChangeBus {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<Collection, Vec<(ListenerId, Listener)>>>,
}

impl ChangeBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(&self, collection: Collection, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection)
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn forget(&self, collection: Collection, id: ListenerId) {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(entries) = listeners.get_mut(&collection) {
            entries.retain(|(entry_id, _)| *entry_id != id);
        }
    }

    /// Call every listener of `collection`.
    ///
    /// Listeners run outside the lock, so they may listen or forget freely.
    pub fn publish(&self, collection: Collection) {
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&collection)
            .map(|entries| entries.iter().map(|(_, listener)| Arc::clone(listener)).collect())
            .unwrap_or_default();

        for listener in snapshot {
            listener();
        }
    }

    pub fn listener_count(&self, collection: Collection) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&collection)
            .map_or(0, Vec::len)
    }

    /// Whether anyone listens to any collection.
    pub fn is_empty(&self) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .all(Vec::is_empty)
    }
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<Collection, usize> = listeners
            .iter()
            .map(|(collection, entries)| (*collection, entries.len()))
            .collect();
        f.debug_struct("ChangeBus").field("listeners", &counts).finish()
    }
}
