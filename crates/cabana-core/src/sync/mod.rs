//! Sync Coordinator: keeps the Local Store and the Remote Store views of
//! each collection consistent and notifies subscribers.
//!
//! Writes land in the Local Store first and are broadcast on the same-device
//! signal before the remote mirror is even started. Reads deliver the local
//! snapshot immediately, then fetch, merge and redeliver when connected.

mod merge;
mod signal;
mod subscription;

#[cfg(test)]
mod tests;

pub use merge::{apply_write, merge};
pub use signal::{ChangeBus, Listener, ListenerId};
pub use subscription::Subscription;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::db::LocalStore;
use crate::error::{Error, Result};
use crate::models::{Category, Collection, SyncRecord, Vote};
use crate::remote::{Matcher, RemoteContext};
use crate::state::ConnectionState;

struct Inner {
    local: LocalStore,
    remote: RemoteContext,
    signals: ChangeBus,
}

/// Orchestrates reads and writes across both stores.
///
/// Cloning is cheap; clones share the same stores and signal bus.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
    runtime: Handle,
}

impl SyncCoordinator {
    /// Build a coordinator on the current tokio runtime.
    pub fn new(local: LocalStore, remote: RemoteContext) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|error| Error::Runtime(format!("sync coordinator needs tokio: {error}")))?;
        Ok(Self::with_runtime(local, remote, runtime))
    }

    pub fn with_runtime(local: LocalStore, remote: RemoteContext, runtime: Handle) -> Self {
        tracing::debug!("Sync coordinator ready (remote {})", remote.state());
        Self {
            inner: Arc::new(Inner {
                local,
                remote,
                signals: ChangeBus::new(),
            }),
            runtime,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.remote.state()
    }

    pub fn remote(&self) -> &RemoteContext {
        &self.inner.remote
    }

    pub fn active_user(&self) -> Option<String> {
        self.inner.local.active_user()
    }

    pub fn set_active_user(&self, name: &str) {
        self.inner.local.set_active_user(name);
    }

    pub fn clear_active_user(&self) {
        self.inner.local.clear_active_user();
    }

    /// Current Local Store view, in display order.
    pub fn snapshot<T: SyncRecord>(&self) -> Vec<T> {
        self.inner.snapshot()
    }

    /// Watch a collection.
    ///
    /// `on_update` is called right away with the local snapshot, again after
    /// each remote fetch-and-merge, and on every same-device write.
    pub fn subscribe<T, F>(&self, on_update: F) -> Subscription
    where
        T: SyncRecord,
        F: Fn(Vec<T>) + Send + Sync + 'static,
    {
        let alive = Arc::new(AtomicBool::new(true));
        let delivery = Delivery {
            alive: Arc::clone(&alive),
            on_update: Arc::new(on_update),
        };
        let collection = T::COLLECTION;

        delivery.send(self.snapshot::<T>());

        if self.inner.remote.connected_store().is_some() {
            spawn_refresh(&self.inner, &self.runtime, delivery.clone());
        }

        let remote_registration = self.inner.remote.connected_store().map(|store| {
            let weak = Arc::downgrade(&self.inner);
            let runtime = self.runtime.clone();
            let remote_delivery = delivery.clone();
            let id = store.subscribe_to_changes(
                collection,
                Arc::new(move || {
                    if !remote_delivery.is_alive() {
                        return;
                    }
                    if let Some(inner) = weak.upgrade() {
                        spawn_refresh(&inner, &runtime, remote_delivery.clone());
                    }
                }),
            );
            (Arc::clone(store), id)
        });

        let weak = Arc::downgrade(&self.inner);
        let local_delivery = delivery;
        let local_id = self.inner.signals.listen(
            collection,
            Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    local_delivery.send(inner.snapshot::<T>());
                }
            }),
        );

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Subscription::new(alive, move || {
            if let Some(inner) = weak.upgrade() {
                inner.signals.forget(collection, local_id);
            }
            if let Some((store, id)) = remote_registration {
                store.unsubscribe_from_changes(collection, id);
            }
            tracing::debug!("Subscription to {collection} cancelled");
        })
    }

    /// Fetch, merge and persist once. Returns the merged view, or the local
    /// snapshot when the remote is unavailable or the fetch fails.
    pub async fn refresh<T: SyncRecord>(&self) -> Vec<T> {
        match self.inner.fetch_and_merge::<T>().await {
            Some(merged) => merged,
            None => self.snapshot(),
        }
    }

    /// Record a write locally, broadcast it, and mirror it remotely.
    ///
    /// The local write and broadcast are done when this returns. Await the
    /// returned [`RemoteMirror`] to wait for the remote upsert; remote
    /// failures are logged and never undo the local write.
    pub fn write<T: SyncRecord>(&self, record: T) -> RemoteMirror {
        let row = serde_json::to_value(&record);

        if self
            .inner
            .local
            .update(|records: &mut Vec<T>| apply_write(records, record))
        {
            self.inner.signals.publish(T::COLLECTION);
        }

        let row = match row {
            Ok(row) => row,
            Err(error) => {
                tracing::warn!(
                    "Could not encode {} row for the remote store: {error}",
                    T::COLLECTION
                );
                return RemoteMirror::local_only();
            }
        };
        self.mirror_upsert::<T>(row)
    }

    /// Remove the vote of `voter` in `category`, locally then remotely.
    pub fn retract_vote(&self, voter: &str, category: Category) -> RemoteMirror {
        let removed = self.inner.local.update(|votes: &mut Vec<Vote>| {
            let before = votes.len();
            votes.retain(|vote| !(vote.voter == voter && vote.category == category));
            votes.len() != before
        });
        if removed {
            self.inner.signals.publish(Collection::Votes);
        }

        let Some(store) = self.inner.remote.connected_store().cloned() else {
            return RemoteMirror::local_only();
        };
        let matcher = Matcher::new()
            .eq("voter", voter)
            .eq("category", category.code());
        let task = self.runtime.spawn(async move {
            if let Err(error) = store.delete(Collection::Votes, &matcher).await {
                tracing::warn!("Remote vote retraction failed; local copy already removed: {error}");
            }
        });
        RemoteMirror::spawned(task)
    }

    fn mirror_upsert<T: SyncRecord>(&self, row: Value) -> RemoteMirror {
        let Some(store) = self.inner.remote.connected_store().cloned() else {
            return RemoteMirror::local_only();
        };
        let collection = T::COLLECTION;
        let task = self.runtime.spawn(async move {
            if let Err(error) = store
                .upsert(collection, row, collection.conflict_columns(), T::ON_CONFLICT)
                .await
            {
                tracing::warn!("Remote write to {collection} failed; keeping local copy: {error}");
            }
        });
        RemoteMirror::spawned(task)
    }
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("local", &self.inner.local)
            .field("remote", &self.inner.remote)
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn snapshot<T: SyncRecord>(&self) -> Vec<T> {
        let mut records = self.local.get::<T>();
        T::sort_for_display(&mut records);
        records
    }

    /// Persists the merge without broadcasting: only writes broadcast.
    async fn fetch_and_merge<T: SyncRecord>(&self) -> Option<Vec<T>> {
        let store = self.remote.connected_store()?.clone();
        let rows = match store.fetch_all(T::COLLECTION).await {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!("Remote fetch of {} failed: {error}", T::COLLECTION);
                return None;
            }
        };

        // Merged against the store's state at persist time, so a write that
        // landed during the fetch is kept
        let remote = decode_rows::<T>(rows);
        let mut merged = None;
        self.local.update(|local: &mut Vec<T>| {
            let next = merge(remote, local);
            let changed = next != *local;
            local.clone_from(&next);
            merged = Some(next);
            changed
        });
        merged
    }
}

fn spawn_refresh<T: SyncRecord>(inner: &Arc<Inner>, runtime: &Handle, delivery: Delivery<T>) {
    let inner = Arc::clone(inner);
    runtime.spawn(async move {
        if let Some(merged) = inner.fetch_and_merge::<T>().await {
            delivery.send(merged);
        }
    });
}

/// Decode remote rows, skipping the ones that do not fit the record shape.
fn decode_rows<T: SyncRecord>(rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!("Skipping malformed {} row: {error}", T::COLLECTION);
                None
            }
        })
        .collect()
}

struct Delivery<T> {
    alive: Arc<AtomicBool>,
    on_update: Arc<dyn Fn(Vec<T>) + Send + Sync>,
}

impl<T> Clone for Delivery<T> {
    fn clone(&self) -> Self {
        Self {
            alive: Arc::clone(&self.alive),
            on_update: Arc::clone(&self.on_update),
        }
    }
}

impl<T> Delivery<T> {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Late results for a cancelled subscription are dropped here.
    fn send(&self, records: Vec<T>) {
        if self.is_alive() {
            (self.on_update)(records);
        }
    }
}

/// The background remote half of a write.
///
/// Awaiting it waits for the remote call to finish (successfully or not);
/// dropping it lets the call continue in the background.
#[must_use = "await to wait for the remote write, or drop to let it run in the background"]
#[derive(Debug)]
pub struct RemoteMirror {
    task: Option<JoinHandle<()>>,
}

impl RemoteMirror {
    const fn local_only() -> Self {
        Self { task: None }
    }

    fn spawned(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// Whether the write was kept on this device only.
    pub const fn is_local_only(&self) -> bool {
        self.task.is_none()
    }
}

impl Future for RemoteMirror {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(task) = self.task.as_mut() else {
            return Poll::Ready(());
        };
        match Pin::new(task).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                self.task = None;
                if let Err(error) = result {
                    tracing::warn!("Remote mirror task ended abnormally: {error}");
                }
                Poll::Ready(())
            }
        }
    }
}
