//! In-process Remote Store, used by tests and as a local stand-in.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use super::{Matcher, RemoteError, RemoteResult, RemoteStore};
use crate::models::{Collection, ConflictPolicy};
use crate::sync::{ChangeBus, Listener, ListenerId};

type ProbeError = Box<dyn Fn() -> RemoteError + Send + Sync>;

/// Rows kept in memory with the same contract as a real backend.
///
/// Every mutation fires the change feed, as the real push feed would for
/// writes from any client.
pub struct MemoryRemote {
    tables: Mutex<HashMap<Collection, Vec<Value>>>,
    feed: ChangeBus,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    pending: watch::Sender<bool>,
    probe_error: Mutex<Option<ProbeError>>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self {
            tables: Mutex::default(),
            feed: ChangeBus::new(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            pending: watch::channel(false).0,
            probe_error: Mutex::default(),
        }
    }
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store rows without notifying listeners.
    pub fn seed(&self, collection: Collection, rows: impl IntoIterator<Item = Value>) {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection)
            .or_default()
            .extend(rows);
    }

    /// Fire the change feed as if another client had written.
    pub fn notify_change(&self, collection: Collection) {
        self.feed.publish(collection);
    }

    pub fn rows(&self, collection: Collection) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn listener_count(&self, collection: Collection) -> usize {
        self.feed.listener_count(collection)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every call after the probe hang, like a dead network, until
    /// released with `set_pending(false)`. Calls already waiting resume then.
    pub fn set_pending(&self, pending: bool) {
        self.pending.send_replace(pending);
    }

    pub fn set_probe_error(&self, error: impl Fn() -> RemoteError + Send + Sync + 'static) {
        *self
            .probe_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Box::new(error));
    }

    async fn stall_if_pending(&self) {
        let mut pending = self.pending.subscribe();
        // The sender lives in `self`, so the wait can only end by release
        let _ = pending.wait_for(|pending| !*pending).await;
    }

    fn check_writes(&self) -> RemoteResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(RemoteError::Api("simulated write failure (503)".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn probe(&self) -> RemoteResult<()> {
        let probe_error = self
            .probe_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|make_error| make_error());
        probe_error.map_or(Ok(()), Err)
    }

    async fn fetch_all(&self, collection: Collection) -> RemoteResult<Vec<Value>> {
        self.stall_if_pending().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RemoteError::Api("simulated read failure (503)".to_string()));
        }
        Ok(self.rows(collection))
    }

    async fn upsert(
        &self,
        collection: Collection,
        row: Value,
        conflict_columns: &'static [&'static str],
        policy: ConflictPolicy,
    ) -> RemoteResult<()> {
        self.stall_if_pending().await;
        self.check_writes()?;

        let changed = {
            let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
            let rows = tables.entry(collection).or_default();
            let existing = rows.iter().position(|candidate| {
                conflict_columns
                    .iter()
                    .all(|column| candidate.get(column) == row.get(column))
            });

            match (existing, policy) {
                (Some(_), ConflictPolicy::KeepExisting) => false,
                (Some(index), ConflictPolicy::Replace) => {
                    rows[index] = row;
                    true
                }
                (None, _) => {
                    rows.push(row);
                    true
                }
            }
        };

        if changed {
            self.feed.publish(collection);
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, matcher: &Matcher) -> RemoteResult<()> {
        self.stall_if_pending().await;
        self.check_writes()?;

        let removed = {
            let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
            let rows = tables.entry(collection).or_default();
            let before = rows.len();
            rows.retain(|row| !matcher.matches(row));
            before - rows.len()
        };

        if removed > 0 {
            self.feed.publish(collection);
        }
        Ok(())
    }

    fn subscribe_to_changes(&self, collection: Collection, listener: Listener) -> ListenerId {
        self.feed.listen(collection, listener)
    }

    fn unsubscribe_from_changes(&self, collection: Collection, id: ListenerId) {
        self.feed.forget(collection, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[tokio::test]
    async fn upsert_replaces_on_composite_key() {
        let remote = MemoryRemote::new();
        let columns = Collection::Votes.conflict_columns();

        remote
            .upsert(
                Collection::Votes,
                json!({"voter": "Ana", "candidate": "Ion", "category": "MFP"}),
                columns,
                ConflictPolicy::Replace,
            )
            .await
            .unwrap();
        remote
            .upsert(
                Collection::Votes,
                json!({"voter": "Ana", "candidate": "Radu", "category": "MFP"}),
                columns,
                ConflictPolicy::Replace,
            )
            .await
            .unwrap();

        let rows = remote.rows(Collection::Votes);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["candidate"], "Radu");
    }

    #[tokio::test]
    async fn keep_existing_ignores_duplicates_silently() {
        let remote = MemoryRemote::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let listener_hits = Arc::clone(&hits);
        remote.subscribe_to_changes(
            Collection::Participants,
            Arc::new(move || {
                listener_hits.fetch_add(1, Ordering::SeqCst);
            }),
        );

        for joined in ["2025-01-01T00:00:00Z", "2025-06-01T00:00:00Z"] {
            remote
                .upsert(
                    Collection::Participants,
                    json!({"name": "Ana", "joined_at": joined}),
                    Collection::Participants.conflict_columns(),
                    ConflictPolicy::KeepExisting,
                )
                .await
                .unwrap();
        }

        let rows = remote.rows(Collection::Participants);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["joined_at"], "2025-01-01T00:00:00Z");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn delete_uses_matcher_and_notifies() {
        let remote = MemoryRemote::new();
        remote.seed(
            Collection::Votes,
            [
                json!({"voter": "Ana", "candidate": "Ion", "category": "MFP"}),
                json!({"voter": "Ana", "candidate": "Ion", "category": "DJ"}),
            ],
        );
        let hits = Arc::new(AtomicUsize::new(0));
        let listener_hits = Arc::clone(&hits);
        let id = remote.subscribe_to_changes(
            Collection::Votes,
            Arc::new(move || {
                listener_hits.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let matcher = Matcher::new().eq("voter", "Ana").eq("category", "MFP");
        remote.delete(Collection::Votes, &matcher).await.unwrap();
        remote.delete(Collection::Votes, &matcher).await.unwrap();

        assert_eq!(remote.rows(Collection::Votes).len(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        remote.unsubscribe_from_changes(Collection::Votes, id);
        assert_eq!(remote.listener_count(Collection::Votes), 0);
    }

    #[tokio::test]
    async fn failure_switches() {
        let remote = MemoryRemote::new();
        remote.set_fail_reads(true);
        remote.set_fail_writes(true);

        assert!(remote.fetch_all(Collection::Quotes).await.is_err());
        assert!(remote
            .delete(Collection::Quotes, &Matcher::new().eq("id", "1"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn pending_calls_resume_when_released() {
        let remote = Arc::new(MemoryRemote::new());
        remote.seed(Collection::Quotes, [json!({"id": "1"})]);
        remote.set_pending(true);

        let stalled = Arc::clone(&remote);
        let fetch = tokio::spawn(async move { stalled.fetch_all(Collection::Quotes).await });
        tokio::task::yield_now().await;
        assert!(!fetch.is_finished());

        remote.set_pending(false);
        let rows = fetch.await.unwrap().unwrap();
        assert_eq!(rows.len(), 1);
    }
}
