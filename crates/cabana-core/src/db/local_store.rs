//! Fail-soft on-device store for the synced collections and the session name.
//!
//! Every operation is infallible from the caller's point of view: storage
//! errors and malformed blobs are logged and read back as "empty".

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::connection::{read_value, write_value};
use super::Database;
use crate::error::Result;
use crate::models::SyncRecord;
use crate::util::non_blank;

/// Key holding the display name of whoever joined on this device.
pub const ACTIVE_USER_KEY: &str = "cabana_me";

pub struct LocalStore {
    db: Mutex<Option<Database>>,
}

impl LocalStore {
    /// Open the store backed by a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_database(Database::open(path)?))
    }

    /// Open a store that lives only as long as this process.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    /// Open the file store, degrading to memory (then to a store that
    /// remembers nothing) when the file cannot be used.
    pub fn open_or_memory(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Database::open(path) {
            Ok(db) => Self::from_database(db),
            Err(error) => {
                tracing::warn!(
                    "Failed to open local store at {}: {error}; using in-memory store",
                    path.display()
                );
                match Database::open_in_memory() {
                    Ok(db) => Self::from_database(db),
                    Err(error) => {
                        tracing::error!("In-memory store unavailable: {error}");
                        Self::unavailable()
                    }
                }
            }
        }
    }

    /// A store with no backing storage: reads are empty and writes vanish.
    pub const fn unavailable() -> Self {
        Self {
            db: Mutex::new(None),
        }
    }

    const fn from_database(db: Database) -> Self {
        Self {
            db: Mutex::new(Some(db)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Database>> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the persisted collection for `T`, or empty on any failure.
    pub fn get<T: SyncRecord>(&self) -> Vec<T> {
        let key = T::COLLECTION.local_key();
        decode_blob(key, self.read(key).as_deref())
    }

    /// Read, modify and write the collection for `T` as one step.
    ///
    /// The store lock and an immediate `SQLite` transaction are held across
    /// the whole update, so concurrent updates (from other tasks or other
    /// processes on the same file) never overwrite each other. `modify`
    /// reports whether it changed anything; unchanged collections are not
    /// rewritten. Returns whether a change was persisted.
    pub fn update<T: SyncRecord>(&self, modify: impl FnOnce(&mut Vec<T>) -> bool) -> bool {
        let key = T::COLLECTION.local_key();
        let mut guard = self.lock();
        let Some(db) = guard.as_mut() else {
            modify(&mut Vec::new());
            tracing::debug!("Local store unavailable; dropping update to '{key}'");
            return false;
        };

        match update_blob(db, key, modify) {
            Ok(changed) => changed,
            Err(error) => {
                tracing::warn!("Failed to update local key '{key}': {error}");
                false
            }
        }
    }

    /// Overwrite the whole collection for `T`.
    pub fn put<T: SyncRecord>(&self, records: &[T]) {
        let key = T::COLLECTION.local_key();
        match serde_json::to_string(records) {
            Ok(raw) => self.write(key, &raw),
            Err(error) => tracing::warn!("Failed to serialize local blob '{key}': {error}"),
        }
    }

    pub fn active_user(&self) -> Option<String> {
        non_blank(self.read(ACTIVE_USER_KEY))
    }

    pub fn set_active_user(&self, name: &str) {
        self.write(ACTIVE_USER_KEY, name);
    }

    pub fn clear_active_user(&self) {
        let guard = self.lock();
        let Some(db) = guard.as_ref() else {
            return;
        };
        if let Err(error) = db.delete_value(ACTIVE_USER_KEY) {
            tracing::warn!("Failed to clear active user: {error}");
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        let guard = self.lock();
        match guard.as_ref()?.get_value(key) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!("Failed to read local key '{key}': {error}");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        let guard = self.lock();
        let Some(db) = guard.as_ref() else {
            tracing::debug!("Local store unavailable; dropping write to '{key}'");
            return;
        };
        if let Err(error) = db.set_value(key, value) {
            tracing::warn!("Failed to write local key '{key}': {error}");
        }
    }
}

fn decode_blob<T: SyncRecord>(key: &str, raw: Option<&str>) -> Vec<T> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<T>>(raw) {
        Ok(records) => records,
        Err(error) => {
            tracing::warn!("Discarding malformed local blob '{key}': {error}");
            Vec::new()
        }
    }
}

fn update_blob<T: SyncRecord>(
    db: &mut Database,
    key: &str,
    modify: impl FnOnce(&mut Vec<T>) -> bool,
) -> Result<bool> {
    let tx = db.immediate_transaction()?;
    let mut records = decode_blob(key, read_value(&tx, key)?.as_deref());
    if !modify(&mut records) {
        return Ok(false);
    }

    write_value(&tx, key, &serde_json::to_string(&records)?)?;
    tx.commit()?;
    Ok(true)
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("available", &self.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Complaint, Participant, Quote, Vote};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn empty_store_reads_empty_collections() {
        let store = LocalStore::open_in_memory().unwrap();
        assert!(store.get::<Vote>().is_empty());
        assert!(store.get::<Quote>().is_empty());
        assert_eq!(store.active_user(), None);
    }

    #[test]
    fn put_overwrites_the_collection() {
        let store = LocalStore::open_in_memory().unwrap();
        store.put(&[
            Vote::new("Ana", "Ion", Category::Mfp),
            Vote::new("Ion", "Ana", Category::Dj),
        ]);
        store.put(&[Vote::new("Radu", "Ana", Category::Rizz)]);

        assert_eq!(
            store.get::<Vote>(),
            vec![Vote::new("Radu", "Ana", Category::Rizz)]
        );
    }

    #[test]
    fn malformed_blob_reads_as_empty() {
        let store = LocalStore::open_in_memory().unwrap();
        store.write("cabana_quotes", "{not json");
        assert!(store.get::<Quote>().is_empty());

        store.write("cabana_quotes", r#"{"id":"1"}"#);
        assert!(store.get::<Quote>().is_empty());
    }

    #[test]
    fn active_user_round_trip() {
        let store = LocalStore::open_in_memory().unwrap();
        store.set_active_user("Ana");
        assert_eq!(store.active_user().as_deref(), Some("Ana"));

        store.clear_active_user();
        store.clear_active_user();
        assert_eq!(store.active_user(), None);
    }

    #[test]
    fn unavailable_store_degrades_silently() {
        let store = LocalStore::unavailable();
        store.put(&[Complaint::new("x", "y")]);
        store.set_active_user("Ana");
        assert!(store.get::<Complaint>().is_empty());
        assert_eq!(store.active_user(), None);
    }

    #[test]
    fn collections_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cabana.db");
        let participants = vec![Participant::new("Ana"), Participant::new("Ion")];

        {
            let store = LocalStore::open(&path).unwrap();
            store.put(&participants);
            store.set_active_user("Ion");
        }

        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.get::<Participant>(), participants);
        assert_eq!(store.active_user().as_deref(), Some("Ion"));
    }

    #[test]
    fn unusable_path_falls_back_to_memory() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let store = LocalStore::open_or_memory(blocker.join("cabana.db"));
        store.set_active_user("Ana");
        assert_eq!(store.active_user().as_deref(), Some("Ana"));
    }

    #[test]
    fn update_reports_and_persists_only_changes() {
        let store = LocalStore::open_in_memory().unwrap();
        let vote = Vote::new("Ana", "Ion", Category::Mfp);

        assert!(store.update::<Vote>(|votes| {
            votes.push(vote.clone());
            true
        }));
        assert!(!store.update::<Vote>(|votes| {
            votes.clear();
            false
        }));
        assert_eq!(store.get::<Vote>(), vec![vote]);
    }

    #[test]
    fn unavailable_store_still_runs_update_but_persists_nothing() {
        let store = LocalStore::unavailable();
        let mut ran = false;
        let persisted = store.update::<Quote>(|quotes| {
            ran = true;
            quotes.push(Quote::new("x", "Ion", "Ana"));
            true
        });
        assert!(ran);
        assert!(!persisted);
        assert!(store.get::<Quote>().is_empty());
    }

    #[test]
    fn updates_from_two_handles_on_one_file_are_not_lost() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cabana.db");
        let first = LocalStore::open(&path).unwrap();
        let second = LocalStore::open(&path).unwrap();

        std::thread::scope(|scope| {
            for (store, prefix) in [(&first, "a"), (&second, "b")] {
                scope.spawn(move || {
                    for index in 0..50 {
                        store.update::<Quote>(|quotes| {
                            quotes.push(Quote::new(format!("{prefix}{index}"), "Ion", "Ana"));
                            true
                        });
                    }
                });
            }
        });

        assert_eq!(first.get::<Quote>().len(), 100);
        assert_eq!(second.get::<Quote>().len(), 100);
    }
}
