//! Merge rules shared by every synced collection.

use std::collections::HashMap;

use crate::models::{ConflictPolicy, SyncRecord};

/// Combine the remote and local views of one collection.
///
/// Remote records win ties; local-only records (writes not yet synced) are
/// kept. Duplicate keys inside the remote view collapse to the last one seen.
/// The result is in display order and `merge(merge(r, l), l) == merge(r, l)`.
pub fn merge<T: SyncRecord>(remote: Vec<T>, local: &[T]) -> Vec<T> {
    let mut positions: HashMap<T::Key, usize> = HashMap::with_capacity(remote.len() + local.len());
    let mut merged: Vec<T> = Vec::with_capacity(remote.len() + local.len());

    for record in remote {
        let key = record.key();
        if let Some(&index) = positions.get(&key) {
            merged[index] = record;
        } else {
            positions.insert(key, merged.len());
            merged.push(record);
        }
    }

    for record in local {
        let key = record.key();
        if !positions.contains_key(&key) {
            positions.insert(key, merged.len());
            merged.push(record.clone());
        }
    }

    T::sort_for_display(&mut merged);
    merged
}

/// Apply one local write to the current snapshot.
///
/// With [`ConflictPolicy::Replace`] the old record is dropped and the new one
/// appended; with [`ConflictPolicy::KeepExisting`] an existing record wins.
/// Returns `false` when the snapshot was left unchanged.
pub fn apply_write<T: SyncRecord>(records: &mut Vec<T>, record: T) -> bool {
    let key = record.key();
    let exists = records.iter().any(|existing| existing.key() == key);

    match T::ON_CONFLICT {
        ConflictPolicy::KeepExisting if exists => false,
        ConflictPolicy::KeepExisting => {
            records.push(record);
            true
        }
        ConflictPolicy::Replace => {
            records.retain(|existing| existing.key() != key);
            records.push(record);
            true
        }
    }
}
