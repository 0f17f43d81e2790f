//! In-memory index: key to the offset of its most recent live record.
//!
//! Derived state only. Rebuilt from scratch on every open by replaying
//! the main store file (and then the WAL); never persisted. Runtime
//! mutations, the startup scan and WAL replay all go through the same
//! [`KeyIndex::apply`] rule so the rebuild is exactly reproducible.

use std::collections::HashMap;

use crate::record::Record;

/// Map from live key to the byte offset of its latest record in the
/// main store file.
#[derive(Debug, Default)]
pub struct KeyIndex {
    offsets: HashMap<String, u64>,
}

impl KeyIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one record observed at `offset`.
    ///
    /// A live record indexes (or re-indexes) its key; a tombstone
    /// removes it. Last write wins.
    pub fn apply(&mut self, record: &Record, offset: u64) {
        if record.deleted {
            self.offsets.remove(&record.key);
        } else {
            self.offsets.insert(record.key.clone(), offset);
        }
    }

    /// Offset of the key's most recent live record, if any.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.offsets.get(key).copied()
    }

    /// Whether the key is currently live.
    pub fn contains(&self, key: &str) -> bool {
        self.offsets.contains_key(key)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether no keys are live.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Iterates over `(key, offset)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.offsets.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Drops all entries (the prelude to a rebuild).
    pub fn clear(&mut self) {
        self.offsets.clear();
    }
}
