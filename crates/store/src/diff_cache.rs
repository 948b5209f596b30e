//! Bounded memo of computed version diffs.
//!
//! Versions are immutable, so a diff keyed by `(from_id, to_id)` never goes
//! stale. Entries are evicted oldest-insert first once the capacity is hit.

use std::sync::{Mutex, PoisonError};

use indexmap::IndexMap;

use folio_core::diff::VersionDiff;
use folio_core::types::EntityId;

/// Default number of cached diffs.
pub const DEFAULT_DIFF_CACHE_CAPACITY: usize = 256;

pub struct DiffCache {
    capacity: usize,
    entries: Mutex<IndexMap<(EntityId, EntityId), VersionDiff>>,
}

impl DiffCache {
    /// A capacity of `0` disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(IndexMap::with_capacity(capacity)),
        }
    }

    pub fn get(&self, from: EntityId, to: EntityId) -> Option<VersionDiff> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(from, to))
            .cloned()
    }

    pub fn insert(&self, diff: VersionDiff) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (diff.from_version, diff.to_version);
        if !entries.contains_key(&key) {
            while entries.len() >= self.capacity {
                entries.shift_remove_index(0);
            }
        }
        entries.insert(key, diff);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DiffCache {
    fn default() -> Self {
        Self::new(DEFAULT_DIFF_CACHE_CAPACITY)
    }
}
