//! Memoized target-store existence checks.

use crate::error::EngineResult;
use objsync_model::{RecordId, RecordStore};
use std::collections::HashMap;
use tracing::trace;

/// Memoizes "does this ID already exist in the target" lookups.
///
/// Not synchronized: use one cache per resolution, or clear it between
/// resolutions when the target may have changed.
#[derive(Debug, Clone, Default)]
pub struct ExistenceCache {
    known: HashMap<RecordId, bool>,
    live_checks: HashMap<RecordId, u32>,
    hits: u64,
    misses: u64,
}

impl ExistenceCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `id` exists in `store`, asking the store only on a miss.
    ///
    /// # Errors
    ///
    /// Propagates store failures; failed lookups are not cached.
    pub fn exists<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        id: &RecordId,
    ) -> EngineResult<bool> {
        if let Some(known) = self.known.get(id) {
            self.hits += 1;
            return Ok(*known);
        }

        self.misses += 1;
        *self.live_checks.entry(*id).or_insert(0) += 1;
        let exists = store.exists(id)?;
        trace!(id = %id, exists, "existence checked against target");
        self.known.insert(*id, exists);
        Ok(exists)
    }

    /// Seeds the cache with a known answer.
    pub fn record(&mut self, id: RecordId, exists: bool) {
        self.known.insert(id, exists);
    }

    /// Returns the cached answer without touching the store.
    pub fn get(&self, id: &RecordId) -> Option<bool> {
        self.known.get(id).copied()
    }

    /// Number of live store lookups performed for `id`.
    pub fn checks_for(&self, id: &RecordId) -> u32 {
        self.live_checks.get(id).copied().unwrap_or(0)
    }

    /// Lookups answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that went to the store.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Number of cached IDs.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Forgets all answers and counters.
    pub fn clear(&mut self) {
        self.known.clear();
        self.live_checks.clear();
        self.hits = 0;
        self.misses = 0;
    }
}
