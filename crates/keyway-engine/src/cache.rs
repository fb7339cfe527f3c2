//! Per-handle resolution cache
//!
//! Remembers which signatures of an operation are arity-viable for a call
//! shape. Whether a signature finally wins depends on the actual values, so
//! only the shape-dependent part of resolution is cached. The cache lives
//! inside one handle and dies with it, so a new catalog never sees stale
//! entries.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Call shape a cached entry applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeKey {
    /// Operation index in the catalog
    pub operation: usize,
    /// Number of positional values
    pub positional: usize,
    /// Whether named values were supplied
    pub has_named: bool,
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that computed a new entry
    pub misses: u64,
    /// Stored entries
    pub entries: usize,
}

#[derive(Debug, Default)]
struct Inner {
    entries: FxHashMap<ShapeKey, Arc<[usize]>>,
    hits: u64,
    misses: u64,
}

/// Arity-filter results keyed by call shape
#[derive(Debug, Default)]
pub struct ResolutionCache {
    inner: Mutex<Inner>,
}

impl ResolutionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached candidates for `key`, computing them with `compute` on a miss
    pub fn get_or_insert_with(
        &self,
        key: ShapeKey,
        compute: impl FnOnce() -> Vec<usize>,
    ) -> Arc<[usize]> {
        let mut inner = self.inner.lock();
        if let Some(candidates) = inner.entries.get(&key).cloned() {
            inner.hits += 1;
            return candidates;
        }
        inner.misses += 1;
        let candidates: Arc<[usize]> = compute().into();
        inner.entries.insert(key, Arc::clone(&candidates));
        candidates
    }

    /// Current counters
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entries: inner.entries.len(),
        }
    }
}
