//! Lock-free cache statistics
//!
//! Counters are padded to their own cache lines so concurrent readers of a
//! shared cache handle do not contend on bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Atomic operation counters owned by the cache
#[derive(Debug, Default)]
pub(crate) struct CacheStats {
    hits: CachePadded<AtomicU64>,
    misses: CachePadded<AtomicU64>,
    insertions: CachePadded<AtomicU64>,
    evictions: CachePadded<AtomicU64>,
    expirations: CachePadded<AtomicU64>,
}

impl CacheStats {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_insertion(&self) {
        self.insertions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expirations(&self, count: u64) {
        self.expirations.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStatsSnapshot {
    /// Successful lookups
    pub hits: u64,
    /// Lookups that found nothing (including lazily expired entries)
    pub misses: u64,
    /// Inserts and overwrites
    pub insertions: u64,
    /// Entries removed by the eviction policy
    pub evictions: u64,
    /// Entries removed by TTL expiry (lazy or sweep)
    pub expirations: u64,
}

impl CacheStatsSnapshot {
    /// Hit rate over all lookups; 1.0 when no lookups happened yet
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 1.0;
        }
        self.hits as f64 / total as f64
    }
}
