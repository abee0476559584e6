//! Eviction policy implementations
//!
//! Each policy is a unit strategy implementing one victim-selection
//! interface; the configured [`EvictionPolicyType`] dispatches to exactly
//! one of them, fixed at construction. All policies share the same
//! tie-break: among entries with equal scores, the one inserted first is
//! evicted.

use std::collections::HashMap;

use super::config::EvictionPolicyType;
use super::entry::CacheEntry;
use super::traits::{CacheKey, CacheValue};

/// Victim selection interface implemented by each policy
///
/// Returns `None` only when the store is empty.
pub(crate) trait EvictionStrategy {
    fn pick_victim<K: CacheKey, V: CacheValue>(
        &self,
        entries: &HashMap<K, CacheEntry<V>>,
    ) -> Option<K>;
}

/// Least-recently-used: evict the entry with the oldest access
pub(crate) struct LruStrategy;

/// Least-frequently-used: evict the entry with the fewest accesses
pub(crate) struct LfuStrategy;

/// First-in-first-out: evict the entry inserted first, ignoring accesses
pub(crate) struct FifoStrategy;

/// Scan for the minimum score; ties fall back to the oldest insertion
fn min_by_score<K, V, F>(entries: &HashMap<K, CacheEntry<V>>, score: F) -> Option<K>
where
    K: CacheKey,
    V: CacheValue,
    F: Fn(&CacheEntry<V>) -> u64,
{
    entries
        .iter()
        .min_by_key(|(_, entry)| (score(entry), entry.inserted_seq))
        .map(|(key, _)| key.clone())
}

impl EvictionStrategy for LruStrategy {
    fn pick_victim<K: CacheKey, V: CacheValue>(
        &self,
        entries: &HashMap<K, CacheEntry<V>>,
    ) -> Option<K> {
        min_by_score(entries, |entry| entry.last_access_seq)
    }
}

impl EvictionStrategy for LfuStrategy {
    fn pick_victim<K: CacheKey, V: CacheValue>(
        &self,
        entries: &HashMap<K, CacheEntry<V>>,
    ) -> Option<K> {
        min_by_score(entries, |entry| entry.access_count)
    }
}

impl EvictionStrategy for FifoStrategy {
    fn pick_victim<K: CacheKey, V: CacheValue>(
        &self,
        entries: &HashMap<K, CacheEntry<V>>,
    ) -> Option<K> {
        min_by_score(entries, |entry| entry.inserted_seq)
    }
}

impl EvictionPolicyType {
    /// Select the entry to evict under this policy
    pub(crate) fn pick_victim<K: CacheKey, V: CacheValue>(
        &self,
        entries: &HashMap<K, CacheEntry<V>>,
    ) -> Option<K> {
        match self {
            EvictionPolicyType::Lru => LruStrategy.pick_victim(entries),
            EvictionPolicyType::Lfu => LfuStrategy.pick_victim(entries),
            EvictionPolicyType::Fifo => FifoStrategy.pick_victim(entries),
        }
    }
}
