//! Bounded key/value cache with policy-driven eviction and TTL expiry
//!
//! The store is capacity-limited: an insert of a new key at capacity evicts
//! exactly one victim (chosen by the configured policy) before the insert
//! completes, so `len() <= max_entries` holds after every operation. Expiry
//! is lazy at access time and proactive through [`cleanup`](BoundedCache::cleanup),
//! which the maintenance worker drives on a fixed interval.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, error};

use super::config::CacheConfig;
use super::entry::CacheEntry;
use super::error::CacheError;
use super::statistics::{CacheStats, CacheStatsSnapshot};
use super::traits::{CacheKey, CacheValue};
use crate::timing::ClockSource;

/// Options applied to a single insert
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertOptions {
    /// Per-entry TTL override; falls back to the configured default
    pub ttl: Option<Duration>,
    /// Freeze the entry against in-place mutation
    pub immutable: bool,
}

impl InsertOptions {
    /// Options with an explicit TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    /// Mark the entry as frozen
    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }
}

/// Keyed store guarded by one short critical section per operation
#[derive(Debug)]
struct CacheMap<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Logical tick advanced on every insert and access; drives LRU and
    /// FIFO ordering independently of clock granularity
    tick: u64,
}

impl<K, V> CacheMap<K, V> {
    fn next_tick(&mut self) -> u64 {
        let tick = self.tick;
        self.tick += 1;
        tick
    }
}

/// Capacity-limited associative store with pluggable eviction and TTL expiry
pub struct BoundedCache<K: CacheKey, V: CacheValue> {
    inner: Mutex<CacheMap<K, V>>,
    config: CacheConfig,
    clock: ClockSource,
    stats: CacheStats,
}

impl<K: CacheKey, V: CacheValue> std::fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("len", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<K: CacheKey, V: CacheValue> BoundedCache<K, V> {
    /// Create a cache using the system clock
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        Self::with_clock(config, ClockSource::System)
    }

    /// Create a cache with an explicit clock source (manual in tests)
    pub fn with_clock(config: CacheConfig, clock: ClockSource) -> Result<Self, CacheError> {
        config.validate()?;
        Ok(Self {
            inner: Mutex::new(CacheMap {
                entries: HashMap::with_capacity(config.max_entries),
                tick: 0,
            }),
            config,
            clock,
            stats: CacheStats::default(),
        })
    }

    /// Insert or overwrite an entry
    ///
    /// Overwriting an existing key never evicts; inserting a new key at
    /// capacity evicts exactly one victim first.
    pub fn insert(&self, key: K, value: V, options: InsertOptions) -> Result<(), CacheError> {
        let now_ns = self.clock.now_ns();
        let ttl = options.ttl.unwrap_or(self.config.default_ttl);
        let mut inner = self.lock_inner();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.config.max_entries {
            match self.config.eviction_policy.pick_victim(&inner.entries) {
                Some(victim) => {
                    inner.entries.remove(&victim);
                    self.stats.record_eviction();
                    debug!("evicted {:?} to admit {:?}", victim, key);
                }
                None => {
                    error!("no eviction victim found with store at capacity");
                    return Err(CacheError::CapacityInvariantViolation);
                }
            }
        }

        let seq = inner.next_tick();
        inner
            .entries
            .insert(key, CacheEntry::new(value, now_ns, seq, ttl, options.immutable));
        self.stats.record_insertion();
        Ok(())
    }

    /// Look up a value, updating access bookkeeping on a hit
    ///
    /// An expired entry behaves as absent and is removed as a side effect,
    /// independent of the periodic sweep.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let now_ns = self.clock.now_ns();
        let mut inner = self.lock_inner();

        if self.expire_if_stale(&mut inner, key, now_ns) {
            self.stats.record_miss();
            return None;
        }

        let seq = inner.next_tick();
        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.record_access(now_ns, seq);
                self.stats.record_hit();
                Some(Arc::clone(&entry.value))
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Presence check with the same absent/expired semantics as `get`,
    /// but without access bookkeeping
    pub fn contains(&self, key: &K) -> bool {
        let now_ns = self.clock.now_ns();
        let mut inner = self.lock_inner();
        if self.expire_if_stale(&mut inner, key, now_ns) {
            return false;
        }
        inner.entries.contains_key(key)
    }

    /// Mutate a cached value in place
    ///
    /// Returns `Ok(false)` when the key is absent or expired; frozen
    /// entries are rejected with [`CacheError::ImmutableEntry`]. This is
    /// the only mutation path; values handed out by `get` are shared and
    /// can never alias back into the store.
    pub fn update<F>(&self, key: &K, mutate: F) -> Result<bool, CacheError>
    where
        F: FnOnce(&mut V),
    {
        let now_ns = self.clock.now_ns();
        let mut inner = self.lock_inner();

        if self.expire_if_stale(&mut inner, key, now_ns) {
            return Ok(false);
        }

        let seq = inner.next_tick();
        match inner.entries.get_mut(key) {
            None => Ok(false),
            Some(entry) if entry.immutable => Err(CacheError::ImmutableEntry),
            Some(entry) => {
                mutate(Arc::make_mut(&mut entry.value));
                entry.record_access(now_ns, seq);
                Ok(true)
            }
        }
    }

    /// Remove an entry; `false` when it was absent
    pub fn remove(&self, key: &K) -> bool {
        self.lock_inner().entries.remove(key).is_some()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.lock_inner().entries.clear();
    }

    /// Proactively remove all expired entries, returning how many
    pub fn cleanup(&self) -> usize {
        let now_ns = self.clock.now_ns();
        let mut inner = self.lock_inner();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired(now_ns));
        let removed = before - inner.entries.len();
        if removed > 0 {
            self.stats.record_expirations(removed as u64);
            debug!("expiry sweep removed {} entries", removed);
        }
        removed
    }

    /// Number of live entries (expired-but-unswept entries count until
    /// touched or swept)
    pub fn len(&self) -> usize {
        self.lock_inner().entries.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Operation counters
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// The configuration this cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Remove the entry when its TTL elapsed; `true` when it did
    fn expire_if_stale(&self, inner: &mut CacheMap<K, V>, key: &K, now_ns: u64) -> bool {
        let expired = inner
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(now_ns));
        if expired {
            inner.entries.remove(key);
            self.stats.record_expirations(1);
        }
        expired
    }

    fn lock_inner(&self) -> MutexGuard<'_, CacheMap<K, V>> {
        // A poisoned lock only means a panic mid-operation elsewhere; the
        // map itself is still structurally sound.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::config::EvictionPolicyType;
    use crate::timing::ManualClock;

    fn cache_with(
        policy: EvictionPolicyType,
        max_entries: usize,
    ) -> (BoundedCache<String, u32>, ManualClock) {
        let (clock, handle) = ClockSource::manual();
        let config = CacheConfig {
            max_entries,
            eviction_policy: policy,
            ..CacheConfig::default()
        };
        let cache = BoundedCache::with_clock(config, clock).expect("valid config");
        (cache, handle)
    }

    fn key(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn capacity_invariant_holds_across_inserts() {
        let (cache, _) = cache_with(EvictionPolicyType::Lru, 3);
        for i in 0..50u32 {
            cache
                .insert(format!("k{}", i), i, InsertOptions::default())
                .expect("insert");
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().evictions, 47);
    }

    #[test]
    fn lru_evicts_least_recently_touched() {
        let (cache, _) = cache_with(EvictionPolicyType::Lru, 2);
        cache.insert(key("a"), 1, InsertOptions::default()).expect("insert");
        cache.insert(key("b"), 2, InsertOptions::default()).expect("insert");
        assert!(cache.get(&key("a")).is_some());
        cache.insert(key("c"), 3, InsertOptions::default()).expect("insert");

        assert!(!cache.contains(&key("b")));
        assert!(cache.contains(&key("a")));
        assert!(cache.contains(&key("c")));
    }

    #[test]
    fn fifo_evicts_first_inserted_despite_access() {
        let (cache, _) = cache_with(EvictionPolicyType::Fifo, 2);
        cache.insert(key("a"), 1, InsertOptions::default()).expect("insert");
        cache.insert(key("b"), 2, InsertOptions::default()).expect("insert");
        assert!(cache.get(&key("a")).is_some());
        cache.insert(key("c"), 3, InsertOptions::default()).expect("insert");

        assert!(!cache.contains(&key("a")));
        assert!(cache.contains(&key("b")));
        assert!(cache.contains(&key("c")));
    }

    #[test]
    fn lfu_evicts_least_frequently_used() {
        let (cache, _) = cache_with(EvictionPolicyType::Lfu, 2);
        cache.insert(key("a"), 1, InsertOptions::default()).expect("insert");
        cache.insert(key("b"), 2, InsertOptions::default()).expect("insert");
        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("a")).is_some());
        cache.insert(key("c"), 3, InsertOptions::default()).expect("insert");

        assert!(!cache.contains(&key("b")));
        assert!(cache.contains(&key("a")));
        assert!(cache.contains(&key("c")));
    }

    #[test]
    fn overwrite_does_not_evict() {
        let (cache, _) = cache_with(EvictionPolicyType::Lru, 2);
        cache.insert(key("a"), 1, InsertOptions::default()).expect("insert");
        cache.insert(key("b"), 2, InsertOptions::default()).expect("insert");
        cache.insert(key("a"), 10, InsertOptions::default()).expect("overwrite");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(*cache.get(&key("a")).expect("present"), 10);
    }

    #[test]
    fn ttl_expiry_is_lazy_without_cleanup() {
        let (cache, clock) = cache_with(EvictionPolicyType::Lru, 8);
        cache
            .insert(key("k"), 7, InsertOptions::with_ttl(Duration::from_secs(1)))
            .expect("insert");

        clock.advance(Duration::from_millis(999));
        assert!(cache.contains(&key("k")));

        clock.advance(Duration::from_millis(2));
        assert!(cache.get(&key("k")).is_none());
        // the lazy path physically removed the entry
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn contains_expires_without_bookkeeping() {
        let (cache, clock) = cache_with(EvictionPolicyType::Lfu, 8);
        cache
            .insert(key("k"), 7, InsertOptions::with_ttl(Duration::from_secs(1)))
            .expect("insert");

        clock.advance(Duration::from_secs(2));
        assert!(!cache.contains(&key("k")));
        assert_eq!(cache.len(), 0);
        // no hit/miss was recorded
        assert_eq!(cache.stats().hits, 0);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn cleanup_sweeps_all_expired() {
        let (cache, clock) = cache_with(EvictionPolicyType::Lru, 8);
        cache
            .insert(key("short"), 1, InsertOptions::with_ttl(Duration::from_secs(1)))
            .expect("insert");
        cache
            .insert(key("long"), 2, InsertOptions::with_ttl(Duration::from_secs(60)))
            .expect("insert");

        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.cleanup(), 1);
        assert!(cache.contains(&key("long")));
        assert!(!cache.contains(&key("short")));
    }

    #[test]
    fn immutable_entries_reject_update() {
        let (cache, _) = cache_with(EvictionPolicyType::Lru, 8);
        cache
            .insert(key("frozen"), 1, InsertOptions::default().immutable())
            .expect("insert");
        cache.insert(key("plain"), 1, InsertOptions::default()).expect("insert");

        assert_eq!(
            cache.update(&key("frozen"), |v| *v += 1),
            Err(CacheError::ImmutableEntry)
        );
        assert_eq!(cache.update(&key("plain"), |v| *v += 1), Ok(true));
        assert_eq!(*cache.get(&key("plain")).expect("present"), 2);
        assert_eq!(*cache.get(&key("frozen")).expect("present"), 1);
    }

    #[test]
    fn update_does_not_disturb_shared_readers() {
        let (cache, _) = cache_with(EvictionPolicyType::Lru, 8);
        cache.insert(key("k"), 1, InsertOptions::default()).expect("insert");

        let before = cache.get(&key("k")).expect("present");
        cache.update(&key("k"), |v| *v = 99).expect("update");

        // the earlier handle still sees the value it read
        assert_eq!(*before, 1);
        assert_eq!(*cache.get(&key("k")).expect("present"), 99);
    }

    #[test]
    fn remove_and_clear_are_idempotent() {
        let (cache, _) = cache_with(EvictionPolicyType::Lru, 8);
        cache.insert(key("k"), 1, InsertOptions::default()).expect("insert");

        assert!(cache.remove(&key("k")));
        assert!(!cache.remove(&key("k")));
        cache.clear();
        assert!(cache.is_empty());
    }
}
