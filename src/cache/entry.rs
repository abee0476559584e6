//! Cache entry bookkeeping

use std::sync::Arc;
use std::time::Duration;

/// A single cache slot with access bookkeeping
///
/// Owned exclusively by the cache; callers only ever see the value behind
/// its shared handle.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<V> {
    /// Stored value; `get` hands out clones of this handle
    pub value: Arc<V>,
    /// Insertion timestamp in nanoseconds (drives TTL expiry)
    pub inserted_at_ns: u64,
    /// Last access timestamp in nanoseconds (diagnostics)
    pub last_access_ns: u64,
    /// Logical insertion sequence (FIFO order, eviction tie-break)
    pub inserted_seq: u64,
    /// Logical sequence of the most recent access (LRU order)
    pub last_access_seq: u64,
    /// Number of recorded accesses (LFU order)
    pub access_count: u64,
    /// Time-to-live measured from insertion
    pub ttl: Duration,
    /// Frozen entries refuse in-place mutation
    pub immutable: bool,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(value: V, now_ns: u64, seq: u64, ttl: Duration, immutable: bool) -> Self {
        Self {
            value: Arc::new(value),
            inserted_at_ns: now_ns,
            last_access_ns: now_ns,
            inserted_seq: seq,
            last_access_seq: seq,
            access_count: 0,
            ttl,
            immutable,
        }
    }

    /// Whether the entry's TTL has elapsed at `now_ns`
    pub(crate) fn is_expired(&self, now_ns: u64) -> bool {
        now_ns.saturating_sub(self.inserted_at_ns) > self.ttl.as_nanos() as u64
    }

    /// Record an access at the given wall time and logical sequence
    pub(crate) fn record_access(&mut self, now_ns: u64, seq: u64) {
        self.last_access_ns = now_ns;
        self.last_access_seq = seq;
        self.access_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_strictly_after_ttl() {
        let entry = CacheEntry::new(1u32, 1_000, 0, Duration::from_nanos(500), false);
        assert!(!entry.is_expired(1_000));
        assert!(!entry.is_expired(1_500));
        assert!(entry.is_expired(1_501));
    }

    #[test]
    fn access_bookkeeping() {
        let mut entry = CacheEntry::new("v", 10, 3, Duration::from_secs(1), false);
        assert_eq!(entry.access_count, 0);
        assert_eq!(entry.last_access_seq, 3);

        entry.record_access(20, 7);
        assert_eq!(entry.access_count, 1);
        assert_eq!(entry.last_access_ns, 20);
        assert_eq!(entry.last_access_seq, 7);
        assert_eq!(entry.inserted_seq, 3);
    }
}
