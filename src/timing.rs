//! Timestamp helpers and the injectable clock used for TTL bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Get current wall-clock timestamp in nanoseconds
pub fn timestamp_nanos() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Externally driven clock handle for deterministic expiry tests
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ns: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a manual clock starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current manual time in nanoseconds
    pub fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::Relaxed)
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.now_ns
            .fetch_add(by.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Set the clock to an absolute nanosecond value
    pub fn set_ns(&self, now_ns: u64) {
        self.now_ns.store(now_ns, Ordering::Relaxed);
    }
}

/// Clock source for cache timestamp bookkeeping
///
/// Production code uses the system clock; tests drive a [`ManualClock`]
/// to exercise TTL expiry without sleeping.
#[derive(Debug, Clone, Default)]
pub enum ClockSource {
    /// Wall-clock time from `SystemTime`
    #[default]
    System,
    /// Externally advanced counter
    Manual(ManualClock),
}

impl ClockSource {
    /// Create a manual clock source together with its driving handle
    pub fn manual() -> (Self, ManualClock) {
        let clock = ManualClock::new();
        (Self::Manual(clock.clone()), clock)
    }

    /// Current timestamp in nanoseconds
    pub fn now_ns(&self) -> u64 {
        match self {
            ClockSource::System => timestamp_nanos(),
            ClockSource::Manual(clock) => clock.now_ns(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let (source, handle) = ClockSource::manual();
        assert_eq!(source.now_ns(), 0);

        handle.advance(Duration::from_secs(2));
        assert_eq!(source.now_ns(), 2_000_000_000);

        handle.set_ns(5);
        assert_eq!(source.now_ns(), 5);
    }

    #[test]
    fn system_clock_is_nonzero() {
        assert!(ClockSource::System.now_ns() > 0);
    }
}
