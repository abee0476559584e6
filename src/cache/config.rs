//! Cache configuration types
//!
//! Configuration is a structured record with an enumerated option set,
//! validated once at construction and never re-checked at runtime.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::CacheError;

/// Eviction policy selection
///
/// A closed set chosen once at construction; each variant maps to one
/// strategy implementation in [`super::eviction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictionPolicyType {
    /// Evict the entry with the oldest last access
    #[serde(rename = "lru")]
    Lru,
    /// Evict the entry with the fewest recorded accesses
    #[serde(rename = "lfu")]
    Lfu,
    /// Evict the entry inserted first, ignoring access history
    #[serde(rename = "fifo")]
    Fifo,
}

/// Bounded cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries held at any instant
    pub max_entries: usize,
    /// Victim selection policy once capacity is exceeded
    pub eviction_policy: EvictionPolicyType,
    /// TTL applied to entries inserted without an explicit one
    pub default_ttl: Duration,
    /// Interval between proactive expiry sweeps
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            eviction_policy: EvictionPolicyType::Lru,
            default_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Validate the configuration, rejecting degenerate limits
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.max_entries == 0 {
            return Err(CacheError::invalid_configuration(
                "max_entries must be at least 1",
            ));
        }
        if self.default_ttl.is_zero() {
            return Err(CacheError::invalid_configuration(
                "default_ttl must be non-zero",
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(CacheError::invalid_configuration(
                "sweep_interval must be non-zero",
            ));
        }
        Ok(())
    }
}
