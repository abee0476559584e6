//! Gridsync prelude - convenient imports for users
//!
//! This module provides everything embedders and plugin authors need to
//! work with the gridsync core.

// Re-export the host API
pub use crate::gridsync::{GridSync, GridSyncBuilder, PluginCacheKey, MAX_CACHE_KEY_BYTES};

// Cache surface
pub use crate::cache::{
    BoundedCache, CacheConfig, CacheError, CacheKey, CacheMaintenance, CacheStatsSnapshot,
    CacheValue, EvictionPolicyType, InsertOptions,
};

// Shared-state surface
pub use crate::coordinator::{
    AppliedChange, ComponentError, CooperativeComponent, CoordinatorStatsSnapshot,
    NotificationOutcome, SharedState, StateChange, StateCoordinator, StatePatch, StateSchema,
    StateValidator, StateValue, UpdateError, UpdateOrigin,
};

// Undo support
pub use crate::history::BoundedHistory;

// Clock injection for deterministic expiry tests
pub use crate::timing::{ClockSource, ManualClock};

// Re-export the async notification attribute components implement with
pub use async_trait::async_trait;
