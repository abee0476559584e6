//! Public host surface for the gridsync core
//!
//! A [`GridSync`] instance is the explicit composition root that plugins
//! are handed a reference to; there is deliberately no process-wide
//! singleton. It owns one bounded cache, one state coordinator, and the
//! per-key undo histories, and wires the three together.

use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arrayvec::ArrayString;
use async_trait::async_trait;
use dashmap::DashMap;

use crate::cache::{
    BoundedCache, CacheConfig, CacheError, CacheMaintenance, CacheStatsSnapshot, CacheValue,
    EvictionPolicyType, InsertOptions,
};
use crate::coordinator::{
    AppliedChange, ComponentError, CooperativeComponent, CoordinatorStatsSnapshot, SharedState,
    StateChange, StateCoordinator, StatePatch, StateSchema, StateValidator, StateValue,
    UpdateError, UpdateOrigin,
};
use crate::history::BoundedHistory;
use crate::timing::ClockSource;

/// Maximum byte length of a plugin cache key
pub const MAX_CACHE_KEY_BYTES: usize = 128;

/// Bounded plugin cache key
pub type PluginCacheKey = ArrayString<MAX_CACHE_KEY_BYTES>;

/// Validate a plugin-supplied cache key, failing fast on malformed input
fn plugin_cache_key(key: &str) -> Result<PluginCacheKey, CacheError> {
    if key.is_empty() {
        return Err(CacheError::invalid_key("cache key must not be empty"));
    }
    PluginCacheKey::from(key).map_err(|_| {
        let preview: String = key.chars().take(32).collect();
        CacheError::invalid_key(format!(
            "cache key exceeds {} bytes: '{}...'",
            MAX_CACHE_KEY_BYTES, preview
        ))
    })
}

/// Internal component recording committed values for one tracked key
struct HistoryRecorder {
    key: String,
    histories: Arc<DashMap<String, BoundedHistory<StateValue>>>,
}

#[async_trait]
impl CooperativeComponent for HistoryRecorder {
    async fn on_shared_state_change(&self, change: &StateChange) -> Result<(), ComponentError> {
        // Restores replay values that are already in the trail; recording
        // them again would clear the redo stack they came from.
        if change.patch.origin() == UpdateOrigin::HistoryRestore {
            return Ok(());
        }
        if let Some(value) = change.patch.get(&self.key) {
            if let Some(mut history) = self.histories.get_mut(&self.key) {
                history.push(value.clone());
            }
        }
        Ok(())
    }
}

/// Host object owning the cache, the coordinator, and undo histories
///
/// `V` is the value type plugins memoize into the cache. The host is
/// cheap to share behind an `Arc` and is torn down explicitly with
/// [`shutdown`](GridSync::shutdown).
pub struct GridSync<V: CacheValue> {
    cache: Arc<BoundedCache<PluginCacheKey, V>>,
    coordinator: StateCoordinator,
    histories: Arc<DashMap<String, BoundedHistory<StateValue>>>,
    maintenance: Mutex<Option<CacheMaintenance>>,
}

impl<V: CacheValue> std::fmt::Debug for GridSync<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridSync")
            .field("cache", &self.cache)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}

impl<V: CacheValue> GridSync<V> {
    /// Start a builder with default cache settings and an empty schema
    pub fn builder() -> GridSyncBuilder<V> {
        GridSyncBuilder::new()
    }

    // --- plugin cache surface -------------------------------------------

    /// Memoize a value under a plugin key
    pub fn cache_insert(
        &self,
        key: &str,
        value: V,
        options: InsertOptions,
    ) -> Result<(), CacheError> {
        self.cache.insert(plugin_cache_key(key)?, value, options)
    }

    /// Look up a memoized value
    pub fn cache_get(&self, key: &str) -> Result<Option<Arc<V>>, CacheError> {
        Ok(self.cache.get(&plugin_cache_key(key)?))
    }

    /// Presence check without access bookkeeping
    pub fn cache_contains(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.cache.contains(&plugin_cache_key(key)?))
    }

    /// Drop a memoized value; `false` when it was absent
    pub fn cache_remove(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.cache.remove(&plugin_cache_key(key)?))
    }

    /// Drop every memoized value
    pub fn cache_clear(&self) {
        self.cache.clear();
    }

    /// Proactively remove expired entries, returning how many
    pub fn cache_cleanup(&self) -> usize {
        self.cache.cleanup()
    }

    /// Cache operation counters
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }

    // --- shared-state surface -------------------------------------------

    /// Register a cooperative component; `true` when it replaced a prior
    /// registration under the same name
    pub async fn register_component(
        &self,
        name: impl Into<String>,
        component: Arc<dyn CooperativeComponent>,
    ) -> Result<bool, UpdateError> {
        self.coordinator.register_component(name, component).await
    }

    /// Remove a component registration
    pub async fn unregister_component(&self, name: &str) -> Result<bool, UpdateError> {
        self.coordinator.unregister_component(name).await
    }

    /// Propose a shared-state update; see
    /// [`StateCoordinator::request_update`] for ordering guarantees
    pub async fn request_update(&self, patch: StatePatch) -> Result<AppliedChange, UpdateError> {
        self.coordinator.request_update(patch).await
    }

    /// Read-only snapshot of the committed state
    pub fn state(&self) -> SharedState {
        self.coordinator.state()
    }

    /// Committed value for one key
    pub fn value(&self, key: &str) -> Option<StateValue> {
        self.coordinator.value(key)
    }

    /// Coordinator update counters
    pub fn coordinator_stats(&self) -> CoordinatorStatsSnapshot {
        self.coordinator.stats()
    }

    // --- undo history ---------------------------------------------------

    /// Start recording committed values of a declared key
    ///
    /// Seeds the trail with the current committed value and registers an
    /// internal recording component under `history:<key>`.
    pub async fn track_history(
        &self,
        key: &str,
        capacity: NonZeroUsize,
    ) -> Result<(), UpdateError> {
        let Some(current) = self.coordinator.value(key) else {
            return Err(UpdateError::schema_violation(key));
        };

        let mut history = BoundedHistory::new(capacity);
        history.push(current);
        self.histories.insert(key.to_string(), history);

        let recorder = HistoryRecorder {
            key: key.to_string(),
            histories: Arc::clone(&self.histories),
        };
        self.coordinator
            .register_component(format!("history:{}", key), Arc::new(recorder))
            .await?;
        Ok(())
    }

    /// Restore the value a tracked key held before its latest change
    ///
    /// Returns `Ok(false)` when the key is untracked or has nothing to
    /// undo. The restore travels through the normal update queue, so it is
    /// serialized like any other write.
    pub async fn undo(&self, key: &str) -> Result<bool, UpdateError> {
        let restore = {
            let Some(mut history) = self.histories.get_mut(key) else {
                return Ok(false);
            };
            if history.len() < 2 {
                // only the current value is recorded; nothing older to restore
                return Ok(false);
            }
            history.undo();
            history.latest().cloned()
        };
        match restore {
            Some(value) => self
                .coordinator
                .request_update(StatePatch::for_restore().set(key, value))
                .await
                .map(|_| true),
            None => Ok(false),
        }
    }

    /// Re-apply the most recently undone value of a tracked key
    ///
    /// Returns `Ok(false)` once the redo trail is exhausted or was
    /// invalidated by a fresh external edit.
    pub async fn redo(&self, key: &str) -> Result<bool, UpdateError> {
        let next = {
            let Some(mut history) = self.histories.get_mut(key) else {
                return Ok(false);
            };
            history.redo()
        };
        match next {
            Some(value) => self
                .coordinator
                .request_update(StatePatch::for_restore().set(key, value))
                .await
                .map(|_| true),
            None => Ok(false),
        }
    }

    /// Whether a tracked key currently has a redoable value
    pub fn can_redo(&self, key: &str) -> bool {
        self.histories
            .get(key)
            .map(|history| history.can_redo())
            .unwrap_or(false)
    }

    // --- lifecycle ------------------------------------------------------

    /// Tear down the coordinator and stop the sweep worker
    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
        let maintenance = self
            .maintenance
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(maintenance) = maintenance {
            maintenance.shutdown().await;
        }
    }
}

/// Fluent builder for a [`GridSync`] host
pub struct GridSyncBuilder<V: CacheValue> {
    cache_config: CacheConfig,
    schema: StateSchema,
    sweep: bool,
    clock: ClockSource,
    _value: PhantomData<V>,
}

impl<V: CacheValue> Default for GridSyncBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: CacheValue> GridSyncBuilder<V> {
    /// Builder with default cache settings and an empty schema
    pub fn new() -> Self {
        Self {
            cache_config: CacheConfig::default(),
            schema: StateSchema::new(),
            sweep: true,
            clock: ClockSource::System,
            _value: PhantomData,
        }
    }

    /// Maximum number of cached entries
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.cache_config.max_entries = max_entries;
        self
    }

    /// Victim selection policy
    pub fn eviction_policy(mut self, policy: EvictionPolicyType) -> Self {
        self.cache_config.eviction_policy = policy;
        self
    }

    /// TTL applied to entries inserted without an explicit one
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.cache_config.default_ttl = ttl;
        self
    }

    /// Interval between background expiry sweeps
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.cache_config.sweep_interval = interval;
        self
    }

    /// Enable or disable the background sweep worker
    pub fn sweep(mut self, enabled: bool) -> Self {
        self.sweep = enabled;
        self
    }

    /// Clock source for TTL bookkeeping (manual in tests)
    pub fn clock(mut self, clock: ClockSource) -> Self {
        self.clock = clock;
        self
    }

    /// Declare one shared-state key with its validator and initial value
    pub fn declare(
        mut self,
        key: impl Into<String>,
        validator: StateValidator,
        initial: impl Into<StateValue>,
    ) -> Self {
        self.schema = self.schema.declare(key, validator, initial);
        self
    }

    /// Build the host, spawning its workers on the current tokio runtime
    pub fn build(self) -> Result<GridSync<V>, CacheError> {
        let cache = Arc::new(BoundedCache::with_clock(self.cache_config, self.clock)?);
        let coordinator = StateCoordinator::new(self.schema)
            .map_err(|e| CacheError::invalid_configuration(format!("state schema: {}", e)))?;
        let maintenance = self
            .sweep
            .then(|| CacheMaintenance::spawn(Arc::clone(&cache)));

        Ok(GridSync {
            cache,
            coordinator,
            histories: Arc::new(DashMap::new()),
            maintenance: Mutex::new(maintenance),
        })
    }
}
