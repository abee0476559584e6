//! Background expiry sweep
//!
//! Runs [`BoundedCache::cleanup`] on a fixed interval so entries nobody
//! reads again still get reclaimed, bounding worst-case memory held by
//! stale values.

use std::sync::Arc;

use log::debug;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::core::BoundedCache;
use super::traits::{CacheKey, CacheValue};

/// Handle to the periodic sweep task
#[derive(Debug)]
pub struct CacheMaintenance {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl CacheMaintenance {
    /// Spawn the sweep loop on the current tokio runtime
    ///
    /// The interval comes from the cache's `sweep_interval` configuration.
    pub fn spawn<K: CacheKey, V: CacheValue>(cache: Arc<BoundedCache<K, V>>) -> Self {
        let interval = cache.config().sweep_interval;
        let (shutdown, mut stop) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // the first tick completes immediately; skip it so the first
            // sweep happens one full interval after spawn
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.cleanup();
                        if removed > 0 {
                            debug!("maintenance sweep reclaimed {} expired entries", removed);
                        }
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        Self { shutdown, handle }
    }

    /// Stop the sweep loop and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::config::CacheConfig;
    use crate::cache::core::InsertOptions;
    use crate::timing::ClockSource;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn sweep_reclaims_expired_entries() {
        let (clock, handle) = ClockSource::manual();
        let config = CacheConfig {
            max_entries: 8,
            sweep_interval: Duration::from_millis(50),
            ..CacheConfig::default()
        };
        let cache = Arc::new(
            BoundedCache::<String, u32>::with_clock(config, clock).expect("valid config"),
        );
        cache
            .insert(
                "stale".to_string(),
                1,
                InsertOptions::with_ttl(Duration::from_secs(1)),
            )
            .expect("insert");

        let maintenance = CacheMaintenance::spawn(Arc::clone(&cache));
        handle.advance(Duration::from_secs(2));

        // let the paused runtime run a few sweep ticks
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);

        maintenance.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_sweep_task() {
        let cache = Arc::new(
            BoundedCache::<String, u32>::new(CacheConfig::default()).expect("valid config"),
        );
        let maintenance = CacheMaintenance::spawn(Arc::clone(&cache));
        maintenance.shutdown().await;
    }
}
