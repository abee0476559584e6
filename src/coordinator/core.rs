//! Shared-state coordinator
//!
//! Owns one shared mutable state record and serializes every mutation
//! through a single-writer worker, then fans out notifications to the
//! registered cooperative components after each commit. Consumers never
//! touch the record directly: reads go through committed snapshots,
//! writes through [`request_update`](StateCoordinator::request_update).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crossbeam_utils::CachePadded;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::component::{AppliedChange, CooperativeComponent};
use super::error::UpdateError;
use super::schema::StateSchema;
use super::state::{SharedState, StatePatch, StateValue};
use super::worker::{Command, CoordinatorWorker};

/// Atomic update counters owned by the coordinator
#[derive(Debug, Default)]
pub(crate) struct CoordinatorStats {
    applied: CachePadded<AtomicU64>,
    rejected: CachePadded<AtomicU64>,
    notification_failures: CachePadded<AtomicU64>,
}

impl CoordinatorStats {
    pub(crate) fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_notification_failure(&self) {
        self.notification_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CoordinatorStatsSnapshot {
        CoordinatorStatsSnapshot {
            applied: self.applied.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            notification_failures: self.notification_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the coordinator counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinatorStatsSnapshot {
    /// Patches validated, merged, and fanned out
    pub applied: u64,
    /// Patches rejected by schema or validator checks
    pub rejected: u64,
    /// Individual component notifications that errored or panicked
    pub notification_failures: u64,
}

/// Serialized update engine over one shared state record
///
/// Construction spawns the worker on the current tokio runtime, so a
/// runtime must be active. The coordinator lives for the lifetime of its
/// owner and is torn down explicitly with
/// [`shutdown`](StateCoordinator::shutdown).
pub struct StateCoordinator {
    commands: mpsc::UnboundedSender<Command>,
    state: Arc<RwLock<SharedState>>,
    stats: Arc<CoordinatorStats>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for StateCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCoordinator")
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl StateCoordinator {
    /// Build a coordinator over the declared schema
    ///
    /// Initial values are validated here; the schema never changes after
    /// construction.
    pub fn new(schema: StateSchema) -> Result<Self, UpdateError> {
        let state = Arc::new(RwLock::new(schema.initial_state()?));
        let stats = Arc::new(CoordinatorStats::default());
        let (commands, rx) = mpsc::unbounded_channel();

        let worker = CoordinatorWorker::new(schema, Arc::clone(&state), Arc::clone(&stats), rx);
        let handle = tokio::spawn(worker.run());

        Ok(Self {
            commands,
            state,
            stats,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Register a component under a logical name
    ///
    /// Returns `true` when it replaced a prior registration with the same
    /// name. Last registration wins, explicitly.
    pub async fn register_component(
        &self,
        name: impl Into<String>,
        component: Arc<dyn CooperativeComponent>,
    ) -> Result<bool, UpdateError> {
        let (done, reply) = oneshot::channel();
        self.send(Command::Register {
            name: name.into(),
            component,
            done,
        })?;
        reply.await.map_err(|_| UpdateError::CoordinatorClosed)
    }

    /// Remove a registration; `false` when no component had that name
    pub async fn unregister_component(&self, name: &str) -> Result<bool, UpdateError> {
        let (done, reply) = oneshot::channel();
        self.send(Command::Unregister {
            name: name.to_string(),
            done,
        })?;
        reply.await.map_err(|_| UpdateError::CoordinatorClosed)
    }

    /// Propose a state update
    ///
    /// Resolves once the patch (or its rejection) has been fully
    /// processed, including notification fan-out. Updates submitted while
    /// another is in flight are queued, never interleaved and never
    /// dropped; they apply strictly in submission order. A rejected patch
    /// leaves the state untouched and does not block subsequent patches.
    pub async fn request_update(
        &self,
        patch: StatePatch,
    ) -> Result<AppliedChange, UpdateError> {
        let (done, reply) = oneshot::channel();
        self.send(Command::Update { patch, done })?;
        reply.await.map_err(|_| UpdateError::CoordinatorClosed)?
    }

    /// Read-only snapshot of the committed state
    ///
    /// Queued-but-unapplied patches are never visible.
    pub fn state(&self) -> SharedState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Committed value for one key
    pub fn value(&self, key: &str) -> Option<StateValue> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    /// Update counters
    pub fn stats(&self) -> CoordinatorStatsSnapshot {
        self.stats.snapshot()
    }

    /// Tear down: unregister all components, fail queued updates with
    /// [`UpdateError::CoordinatorClosed`], and stop the worker
    pub async fn shutdown(&self) {
        let (done, reply) = oneshot::channel();
        if self.send(Command::Shutdown { done }).is_ok() {
            let _ = reply.await;
        }
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    fn send(&self, command: Command) -> Result<(), UpdateError> {
        self.commands
            .send(command)
            .map_err(|_| UpdateError::CoordinatorClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::component::{NotificationOutcome, StateChange};
    use crate::coordinator::error::ComponentError;
    use crate::coordinator::schema::StateValidator;
    use async_trait::async_trait;
    use std::time::Duration;

    fn paging_schema() -> StateSchema {
        StateSchema::new()
            .declare("currentPage", StateValidator::PositiveInt, 1)
            .declare("pageSize", StateValidator::PositiveInt, 25)
            .declare("totalItems", StateValidator::NonNegativeInt, 0)
            .declare("filteredData", StateValidator::List, StateValue::List(Vec::new()))
    }

    /// Records every applied patch it observes, optionally slowly
    struct Recorder {
        seen: std::sync::Mutex<Vec<i64>>,
        delay: Duration,
    }

    impl Recorder {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                seen: std::sync::Mutex::new(Vec::new()),
                delay,
            })
        }

        fn seen(&self) -> Vec<i64> {
            self.seen.lock().expect("recorder lock").clone()
        }
    }

    #[async_trait]
    impl CooperativeComponent for Recorder {
        async fn on_shared_state_change(
            &self,
            change: &StateChange,
        ) -> Result<(), ComponentError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(page) = change.patch.get("currentPage").and_then(|v| v.as_int()) {
                self.seen.lock().expect("recorder lock").push(page);
            }
            Ok(())
        }
    }

    /// Always fails its notification
    struct Faulty;

    #[async_trait]
    impl CooperativeComponent for Faulty {
        async fn on_shared_state_change(
            &self,
            _change: &StateChange,
        ) -> Result<(), ComponentError> {
            Err(ComponentError::from("simulated plugin failure"))
        }
    }

    #[tokio::test]
    async fn initial_state_comes_from_schema() {
        let coordinator = StateCoordinator::new(paging_schema()).expect("schema valid");
        assert_eq!(coordinator.value("pageSize"), Some(StateValue::Int(25)));
        assert_eq!(coordinator.state().len(), 4);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn updates_apply_in_submission_order() {
        let coordinator =
            Arc::new(StateCoordinator::new(paging_schema()).expect("schema valid"));
        let recorder = Recorder::new(Duration::from_millis(5));
        coordinator
            .register_component("recorder", recorder.clone())
            .await
            .expect("register");

        // join! polls its futures in argument order, so all four requests
        // enqueue before the first notify cycle settles; the worker must
        // still apply them strictly in that order.
        let update = |page: i64| {
            let coordinator = Arc::clone(&coordinator);
            async move {
                coordinator
                    .request_update(StatePatch::new().set("currentPage", page))
                    .await
            }
        };
        let (r1, r2, r3, r4) = tokio::join!(update(1), update(2), update(3), update(4));
        for result in [r1, r2, r3, r4] {
            result.expect("update");
        }

        assert_eq!(recorder.seen(), vec![1, 2, 3, 4]);
        assert_eq!(coordinator.value("currentPage"), Some(StateValue::Int(4)));
        assert_eq!(coordinator.stats().applied, 4);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn sequential_updates_preserve_order_and_last_wins() {
        let coordinator = StateCoordinator::new(paging_schema()).expect("schema valid");
        let recorder = Recorder::new(Duration::ZERO);
        coordinator
            .register_component("recorder", recorder.clone())
            .await
            .expect("register");

        for page in [3i64, 7, 2] {
            coordinator
                .request_update(StatePatch::new().set("currentPage", page))
                .await
                .expect("update");
        }

        assert_eq!(recorder.seen(), vec![3, 7, 2]);
        assert_eq!(coordinator.value("currentPage"), Some(StateValue::Int(2)));
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn undeclared_key_is_rejected() {
        let coordinator = StateCoordinator::new(paging_schema()).expect("schema valid");
        let result = coordinator
            .request_update(StatePatch::new().set("sortColumn", 1))
            .await;
        assert_eq!(
            result.err(),
            Some(UpdateError::schema_violation("sortColumn"))
        );
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn rejection_leaves_state_untouched_and_queue_draining() {
        let coordinator = StateCoordinator::new(paging_schema()).expect("schema valid");

        let rejected = coordinator
            .request_update(
                StatePatch::new().set("currentPage", 2).set("pageSize", -1),
            )
            .await;
        assert!(matches!(
            rejected,
            Err(UpdateError::ValidationFailed { ref key }) if key.as_str() == "pageSize"
        ));
        // no partial merge of the valid-looking key
        assert_eq!(coordinator.value("currentPage"), Some(StateValue::Int(1)));

        let applied = coordinator
            .request_update(StatePatch::new().set("currentPage", 2))
            .await;
        assert!(applied.is_ok());
        assert_eq!(coordinator.value("currentPage"), Some(StateValue::Int(2)));

        let stats = coordinator.stats();
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.applied, 1);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn failing_component_does_not_block_siblings_or_caller() {
        let coordinator = StateCoordinator::new(paging_schema()).expect("schema valid");
        let recorder = Recorder::new(Duration::ZERO);
        coordinator
            .register_component("faulty", Arc::new(Faulty))
            .await
            .expect("register");
        coordinator
            .register_component("recorder", recorder.clone())
            .await
            .expect("register");

        let applied = coordinator
            .request_update(StatePatch::new().set("currentPage", 5))
            .await
            .expect("update succeeds despite component failure");

        assert_eq!(applied.notifications.len(), 2);
        assert!(!applied.fully_delivered());
        assert_eq!(applied.failures().count(), 1);
        assert_eq!(
            applied.failures().next().map(NotificationOutcome::component),
            Some("faulty")
        );
        // the sibling still saw the change and the state still merged
        assert_eq!(recorder.seen(), vec![5]);
        assert_eq!(coordinator.value("currentPage"), Some(StateValue::Int(5)));
        assert_eq!(coordinator.stats().notification_failures, 1);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn reregistering_a_name_replaces_it() {
        let coordinator = StateCoordinator::new(paging_schema()).expect("schema valid");
        let first = Recorder::new(Duration::ZERO);
        let second = Recorder::new(Duration::ZERO);

        let replaced = coordinator
            .register_component("pagination", first.clone())
            .await
            .expect("register");
        assert!(!replaced);
        let replaced = coordinator
            .register_component("pagination", second.clone())
            .await
            .expect("register");
        assert!(replaced);

        coordinator
            .request_update(StatePatch::new().set("currentPage", 9))
            .await
            .expect("update");

        assert!(first.seen().is_empty());
        assert_eq!(second.seen(), vec![9]);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn overlapping_patches_resolve_last_applied_wins() {
        let coordinator = StateCoordinator::new(paging_schema()).expect("schema valid");
        coordinator
            .request_update(
                StatePatch::new().set("pageSize", 10).set("totalItems", 100),
            )
            .await
            .expect("update");
        coordinator
            .request_update(StatePatch::new().set("pageSize", 50))
            .await
            .expect("update");

        assert_eq!(coordinator.value("pageSize"), Some(StateValue::Int(50)));
        assert_eq!(coordinator.value("totalItems"), Some(StateValue::Int(100)));
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_fails_later_requests_fast() {
        let coordinator = StateCoordinator::new(paging_schema()).expect("schema valid");
        coordinator.shutdown().await;

        let result = coordinator
            .request_update(StatePatch::new().set("currentPage", 2))
            .await;
        assert_eq!(result.err(), Some(UpdateError::CoordinatorClosed));
        assert!(coordinator
            .register_component("late", Recorder::new(Duration::ZERO))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn unregistered_component_stops_receiving() {
        let coordinator = StateCoordinator::new(paging_schema()).expect("schema valid");
        let recorder = Recorder::new(Duration::ZERO);
        coordinator
            .register_component("recorder", recorder.clone())
            .await
            .expect("register");
        assert!(coordinator
            .unregister_component("recorder")
            .await
            .expect("unregister"));
        assert!(!coordinator
            .unregister_component("recorder")
            .await
            .expect("second unregister"));

        coordinator
            .request_update(StatePatch::new().set("currentPage", 4))
            .await
            .expect("update");
        assert!(recorder.seen().is_empty());
        coordinator.shutdown().await;
    }
}
