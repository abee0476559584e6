//! Serialized update worker
//!
//! All coordinator commands flow through one channel into one task: an
//! explicit iterative drain loop, so there is no recursive re-invocation
//! and no unbounded call-stack growth under high update volume. At most
//! one patch is ever in flight; the next command is not dequeued until the
//! current patch's full merge-plus-notify cycle has settled, including any
//! asynchronous work inside notifications.

use std::sync::{Arc, RwLock};

use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};

use super::component::{AppliedChange, CooperativeComponent, NotificationOutcome, StateChange};
use super::core::CoordinatorStats;
use super::error::UpdateError;
use super::schema::StateSchema;
use super::state::{SharedState, StatePatch};

/// Commands accepted by the worker
pub(crate) enum Command {
    /// Validate, merge, and fan out one patch
    Update {
        patch: StatePatch,
        done: oneshot::Sender<Result<AppliedChange, UpdateError>>,
    },
    /// Register a component; replies whether it replaced a prior one
    Register {
        name: String,
        component: Arc<dyn CooperativeComponent>,
        done: oneshot::Sender<bool>,
    },
    /// Remove a registration; replies whether it existed
    Unregister {
        name: String,
        done: oneshot::Sender<bool>,
    },
    /// Tear down: unregister everything, fail queued updates, stop
    Shutdown { done: oneshot::Sender<()> },
}

pub(crate) struct CoordinatorWorker {
    schema: StateSchema,
    /// Committed state; written only by this worker, read by snapshots
    state: Arc<RwLock<SharedState>>,
    components: Vec<(String, Arc<dyn CooperativeComponent>)>,
    stats: Arc<CoordinatorStats>,
    rx: mpsc::UnboundedReceiver<Command>,
}

impl CoordinatorWorker {
    pub(crate) fn new(
        schema: StateSchema,
        state: Arc<RwLock<SharedState>>,
        stats: Arc<CoordinatorStats>,
        rx: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            schema,
            state,
            components: Vec::new(),
            stats,
            rx,
        }
    }

    /// Drain loop: one command at a time, in arrival order
    pub(crate) async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Update { patch, done } => {
                    let result = self.apply(patch).await;
                    let _ = done.send(result);
                }
                Command::Register {
                    name,
                    component,
                    done,
                } => {
                    let _ = done.send(self.register(name, component));
                }
                Command::Unregister { name, done } => {
                    let existed = self.components.iter().any(|(n, _)| *n == name);
                    self.components.retain(|(n, _)| *n != name);
                    let _ = done.send(existed);
                }
                Command::Shutdown { done } => {
                    self.teardown();
                    let _ = done.send(());
                    return;
                }
            }
        }
    }

    fn register(&mut self, name: String, component: Arc<dyn CooperativeComponent>) -> bool {
        // Last registration wins, explicitly.
        if let Some(slot) = self.components.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = component;
            debug!("component '{}' re-registered, prior registration replaced", name);
            true
        } else {
            self.components.push((name, component));
            false
        }
    }

    /// Validate, merge, and notify for one patch
    async fn apply(&mut self, patch: StatePatch) -> Result<AppliedChange, UpdateError> {
        if let Err(rejection) = self.validate(&patch) {
            self.stats.record_rejection();
            warn!("patch rejected: {}", rejection);
            return Err(rejection);
        }

        let snapshot = {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for (key, value) in patch.entries() {
                state.insert(key.clone(), value.clone());
            }
            state.clone()
        };
        self.stats.record_applied();
        debug!("applied patch touching {} key(s)", patch.len());

        let change = Arc::new(StateChange {
            patch: patch.clone(),
            state: snapshot,
        });
        let mut notifications = Vec::with_capacity(self.components.len());
        for (name, component) in &self.components {
            notifications.push(Self::notify(name, component, &change, &self.stats).await);
        }

        Ok(AppliedChange {
            patch,
            notifications,
        })
    }

    /// Every key must be declared and every value accepted before any merge
    fn validate(&self, patch: &StatePatch) -> Result<(), UpdateError> {
        for (key, value) in patch.entries() {
            let validator = self
                .schema
                .validator(key)
                .ok_or_else(|| UpdateError::schema_violation(key.clone()))?;
            if !validator.accepts(value) {
                return Err(UpdateError::validation_failed(key.clone()));
            }
        }
        Ok(())
    }

    /// Deliver one notification, capturing errors and panics per component
    async fn notify(
        name: &str,
        component: &Arc<dyn CooperativeComponent>,
        change: &Arc<StateChange>,
        stats: &CoordinatorStats,
    ) -> NotificationOutcome {
        let component = Arc::clone(component);
        let change = Arc::clone(change);
        let joined =
            tokio::spawn(async move { component.on_shared_state_change(&change).await }).await;

        match joined {
            Ok(Ok(())) => NotificationOutcome::Delivered {
                component: name.to_string(),
            },
            Ok(Err(error)) => {
                stats.record_notification_failure();
                warn!("component '{}' failed to handle state change: {}", name, error);
                NotificationOutcome::Failed {
                    component: name.to_string(),
                    reason: error.to_string(),
                }
            }
            Err(join_error) => {
                stats.record_notification_failure();
                warn!("component '{}' panicked handling state change", name);
                NotificationOutcome::Failed {
                    component: name.to_string(),
                    reason: format!("notification task failed: {}", join_error),
                }
            }
        }
    }

    /// Unregister all components and fail whatever is still queued
    fn teardown(&mut self) {
        self.components.clear();
        self.rx.close();
        while let Ok(command) = self.rx.try_recv() {
            match command {
                Command::Update { done, .. } => {
                    let _ = done.send(Err(UpdateError::CoordinatorClosed));
                }
                Command::Register { done, .. } => {
                    let _ = done.send(false);
                }
                Command::Unregister { done, .. } => {
                    let _ = done.send(false);
                }
                Command::Shutdown { done } => {
                    let _ = done.send(());
                }
            }
        }
        debug!("coordinator worker stopped");
    }
}
