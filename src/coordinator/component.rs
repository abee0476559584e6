//! Cooperative component seam
//!
//! Components are developed and loaded independently; each exposes one
//! notification entrypoint and must never observe a half-applied state.
//! Notification outcomes are collected per component into an aggregate
//! rather than suppressed: a failing component cannot hide behind a
//! swallowed exception, and cannot block its siblings.

use async_trait::async_trait;

use super::error::ComponentError;
use super::state::{SharedState, StatePatch};

/// Committed change delivered to each registered component
#[derive(Debug, Clone)]
pub struct StateChange {
    /// The patch as merged
    pub patch: StatePatch,
    /// Committed state after the merge
    pub state: SharedState,
}

/// External collaborator observing the shared state
///
/// Registered by name; re-registering a name explicitly replaces the
/// prior registration. The notification may perform asynchronous work;
/// the coordinator waits for it to settle before dequeuing the next
/// patch, so ordering is preserved across suspension points. Components
/// must not depend on being notified before or after a sibling.
#[async_trait]
pub trait CooperativeComponent: Send + Sync {
    /// Called after each committed patch
    async fn on_shared_state_change(&self, change: &StateChange) -> Result<(), ComponentError>;
}

/// Outcome of one component's notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// The component's entrypoint returned successfully
    Delivered {
        /// Registered component name
        component: String,
    },
    /// The entrypoint returned an error or panicked
    Failed {
        /// Registered component name
        component: String,
        /// Captured failure description
        reason: String,
    },
}

impl NotificationOutcome {
    /// Registered name of the notified component
    pub fn component(&self) -> &str {
        match self {
            NotificationOutcome::Delivered { component }
            | NotificationOutcome::Failed { component, .. } => component,
        }
    }

    /// Whether the notification failed
    pub fn is_failure(&self) -> bool {
        matches!(self, NotificationOutcome::Failed { .. })
    }
}

/// Result handed back to the caller of a successful update
#[derive(Debug, Clone)]
pub struct AppliedChange {
    /// The patch as merged
    pub patch: StatePatch,
    /// Per-component delivery outcomes, one per registered component
    pub notifications: Vec<NotificationOutcome>,
}

impl AppliedChange {
    /// Outcomes for components whose notification failed
    pub fn failures(&self) -> impl Iterator<Item = &NotificationOutcome> {
        self.notifications.iter().filter(|o| o.is_failure())
    }

    /// Whether every registered component was notified successfully
    pub fn fully_delivered(&self) -> bool {
        self.notifications.iter().all(|o| !o.is_failure())
    }
}
