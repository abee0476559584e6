//! Shared-state coordination engine
//!
//! Lets multiple independently developed components mutate and observe one
//! shared state record without corrupting each other's view: every update
//! is validated against a declared schema, serialized through a
//! single-writer queue, and fanned out to registered components after it
//! commits.

pub mod component;
pub mod core;
pub mod error;
pub mod schema;
pub mod state;

mod worker;

pub use self::component::{
    AppliedChange, CooperativeComponent, NotificationOutcome, StateChange,
};
pub use self::core::{CoordinatorStatsSnapshot, StateCoordinator};
pub use self::error::{ComponentError, UpdateError};
pub use self::schema::{StateSchema, StateValidator};
pub use self::state::{SharedState, StatePatch, StateValue, UpdateOrigin};
