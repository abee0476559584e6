//! Gridsync - caching and shared-state coordination core for grid plugin hosts
//!
//! The two subsystems independently developed table plugins (filtering,
//! pagination, editing) build on to stay consistent with each other and
//! with a bounded in-memory cache.
//!
//! # Features
//!
//! - **Bounded cache**: capacity-limited store with pluggable eviction
//!   (LRU, LFU, FIFO), per-entry TTL, lazy expiry, and a background sweep
//! - **Serialized shared state**: one schema-validated record behind a
//!   single-writer update queue with linearizable ordering, and
//!   notification fan-out with per-component failure isolation
//! - **Bounded undo history**: fixed-capacity circular trail per tracked
//!   key, with redo invalidation on fresh edits
//! - **Explicit composition root**: a [`GridSync`] host constructed by the
//!   embedder and passed by reference, with no process-wide singleton
//!
//! Rendering, theming, drag geometry, and the rest of the plugin surface
//! are external collaborators that call into this core.

pub mod cache;
pub mod coordinator;
pub mod gridsync;
pub mod history;
pub mod prelude;
pub mod timing;

pub use gridsync::{GridSync, GridSyncBuilder};
pub use prelude::*;
