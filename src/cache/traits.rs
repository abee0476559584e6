//! Key and value bounds for the bounded cache
//!
//! Wrong key *types* are unrepresentable against the typed store; runtime
//! key validation (empty or oversized plugin keys) lives at the host surface.

use std::fmt::Debug;
use std::hash::Hash;

/// Bounds required of cache keys
///
/// Blanket-implemented for any qualifying type; `Ord` keeps victim
/// selection deterministic across runs.
pub trait CacheKey: Clone + Eq + Hash + Ord + Debug + Send + Sync + 'static {}

impl<T> CacheKey for T where T: Clone + Eq + Hash + Ord + Debug + Send + Sync + 'static {}

/// Bounds required of cache values
///
/// `Clone` backs the copy-on-write path used by in-place updates.
pub trait CacheValue: Clone + Debug + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Debug + Send + Sync + 'static {}
