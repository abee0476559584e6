//! Coordinator error types
//!
//! A rejected patch is reported to its caller and never blocks the queue;
//! the coordinator itself does not crash or halt on one bad update.

/// Update rejection and lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// Patch referenced a key outside the declared schema
    SchemaViolation {
        /// The undeclared key
        key: String,
    },
    /// Declared key whose proposed value failed its validator
    ValidationFailed {
        /// The offending key
        key: String,
    },
    /// Coordinator has been shut down; no further updates are accepted
    CoordinatorClosed,
}

impl std::fmt::Display for UpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::SchemaViolation { key } => {
                write!(f, "Key '{}' is not declared in the state schema", key)
            }
            UpdateError::ValidationFailed { key } => {
                write!(f, "Value for key '{}' failed validation", key)
            }
            UpdateError::CoordinatorClosed => write!(f, "Coordinator has been shut down"),
        }
    }
}

impl std::error::Error for UpdateError {}

impl UpdateError {
    /// Create a schema violation error
    #[inline(always)]
    pub fn schema_violation(key: impl Into<String>) -> Self {
        Self::SchemaViolation { key: key.into() }
    }

    /// Create a validation failure error
    #[inline(always)]
    pub fn validation_failed(key: impl Into<String>) -> Self {
        Self::ValidationFailed { key: key.into() }
    }

    /// Whether this is a per-patch rejection (the queue keeps draining)
    /// rather than a lifecycle failure
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            UpdateError::SchemaViolation { .. } | UpdateError::ValidationFailed { .. }
        )
    }
}

/// Failure raised by a component's notification entrypoint
///
/// Captured per component; never propagated to the update's caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentError(String);

impl ComponentError {
    /// Wrap a failure description
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl std::fmt::Display for ComponentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ComponentError {}

impl From<&str> for ComponentError {
    fn from(reason: &str) -> Self {
        Self::new(reason)
    }
}

impl From<String> for ComponentError {
    fn from(reason: String) -> Self {
        Self::new(reason)
    }
}
