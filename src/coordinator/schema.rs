//! Declared state schema and per-key validators
//!
//! The key set is fixed when the coordinator is built; an update naming an
//! undeclared key is rejected outright. Validators are a closed set with a
//! caller-supplied escape hatch.

use std::fmt;
use std::sync::Arc;

use super::error::UpdateError;
use super::state::{SharedState, StateValue};

/// Per-key validation rule
#[derive(Clone, Default)]
pub enum StateValidator {
    /// Accept any value
    #[default]
    Any,
    /// Integer strictly greater than zero (page numbers, page sizes)
    PositiveInt,
    /// Integer greater than or equal to zero (totals, offsets)
    NonNegativeInt,
    /// Boolean flag
    Bool,
    /// Text value
    Text,
    /// List value
    List,
    /// Caller-supplied predicate
    Custom(Arc<dyn Fn(&StateValue) -> bool + Send + Sync>),
}

impl fmt::Debug for StateValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValidator::Any => f.write_str("Any"),
            StateValidator::PositiveInt => f.write_str("PositiveInt"),
            StateValidator::NonNegativeInt => f.write_str("NonNegativeInt"),
            StateValidator::Bool => f.write_str("Bool"),
            StateValidator::Text => f.write_str("Text"),
            StateValidator::List => f.write_str("List"),
            StateValidator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl StateValidator {
    /// Whether the rule accepts a proposed value
    pub fn accepts(&self, value: &StateValue) -> bool {
        match self {
            StateValidator::Any => true,
            StateValidator::PositiveInt => matches!(value, StateValue::Int(n) if *n > 0),
            StateValidator::NonNegativeInt => matches!(value, StateValue::Int(n) if *n >= 0),
            StateValidator::Bool => matches!(value, StateValue::Bool(_)),
            StateValidator::Text => matches!(value, StateValue::Text(_)),
            StateValidator::List => matches!(value, StateValue::List(_)),
            StateValidator::Custom(accepts) => accepts(value),
        }
    }
}

#[derive(Debug, Clone)]
struct SchemaEntry {
    key: String,
    validator: StateValidator,
    initial: StateValue,
}

/// Fixed key set declared at coordinator construction
#[derive(Debug, Clone, Default)]
pub struct StateSchema {
    entries: Vec<SchemaEntry>,
}

impl StateSchema {
    /// Start an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare one key with its validation rule and initial value
    ///
    /// Re-declaring a key replaces its earlier declaration.
    pub fn declare(
        mut self,
        key: impl Into<String>,
        validator: StateValidator,
        initial: impl Into<StateValue>,
    ) -> Self {
        let key = key.into();
        let entry = SchemaEntry {
            key: key.clone(),
            validator,
            initial: initial.into(),
        };
        if let Some(slot) = self.entries.iter_mut().find(|e| e.key == key) {
            *slot = entry;
        } else {
            self.entries.push(entry);
        }
        self
    }

    /// Whether a key is declared
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    /// Number of declared keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are declared
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn validator(&self, key: &str) -> Option<&StateValidator> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| &e.validator)
    }

    /// Build the initial committed state, validating every initial value
    pub(crate) fn initial_state(&self) -> Result<SharedState, UpdateError> {
        let mut state = SharedState::default();
        for entry in &self.entries {
            if !entry.initial.is_null() && !entry.validator.accepts(&entry.initial) {
                return Err(UpdateError::validation_failed(entry.key.as_str()));
            }
            state.insert(entry.key.clone(), entry.initial.clone());
        }
        Ok(state)
    }
}
