//! Shared state primitives
//!
//! One state record is observed and updated by many independently developed
//! components; its keys are fixed at construction and values belong to a
//! closed set. Patches propose whole-value overwrites; there is
//! deliberately no field-level merge.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Value stored in the shared state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    /// Absent / unset
    Null,
    /// Boolean flag
    Bool(bool),
    /// Signed integer (pages, counts, sizes)
    Int(i64),
    /// Floating point
    Float(f64),
    /// Text
    Text(String),
    /// Homogeneous or mixed list (filtered row ids, selections)
    List(Vec<StateValue>),
}

impl StateValue {
    /// Integer view of the value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            StateValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean view of the value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text view of the value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StateValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// List view of the value
    pub fn as_list(&self) -> Option<&[StateValue]> {
        match self {
            StateValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether the value is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, StateValue::Null)
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        StateValue::Bool(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        StateValue::Int(value)
    }
}

impl From<i32> for StateValue {
    fn from(value: i32) -> Self {
        StateValue::Int(value as i64)
    }
}

impl From<u32> for StateValue {
    fn from(value: u32) -> Self {
        StateValue::Int(value as i64)
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        StateValue::Float(value)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        StateValue::Text(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        StateValue::Text(value)
    }
}

impl From<Vec<StateValue>> for StateValue {
    fn from(value: Vec<StateValue>) -> Self {
        StateValue::List(value)
    }
}

/// Committed snapshot of the shared state
///
/// Only the coordinator worker ever writes the live record; everything a
/// consumer sees is a snapshot like this one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedState {
    entries: HashMap<String, StateValue>,
}

impl SharedState {
    /// Value for a declared key
    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.entries.get(key)
    }

    /// Declared keys, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over key/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are declared
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, key: String, value: StateValue) {
        self.entries.insert(key, value);
    }
}

/// Where an update originated
///
/// History restores are replayed through the normal update path but must
/// not be re-recorded (that would clear the redo trail they rely on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateOrigin {
    /// A component or caller proposed a fresh edit
    #[default]
    External,
    /// An undo/redo replaying a previously committed value
    HistoryRestore,
}

/// A partial update proposed against the declared schema
///
/// Entry order is preserved; within one patch a later entry for the same
/// key overwrites the earlier one, mirroring the queue-level
/// last-applied-wins rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatePatch {
    entries: Vec<(String, StateValue)>,
    origin: UpdateOrigin,
}

impl StatePatch {
    /// Start an empty patch
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn for_restore() -> Self {
        Self {
            entries: Vec::new(),
            origin: UpdateOrigin::HistoryRestore,
        }
    }

    /// Add or overwrite one key in the patch
    pub fn set(mut self, key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
        self
    }

    /// Proposed entries in insertion order
    pub fn entries(&self) -> &[(String, StateValue)] {
        &self.entries
    }

    /// Proposed value for a key, if present
    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Where this patch came from
    pub fn origin(&self) -> UpdateOrigin {
        self.origin
    }

    /// Number of proposed entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the patch proposes nothing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
