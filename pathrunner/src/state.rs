//! Shared blackboard state owned by the path driver.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Mutable blackboard passed by reference into every node call.
///
/// Keys map to plain JSON values (no opaque handles), so the whole state
/// remains serializable after every tick. A `BTreeMap` keeps serialized
/// output stable across runs. Lifetime is exactly one
/// [`crate::path::ActionPath`]; nothing here is ambient or global.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathState {
    entries: BTreeMap<String, Value>,
}

impl PathState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Read a named counter. Absent or non-integer entries read as zero,
    /// the counter's identity value.
    pub fn counter(&self, key: &str) -> i64 {
        self.entries.get(key).and_then(Value::as_i64).unwrap_or(0)
    }

    /// Increment a named counter and return the new value.
    pub fn increment(&mut self, key: &str) -> i64 {
        let next = self.counter(key) + 1;
        self.entries.insert(key.to_string(), Value::from(next));
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counters_default_to_zero_and_increment() {
        let mut state = PathState::new();
        assert_eq!(state.counter("steps"), 0);
        assert_eq!(state.increment("steps"), 1);
        assert_eq!(state.increment("steps"), 2);
        assert_eq!(state.counter("steps"), 2);
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut state = PathState::new();
        state.set("steps", json!(3));
        state.set("label", json!("north-shaft"));

        let value = serde_json::to_value(&state).expect("serialize");
        let loaded: PathState = serde_json::from_value(value).expect("deserialize");
        assert_eq!(loaded, state);
    }
}
