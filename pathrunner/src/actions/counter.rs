//! Blackboard counter leaf.

use anyhow::Result;
use serde_json::{Value, json};
use tracing::trace;

use crate::agent::Agent;
use crate::state::PathState;
use crate::tree::node::require_field;
use crate::tree::{Node, Status};

/// Increments a named [`PathState`] counter and succeeds.
///
/// The blackboard's reference user: useful for progress bookkeeping
/// (steps walked, layers mined) that higher nodes or the embedding
/// application read back out of the persisted state.
pub struct CounterAction {
    key: String,
}

impl CounterAction {
    pub const KIND: &'static str = "counter";

    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub(crate) fn revive(
        value: &Value,
        _registry: &crate::registry::NodeRegistry,
    ) -> Result<Box<dyn Node>> {
        let key: String = serde_json::from_value(require_field(value, "key")?.clone())?;
        Ok(Box::new(Self::new(key)))
    }
}

impl Node for CounterAction {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, _agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        let value = state.increment(&self.key);
        trace!(key = %self.key, value, "counter incremented");
        Ok(Status::Success)
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({"kind": Self::KIND, "key": self.key}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestAgent;

    #[test]
    fn counter_action_increments_blackboard() {
        let mut agent = TestAgent::new();
        let mut state = PathState::new();
        let mut action = CounterAction::new("steps");

        for expected in 1..=3 {
            let status = action.perform(&mut agent, &mut state).expect("perform");
            assert_eq!(status, Status::Success);
            assert_eq!(state.counter("steps"), expected);
        }
    }
}
