//! Digging leaf.

use anyhow::Result;
use serde_json::{Value, json};

use crate::agent::{Agent, DigOutcome, ToolDirection};
use crate::state::PathState;
use crate::tree::leaf::DigLeaf;
use crate::tree::node::require_field;

/// Breaks the block in the given tool direction.
pub struct DigAction {
    direction: ToolDirection,
}

impl DigAction {
    pub const KIND: &'static str = "dig";

    pub fn new(direction: ToolDirection) -> Self {
        Self { direction }
    }

    pub(crate) fn revive(
        value: &Value,
        _registry: &crate::registry::NodeRegistry,
    ) -> Result<Box<dyn DigLeaf>> {
        let direction: ToolDirection =
            serde_json::from_value(require_field(value, "direction")?.clone())?;
        Ok(Box::new(Self::new(direction)))
    }
}

impl DigLeaf for DigAction {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, _state: &mut PathState) -> Result<DigOutcome> {
        agent.dig(self.direction)
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({"kind": Self::KIND, "direction": serde_json::to_value(self.direction)?}))
    }
}
