//! Block-placing leaf.

use anyhow::Result;
use serde_json::{Value, json};

use crate::agent::{Agent, PlaceOutcome, ToolDirection};
use crate::state::PathState;
use crate::tree::leaf::PlaceLeaf;
use crate::tree::node::require_field;

/// Places a block in the given tool direction, optionally a named item.
pub struct PlaceAction {
    direction: ToolDirection,
    item: Option<String>,
}

impl PlaceAction {
    pub const KIND: &'static str = "place";

    pub fn new(direction: ToolDirection, item: Option<String>) -> Self {
        Self { direction, item }
    }

    pub(crate) fn revive(
        value: &Value,
        _registry: &crate::registry::NodeRegistry,
    ) -> Result<Box<dyn PlaceLeaf>> {
        let direction: ToolDirection =
            serde_json::from_value(require_field(value, "direction")?.clone())?;
        let item = match value.get("item") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(serde_json::from_value(raw.clone())?),
        };
        Ok(Box::new(Self::new(direction, item)))
    }
}

impl PlaceLeaf for PlaceAction {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, _state: &mut PathState) -> Result<PlaceOutcome> {
        agent.place(self.direction, self.item.as_deref())
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({
            "kind": Self::KIND,
            "direction": serde_json::to_value(self.direction)?,
            "item": self.item,
        }))
    }
}
