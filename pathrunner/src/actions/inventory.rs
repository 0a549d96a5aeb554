//! Inventory-transfer leaves with verified accounting.
//!
//! Both leaves treat the agent's transfer primitives as opaque and judge
//! success only from the verified moved/taken counts: a transfer that
//! falls short of the requested quantity is never reported as success.

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use tracing::trace;

use crate::agent::{Agent, DropOutcome, DropStrategy, SuckOutcome, ToolDirection};
use crate::state::PathState;
use crate::tree::leaf::{DropLeaf, SuckLeaf};
use crate::tree::node::require_field;

/// Drops items per a [`DropStrategy`].
pub struct DropAction {
    direction: ToolDirection,
    strategy: DropStrategy,
}

impl DropAction {
    pub const KIND: &'static str = "drop";

    pub fn new(direction: ToolDirection, strategy: DropStrategy) -> Result<Self> {
        match &strategy {
            DropStrategy::Item { count, .. } | DropStrategy::ItemType { count, .. }
                if *count == 0 =>
            {
                Err(anyhow!("drop count must be > 0"))
            }
            _ => Ok(Self {
                direction,
                strategy,
            }),
        }
    }

    pub(crate) fn revive(
        value: &Value,
        _registry: &crate::registry::NodeRegistry,
    ) -> Result<Box<dyn DropLeaf>> {
        let direction: ToolDirection =
            serde_json::from_value(require_field(value, "direction")?.clone())?;
        let strategy: DropStrategy =
            serde_json::from_value(require_field(value, "drop")?.clone())?;
        Ok(Box::new(Self::new(direction, strategy)?))
    }

    /// Quantity this strategy is required to transfer in full.
    fn requested(&self, agent: &dyn Agent) -> Result<u32> {
        Ok(match &self.strategy {
            DropStrategy::Item { count, .. } => *count,
            DropStrategy::ItemType { count, .. } => *count,
            DropStrategy::ExceptItemType { name } => agent
                .inventory_total()?
                .saturating_sub(agent.item_count(name)?),
        })
    }
}

impl DropLeaf for DropAction {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, _state: &mut PathState) -> Result<DropOutcome> {
        let requested = self.requested(agent)?;
        if requested == 0 {
            // Only reachable for ExceptItemType: nothing to get rid of is
            // vacuously complete.
            return Ok(DropOutcome::Dropped);
        }
        let moved = agent.drop_items(self.direction, &self.strategy)?;
        trace!(requested, moved, "drop accounted");
        Ok(if moved == requested {
            DropOutcome::Dropped
        } else if moved == 0 {
            DropOutcome::Empty
        } else {
            DropOutcome::Incomplete
        })
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({
            "kind": Self::KIND,
            "direction": serde_json::to_value(self.direction)?,
            "drop": serde_json::to_value(&self.strategy)?,
        }))
    }
}

/// Takes items in, optionally up to an exact requested count.
pub struct SuckAction {
    direction: ToolDirection,
    count: Option<u32>,
}

impl SuckAction {
    pub const KIND: &'static str = "suck";

    pub fn new(direction: ToolDirection, count: Option<u32>) -> Result<Self> {
        if count == Some(0) {
            return Err(anyhow!("suck count must be > 0 (or unbounded)"));
        }
        Ok(Self { direction, count })
    }

    pub(crate) fn revive(
        value: &Value,
        _registry: &crate::registry::NodeRegistry,
    ) -> Result<Box<dyn SuckLeaf>> {
        let direction: ToolDirection =
            serde_json::from_value(require_field(value, "direction")?.clone())?;
        let count = match value.get("count") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(serde_json::from_value(raw.clone())?),
        };
        Ok(Box::new(Self::new(direction, count)?))
    }
}

impl SuckLeaf for SuckAction {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, _state: &mut PathState) -> Result<SuckOutcome> {
        let taken = agent.suck(self.direction, self.count)?;
        trace!(requested = ?self.count, taken, "suck accounted");
        Ok(match self.count {
            Some(count) if taken == count => SuckOutcome::Sucked,
            Some(_) if taken == 0 => SuckOutcome::Nothing,
            Some(_) => SuckOutcome::Short,
            None if taken > 0 => SuckOutcome::Sucked,
            None => SuckOutcome::Nothing,
        })
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({
            "kind": Self::KIND,
            "direction": serde_json::to_value(self.direction)?,
            "count": self.count,
        }))
    }
}
