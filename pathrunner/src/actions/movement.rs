//! Motion leaf with the prepare/recover handshake.

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use tracing::debug;

use crate::agent::{Agent, MoveKind, MoveOutcome};
use crate::recovery::MoveIntent;
use crate::state::PathState;
use crate::tree::leaf::MoveLeaf;
use crate::tree::node::require_field;

/// Executes one motion (translation or turn) of the agent.
pub struct MoveAction {
    motion: MoveKind,
}

impl MoveAction {
    pub const KIND: &'static str = "move";

    pub fn new(motion: MoveKind) -> Self {
        Self { motion }
    }

    pub(crate) fn revive(
        value: &Value,
        _registry: &crate::registry::NodeRegistry,
    ) -> Result<Box<dyn MoveLeaf>> {
        let motion: MoveKind = serde_json::from_value(require_field(value, "motion")?.clone())?;
        Ok(Box::new(Self::new(motion)))
    }
}

impl MoveLeaf for MoveAction {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn prepare(&self, agent: &dyn Agent) -> Result<MoveIntent> {
        Ok(MoveIntent::new(self.motion, agent.position(), agent.facing()))
    }

    fn recover(&mut self, agent: &mut dyn Agent, intent: &MoveIntent) -> Result<bool> {
        let observed = agent.observed_position()?;
        let observed_facing = agent.observed_facing()?;

        if observed == intent.destination && observed_facing == intent.expected_facing {
            debug!(kind = ?intent.kind, "interrupted motion already happened; syncing pose");
            agent.set_position(observed);
            agent.set_facing(observed_facing);
            return Ok(true);
        }
        if observed == intent.from && observed_facing == intent.facing {
            debug!(kind = ?intent.kind, "interrupted motion never happened; safe to retry");
            return Ok(false);
        }
        // A motion is not re-derivable as idempotent once the world stops
        // matching its recorded pre-state; refusing is the only safe call.
        Err(anyhow!(
            "unresolvable recovery marker: observed pose {observed:?}/{observed_facing:?} \
             matches neither {:?}/{:?} nor {:?}/{:?}",
            intent.from,
            intent.facing,
            intent.destination,
            intent.expected_facing,
        ))
    }

    fn perform(&mut self, agent: &mut dyn Agent, _state: &mut PathState) -> Result<MoveOutcome> {
        if self.motion.consumes_fuel() && agent.fuel_level()? == 0 {
            return Ok(MoveOutcome::OutOfFuel);
        }
        agent.execute_move(self.motion)
    }

    fn update_state(&mut self, agent: &mut dyn Agent, _state: &mut PathState) -> Result<()> {
        let (position, facing) = self.motion.destination(agent.position(), agent.facing());
        agent.set_position(position);
        agent.set_facing(facing);
        Ok(())
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({"kind": Self::KIND, "motion": serde_json::to_value(self.motion)?}))
    }
}
