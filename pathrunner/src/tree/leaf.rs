//! Domain-leaf traits wrapped by the result-interpreter adapters.
//!
//! Each family keeps its own outcome enum (never the tree's
//! [`crate::tree::Status`]) and its own registry factory map, so the set
//! of concrete leaves stays open to the embedding application while the
//! adapters stay typed.

use anyhow::Result;
use serde_json::Value;

use crate::agent::{Agent, DigOutcome, DropOutcome, MoveOutcome, PlaceOutcome, SuckOutcome};
use crate::recovery::MoveIntent;
use crate::state::PathState;

/// A motion leaf. Carries the prepare/recover hook pair that the move
/// adapter drives for crash recovery.
pub trait MoveLeaf {
    fn kind(&self) -> &'static str;

    /// Record the intent for the motion about to execute, derived from
    /// the agent's believed pose.
    fn prepare(&self, agent: &dyn Agent) -> Result<MoveIntent>;

    /// Decide from observable world state whether the interrupted motion
    /// recorded in `intent` already happened. On `true` the believed pose
    /// must have been synced to the observed pose. An observation
    /// matching neither the recorded pre-state nor the expected
    /// post-state is a fatal error — the engine never guesses.
    fn recover(&mut self, agent: &mut dyn Agent, intent: &MoveIntent) -> Result<bool>;

    /// Execute exactly one physical motion.
    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<MoveOutcome>;

    /// Commit the believed pose. The move adapter invokes this in the
    /// same tick as the physical motion, not in the root-level pass.
    fn update_state(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<()>;

    fn save(&self) -> Result<Value>;
}

/// A digging leaf.
pub trait DigLeaf {
    fn kind(&self) -> &'static str;
    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<DigOutcome>;
    fn update_state(&mut self, _agent: &mut dyn Agent, _state: &mut PathState) -> Result<()> {
        Ok(())
    }
    fn save(&self) -> Result<Value>;
}

/// A block-placing leaf.
pub trait PlaceLeaf {
    fn kind(&self) -> &'static str;
    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<PlaceOutcome>;
    fn update_state(&mut self, _agent: &mut dyn Agent, _state: &mut PathState) -> Result<()> {
        Ok(())
    }
    fn save(&self) -> Result<Value>;
}

/// An inventory-drop leaf.
pub trait DropLeaf {
    fn kind(&self) -> &'static str;
    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<DropOutcome>;
    fn update_state(&mut self, _agent: &mut dyn Agent, _state: &mut PathState) -> Result<()> {
        Ok(())
    }
    fn save(&self) -> Result<Value>;
}

/// An item-intake leaf.
pub trait SuckLeaf {
    fn kind(&self) -> &'static str;
    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<SuckOutcome>;
    fn update_state(&mut self, _agent: &mut dyn Agent, _state: &mut PathState) -> Result<()> {
        Ok(())
    }
    fn save(&self) -> Result<Value>;
}
