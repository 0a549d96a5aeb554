//! Deterministic doubles for exercising trees without a physical agent.
//!
//! Available to downstream crates through the `test-support` feature so
//! embedding applications can test their own node types against the same
//! scaffolding.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use serde_json::{Value, json};

use crate::agent::{
    Agent, DigOutcome, DropStrategy, Facing, MoveKind, MoveOutcome, PlaceOutcome, Position,
    ToolDirection,
};
use crate::recovery::{MarkerChannel, MarkerStore, MoveIntent};
use crate::registry::NodeRegistry;
use crate::state::PathState;
use crate::tree::node::{counter_field, require_field};
use crate::tree::{Node, Status};

/// A leaf that plays back a fixed sequence of statuses.
///
/// Once the script is exhausted the last entry repeats, so
/// [`ScriptNode::always`] is just a one-entry script. Playback position
/// survives serialization, like any other node state.
pub struct ScriptNode {
    script: Vec<Status>,
    cursor: usize,
}

impl ScriptNode {
    pub const KIND: &'static str = "script";

    pub fn new(script: Vec<Status>) -> Self {
        assert!(!script.is_empty(), "script must not be empty");
        Self { script, cursor: 0 }
    }

    pub fn always(status: Status) -> Self {
        Self::new(vec![status])
    }

    pub fn revive(value: &Value, _registry: &NodeRegistry) -> Result<Box<dyn Node>> {
        let raw = require_field(value, "script")?
            .as_array()
            .ok_or_else(|| anyhow!("'script' must be an array"))?;
        let script = raw.iter().map(status_from_value).collect::<Result<Vec<_>>>()?;
        if script.is_empty() {
            return Err(anyhow!("script must not be empty"));
        }
        let cursor = usize::try_from(counter_field(value, "cursor")?)?;
        if cursor > script.len() {
            return Err(anyhow!("'cursor' {cursor} past the end of the script"));
        }
        Ok(Box::new(Self { script, cursor }))
    }
}

impl Node for ScriptNode {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, _agent: &mut dyn Agent, _state: &mut PathState) -> Result<Status> {
        let status = self.script[self.cursor.min(self.script.len() - 1)];
        if self.cursor < self.script.len() {
            self.cursor += 1;
        }
        Ok(status)
    }

    fn save(&self) -> Result<Value> {
        let script: Vec<&str> = self.script.iter().map(|s| status_str(*s)).collect();
        Ok(json!({
            "kind": Self::KIND,
            "script": script,
            "cursor": self.cursor,
        }))
    }
}

fn status_str(status: Status) -> &'static str {
    match status {
        Status::Success => "success",
        Status::Running => "running",
        Status::Failure => "failure",
    }
}

fn status_from_value(value: &Value) -> Result<Status> {
    match value.as_str() {
        Some("success") => Ok(Status::Success),
        Some("running") => Ok(Status::Running),
        Some("failure") => Ok(Status::Failure),
        _ => Err(anyhow!("invalid script status {value}")),
    }
}

/// Marker storage held in memory, for tests that never cross a process
/// boundary.
#[derive(Default)]
pub struct MemoryMarkerStore {
    intent: RefCell<Option<MoveIntent>>,
}

impl MarkerStore for MemoryMarkerStore {
    fn pending(&self) -> Result<Option<MoveIntent>> {
        Ok(self.intent.borrow().clone())
    }

    fn arm(&self, intent: &MoveIntent) -> Result<()> {
        *self.intent.borrow_mut() = Some(intent.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.intent.borrow_mut() = None;
        Ok(())
    }
}

/// A marker channel over a fresh [`MemoryMarkerStore`].
pub fn memory_channel() -> MarkerChannel {
    MarkerChannel::new(Rc::new(MemoryMarkerStore::default()))
}

/// Every built-in kind plus [`ScriptNode`], over an in-memory channel.
pub fn script_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::with_builtins(&memory_channel()).expect("builtin registry");
    registry
        .register_node(ScriptNode::KIND, ScriptNode::revive)
        .expect("register script node");
    registry
}

/// An agent over a tiny simulated world.
///
/// Believed pose and world pose are tracked separately so recovery tests
/// can make them disagree. `crash_on_move` makes the next motion take
/// effect in the world and then fail with an error, modeling a process
/// destroyed mid-primitive.
pub struct TestAgent {
    believed_position: Position,
    believed_facing: Facing,
    pub world_position: Position,
    pub world_facing: Facing,
    pub fuel: u64,
    pub blocked: bool,
    pub diggable: bool,
    pub slots: Vec<(String, u32)>,
    pub ground_items: u32,
    pub moves_executed: u32,
    pub crash_on_move: bool,
}

impl TestAgent {
    pub fn new() -> Self {
        Self {
            believed_position: Position::new(0, 0, 0),
            believed_facing: Facing::North,
            world_position: Position::new(0, 0, 0),
            world_facing: Facing::North,
            fuel: 1000,
            blocked: false,
            diggable: false,
            slots: Vec::new(),
            ground_items: 0,
            moves_executed: 0,
            crash_on_move: false,
        }
    }

    fn take_from_slot(slot: &mut (String, u32), wanted: u32) -> u32 {
        let taken = slot.1.min(wanted);
        slot.1 -= taken;
        taken
    }
}

impl Default for TestAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for TestAgent {
    fn position(&self) -> Position {
        self.believed_position
    }

    fn facing(&self) -> Facing {
        self.believed_facing
    }

    fn set_position(&mut self, position: Position) {
        self.believed_position = position;
    }

    fn set_facing(&mut self, facing: Facing) {
        self.believed_facing = facing;
    }

    fn observed_position(&mut self) -> Result<Position> {
        Ok(self.world_position)
    }

    fn observed_facing(&mut self) -> Result<Facing> {
        Ok(self.world_facing)
    }

    fn fuel_level(&self) -> Result<u64> {
        Ok(self.fuel)
    }

    fn execute_move(&mut self, kind: MoveKind) -> Result<MoveOutcome> {
        if kind.consumes_fuel() {
            if self.fuel == 0 {
                return Ok(MoveOutcome::OutOfFuel);
            }
            if self.blocked {
                return Ok(MoveOutcome::Blocked);
            }
        }
        let (position, facing) = kind.destination(self.world_position, self.world_facing);
        self.world_position = position;
        self.world_facing = facing;
        if kind.consumes_fuel() {
            self.fuel -= 1;
        }
        self.moves_executed += 1;
        if self.crash_on_move {
            // The world changed but the caller never hears about it.
            self.crash_on_move = false;
            return Err(anyhow!("agent connection lost mid-move"));
        }
        Ok(MoveOutcome::Moved)
    }

    fn dig(&mut self, _direction: ToolDirection) -> Result<DigOutcome> {
        if self.diggable {
            self.diggable = false;
            Ok(DigOutcome::Dug)
        } else {
            Ok(DigOutcome::Nothing)
        }
    }

    fn place(&mut self, _direction: ToolDirection, item: Option<&str>) -> Result<PlaceOutcome> {
        let slot = match item {
            Some(name) => self.slots.iter_mut().find(|(n, count)| n == name && *count > 0),
            None => self.slots.iter_mut().find(|(_, count)| *count > 0),
        };
        match slot {
            Some(slot) => {
                slot.1 -= 1;
                Ok(PlaceOutcome::Placed)
            }
            None => Ok(PlaceOutcome::OutOfItems),
        }
    }

    fn drop_items(&mut self, _direction: ToolDirection, strategy: &DropStrategy) -> Result<u32> {
        let mut moved = 0;
        match strategy {
            DropStrategy::Item { slot, count } => {
                if let Some(slot) = self.slots.get_mut(*slot as usize) {
                    moved += Self::take_from_slot(slot, *count);
                }
            }
            DropStrategy::ItemType { name, count } => {
                let mut wanted = *count;
                for slot in self.slots.iter_mut().filter(|(n, _)| n == name) {
                    let taken = Self::take_from_slot(slot, wanted);
                    wanted -= taken;
                    moved += taken;
                }
            }
            DropStrategy::ExceptItemType { name } => {
                for slot in self.slots.iter_mut().filter(|(n, _)| n != name) {
                    moved += std::mem::take(&mut slot.1);
                }
            }
        }
        Ok(moved)
    }

    fn suck(&mut self, _direction: ToolDirection, limit: Option<u32>) -> Result<u32> {
        let taken = match limit {
            Some(limit) => self.ground_items.min(limit),
            None => self.ground_items,
        };
        self.ground_items -= taken;
        if taken > 0 {
            self.slots.push(("scooped".to_string(), taken));
        }
        Ok(taken)
    }

    fn item_count(&self, name: &str) -> Result<u32> {
        Ok(self
            .slots
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, count)| count)
            .sum())
    }

    fn inventory_total(&self) -> Result<u32> {
        Ok(self.slots.iter().map(|(_, count)| count).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_node_repeats_its_last_entry() {
        let mut node = ScriptNode::new(vec![Status::Running, Status::Failure]);
        let mut agent = TestAgent::new();
        let mut state = PathState::new();
        assert_eq!(node.perform(&mut agent, &mut state).expect("perform"), Status::Running);
        assert_eq!(node.perform(&mut agent, &mut state).expect("perform"), Status::Failure);
        assert_eq!(node.perform(&mut agent, &mut state).expect("perform"), Status::Failure);
    }

    #[test]
    fn script_node_round_trips_playback_position() {
        let registry = script_registry();
        let mut node = ScriptNode::new(vec![Status::Running, Status::Success]);
        let mut agent = TestAgent::new();
        let mut state = PathState::new();
        node.perform(&mut agent, &mut state).expect("perform");

        let saved = node.save().expect("save");
        let mut revived = registry.revive(&saved).expect("revive");
        assert_eq!(
            revived.perform(&mut agent, &mut state).expect("perform"),
            Status::Success
        );
    }

    #[test]
    fn crash_on_move_changes_the_world_but_reports_an_error() {
        let mut agent = TestAgent::new();
        agent.crash_on_move = true;
        let err = agent.execute_move(MoveKind::Forward).expect_err("crash");
        assert!(err.to_string().contains("lost"));
        assert_eq!(agent.moves_executed, 1);
        assert_ne!(agent.world_position, agent.position());

        // The flag is one-shot.
        assert_eq!(
            agent.execute_move(MoveKind::Back).expect("move"),
            MoveOutcome::Moved
        );
    }
}
