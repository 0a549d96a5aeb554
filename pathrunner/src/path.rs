//! The action path: root node plus blackboard, with the tick protocol.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tracing::debug;

use crate::agent::Agent;
use crate::registry::NodeRegistry;
use crate::state::PathState;
use crate::tree::node::require_field;
use crate::tree::{Node, Status};

/// A recoverable behavior-tree program: the root node and its blackboard.
///
/// The registry is not part of an `ActionPath`; it is supplied fresh on
/// every [`load`](ActionPath::load) and must cover every kind present in
/// the serialized data. The tree is reconstructed fresh on every load —
/// no live node survives a crash other than through re-serialization.
#[derive(Debug)]
pub struct ActionPath {
    head: Box<dyn Node>,
    state: PathState,
}

impl ActionPath {
    pub fn new(head: Box<dyn Node>) -> Self {
        Self {
            head,
            state: PathState::new(),
        }
    }

    pub fn with_state(head: Box<dyn Node>, state: PathState) -> Self {
        Self { head, state }
    }

    /// Advance the path by one tick: perform the root, and on `Success`
    /// run the root-level commit pass. No implicit retries, no implicit
    /// persistence — persisting after every tick is the caller's job.
    pub fn tick(&mut self, agent: &mut dyn Agent) -> Result<Status> {
        let status = self.head.perform(agent, &mut self.state)?;
        debug!(?status, "tick complete");
        if status == Status::Success {
            self.head.update_state(agent, &mut self.state)?;
        }
        Ok(status)
    }

    pub fn state(&self) -> &PathState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut PathState {
        &mut self.state
    }

    /// Serialize the whole path: head tree (recursively, with every
    /// cursor and counter) plus blackboard.
    pub fn save(&self) -> Result<Value> {
        Ok(json!({
            "head": self.head.save().context("save head")?,
            "state": serde_json::to_value(&self.state).context("save state")?,
        }))
    }

    /// Reconstruct a path from its serialized form.
    pub fn load(value: &Value, registry: &NodeRegistry) -> Result<Self> {
        let head = registry
            .revive(require_field(value, "head")?)
            .context("load head")?;
        let state: PathState = serde_json::from_value(require_field(value, "state")?.clone())
            .context("load state")?;
        Ok(Self { head, state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::counter::CounterAction;
    use crate::actions::movement::MoveAction;
    use crate::agent::MoveKind;
    use crate::registry::NodeRegistry;
    use crate::tree::adapter::MoveResultInterpreter;
    use crate::tree::composite::Sequence;
    use crate::tree::decorator::Repeater;
    use crate::test_support::{ScriptNode, TestAgent, memory_channel, script_registry};

    fn sample_path(channel: &crate::recovery::MarkerChannel) -> ActionPath {
        let head = Sequence::new(vec![
            Box::new(MoveResultInterpreter::new(
                Box::new(MoveAction::new(MoveKind::Forward)),
                channel.clone(),
            )),
            Box::new(
                Repeater::new(Box::new(CounterAction::new("steps")), Some(2)).expect("repeater"),
            ),
        ])
        .expect("sequence");
        ActionPath::new(Box::new(head))
    }

    /// Round-trip: a mid-flight path (cursor advanced, counter non-zero,
    /// blackboard populated) saves and reloads structurally identical.
    #[test]
    fn mid_flight_path_round_trips() {
        let channel = memory_channel();
        let registry = NodeRegistry::with_builtins(&channel).expect("builtins");
        let mut path = sample_path(&channel);
        let mut agent = TestAgent::new();

        // Two ticks: past the move, one repeat counted.
        assert_eq!(path.tick(&mut agent).expect("tick"), Status::Running);
        assert_eq!(path.tick(&mut agent).expect("tick"), Status::Running);

        let saved = path.save().expect("save");
        let loaded = ActionPath::load(&saved, &registry).expect("load");
        assert_eq!(loaded.save().expect("resave"), saved);
        assert_eq!(loaded.state().counter("steps"), 1);
    }

    #[test]
    fn terminal_success_resets_every_cursor_and_counter() {
        let channel = memory_channel();
        let mut path = sample_path(&channel);
        let head_before = path.save().expect("save")["head"].clone();

        let mut agent = TestAgent::new();
        // Run to the terminal Success; every cursor and counter resets,
        // so the head serializes exactly as it did when fresh (the
        // blackboard keeps its accumulated counters).
        assert_eq!(path.tick(&mut agent).expect("tick"), Status::Running);
        assert_eq!(path.tick(&mut agent).expect("tick"), Status::Running);
        assert_eq!(path.tick(&mut agent).expect("tick"), Status::Success);
        assert_eq!(path.save().expect("save")["head"], head_before);
        assert_eq!(path.state().counter("steps"), 2);
    }

    #[test]
    fn load_fails_on_unregistered_kind() {
        let registry = script_registry();
        let saved = serde_json::json!({
            "head": {"kind": "teleporter"},
            "state": {},
        });
        let err = ActionPath::load(&saved, &registry).expect_err("unknown kind");
        let unknown = err
            .downcast_ref::<crate::registry::UnknownKindError>()
            .expect("downcast");
        assert_eq!(unknown.kind, "teleporter");
    }

    #[test]
    fn custom_kinds_load_through_an_extended_registry() {
        let mut registry = script_registry();
        // Registering the same custom kind twice must collide.
        assert!(
            registry
                .register_node("script", |value, registry| ScriptNode::revive(value, registry))
                .is_err()
        );

        let saved = serde_json::json!({
            "head": {"kind": "script", "script": ["running", "success"], "cursor": 1},
            "state": {"steps": 4},
        });
        let path = ActionPath::load(&saved, &registry).expect("load");
        assert_eq!(path.state().counter("steps"), 4);
        assert_eq!(path.save().expect("save")["head"]["cursor"], 1);
    }
}
