//! Node-type registry for deserialization dispatch.
//!
//! The registry is the only place where dispatch is string-keyed: a
//! mapping from a node's stable `"kind"` to a factory that revives it
//! from its serialized form. It is supplied fresh by the embedding
//! application on every load, is never part of the serialized data, and
//! must cover every kind present in that data or loading fails fatally.
//!
//! Each domain-leaf family (move/dig/place/drop/suck) keeps its own
//! factory map, so adapter children revive as their own typed trait
//! objects while the set of concrete leaves stays open.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::trace;

use crate::io::config::EngineConfig;
use crate::recovery::MarkerChannel;
use crate::tree::adapter::{
    DigResultInterpreter, DropResultInterpreter, MoveResultInterpreter, PlaceResultInterpreter,
    SuckResultInterpreter,
};
use crate::tree::composite::{RandomSelector, Selector, Sequence};
use crate::tree::decorator::{
    DieOnFailure, Inverter, RepeatUntilFailure, Repeater, RetryOnFailure, Succeeder,
};
use crate::tree::leaf::{DigLeaf, DropLeaf, MoveLeaf, PlaceLeaf, SuckLeaf};
use crate::tree::node::require_kind;
use crate::tree::Node;

/// Deserialization encountered a kind absent from the registry.
///
/// Fatal by design: the engine must not guess or substitute a node type.
/// Downcastable so a driver can report the offending kind precisely.
#[derive(Debug)]
pub struct UnknownKindError {
    pub kind: String,
}

impl fmt::Display for UnknownKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown node kind '{}'", self.kind)
    }
}

impl std::error::Error for UnknownKindError {}

type NodeFactory = Box<dyn Fn(&Value, &NodeRegistry) -> Result<Box<dyn Node>>>;
type MoveLeafFactory = Box<dyn Fn(&Value, &NodeRegistry) -> Result<Box<dyn MoveLeaf>>>;
type DigLeafFactory = Box<dyn Fn(&Value, &NodeRegistry) -> Result<Box<dyn DigLeaf>>>;
type PlaceLeafFactory = Box<dyn Fn(&Value, &NodeRegistry) -> Result<Box<dyn PlaceLeaf>>>;
type DropLeafFactory = Box<dyn Fn(&Value, &NodeRegistry) -> Result<Box<dyn DropLeaf>>>;
type SuckLeafFactory = Box<dyn Fn(&Value, &NodeRegistry) -> Result<Box<dyn SuckLeaf>>>;

/// Kind-to-factory maps for reconstructing a polymorphic tree.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, NodeFactory>,
    move_leaves: BTreeMap<String, MoveLeafFactory>,
    dig_leaves: BTreeMap<String, DigLeafFactory>,
    place_leaves: BTreeMap<String, PlaceLeafFactory>,
    drop_leaves: BTreeMap<String, DropLeafFactory>,
    suck_leaves: BTreeMap<String, SuckLeafFactory>,
}

fn insert_checked<F>(map: &mut BTreeMap<String, F>, family: &str, kind: &str, factory: F) -> Result<()> {
    if map.contains_key(kind) {
        return Err(anyhow!("duplicate {family} kind '{kind}'"));
    }
    map.insert(kind.to_string(), factory);
    Ok(())
}

impl NodeRegistry {
    /// An empty registry. Embedding applications normally start from
    /// [`NodeRegistry::with_builtins`] instead.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry covering every built-in composite, decorator, adapter
    /// and domain leaf, with default revive behavior (see
    /// [`NodeRegistry::with_builtins_configured`]).
    pub fn with_builtins(channel: &MarkerChannel) -> Result<Self> {
        Self::with_builtins_configured(channel, &EngineConfig::default())
    }

    /// A registry covering every built-in composite, decorator, adapter
    /// and domain leaf. The move adapter's factory captures the marker
    /// channel so revived adapters are attached to their side channel by
    /// construction; `config.retry_delay_ms` becomes the delay of revived
    /// retry decorators whose serialized form carries none.
    pub fn with_builtins_configured(
        channel: &MarkerChannel,
        config: &EngineConfig,
    ) -> Result<Self> {
        use crate::actions::counter::CounterAction;
        use crate::actions::digging::DigAction;
        use crate::actions::inventory::{DropAction, SuckAction};
        use crate::actions::movement::MoveAction;
        use crate::actions::placing::PlaceAction;

        let mut registry = Self::empty();

        registry.register_node(Sequence::KIND, Sequence::revive)?;
        registry.register_node(Selector::KIND, Selector::revive)?;
        registry.register_node(RandomSelector::KIND, RandomSelector::revive)?;

        registry.register_node(Inverter::KIND, Inverter::revive)?;
        registry.register_node(Succeeder::KIND, Succeeder::revive)?;
        registry.register_node(RepeatUntilFailure::KIND, RepeatUntilFailure::revive)?;
        registry.register_node(Repeater::KIND, Repeater::revive)?;
        registry.register_node(DieOnFailure::KIND, DieOnFailure::revive)?;
        let retry_delay = Duration::from_millis(config.retry_delay_ms);
        registry.register_node(RetryOnFailure::KIND, move |value, registry| {
            RetryOnFailure::revive(value, registry, retry_delay)
        })?;

        let move_channel = channel.clone();
        registry.register_node(MoveResultInterpreter::KIND, move |value, registry| {
            MoveResultInterpreter::revive(value, registry, &move_channel)
        })?;
        registry.register_node(DigResultInterpreter::KIND, DigResultInterpreter::revive)?;
        registry.register_node(PlaceResultInterpreter::KIND, PlaceResultInterpreter::revive)?;
        registry.register_node(DropResultInterpreter::KIND, DropResultInterpreter::revive)?;
        registry.register_node(SuckResultInterpreter::KIND, SuckResultInterpreter::revive)?;

        registry.register_node(CounterAction::KIND, CounterAction::revive)?;

        registry.register_move_leaf(MoveAction::KIND, MoveAction::revive)?;
        registry.register_dig_leaf(DigAction::KIND, DigAction::revive)?;
        registry.register_place_leaf(PlaceAction::KIND, PlaceAction::revive)?;
        registry.register_drop_leaf(DropAction::KIND, DropAction::revive)?;
        registry.register_suck_leaf(SuckAction::KIND, SuckAction::revive)?;

        Ok(registry)
    }

    /// Register a tree-node factory. Duplicate kinds are a fatal error.
    pub fn register_node(
        &mut self,
        kind: &str,
        factory: impl Fn(&Value, &NodeRegistry) -> Result<Box<dyn Node>> + 'static,
    ) -> Result<()> {
        insert_checked(&mut self.nodes, "node", kind, Box::new(factory) as NodeFactory)
    }

    pub fn register_move_leaf(
        &mut self,
        kind: &str,
        factory: impl Fn(&Value, &NodeRegistry) -> Result<Box<dyn MoveLeaf>> + 'static,
    ) -> Result<()> {
        insert_checked(
            &mut self.move_leaves,
            "move leaf",
            kind,
            Box::new(factory) as MoveLeafFactory,
        )
    }

    pub fn register_dig_leaf(
        &mut self,
        kind: &str,
        factory: impl Fn(&Value, &NodeRegistry) -> Result<Box<dyn DigLeaf>> + 'static,
    ) -> Result<()> {
        insert_checked(
            &mut self.dig_leaves,
            "dig leaf",
            kind,
            Box::new(factory) as DigLeafFactory,
        )
    }

    pub fn register_place_leaf(
        &mut self,
        kind: &str,
        factory: impl Fn(&Value, &NodeRegistry) -> Result<Box<dyn PlaceLeaf>> + 'static,
    ) -> Result<()> {
        insert_checked(
            &mut self.place_leaves,
            "place leaf",
            kind,
            Box::new(factory) as PlaceLeafFactory,
        )
    }

    pub fn register_drop_leaf(
        &mut self,
        kind: &str,
        factory: impl Fn(&Value, &NodeRegistry) -> Result<Box<dyn DropLeaf>> + 'static,
    ) -> Result<()> {
        insert_checked(
            &mut self.drop_leaves,
            "drop leaf",
            kind,
            Box::new(factory) as DropLeafFactory,
        )
    }

    pub fn register_suck_leaf(
        &mut self,
        kind: &str,
        factory: impl Fn(&Value, &NodeRegistry) -> Result<Box<dyn SuckLeaf>> + 'static,
    ) -> Result<()> {
        insert_checked(
            &mut self.suck_leaves,
            "suck leaf",
            kind,
            Box::new(factory) as SuckLeafFactory,
        )
    }

    /// Revive a tree node from its serialized form.
    pub fn revive(&self, value: &Value) -> Result<Box<dyn Node>> {
        let kind = require_kind(value)?;
        trace!(kind, "reviving node");
        let factory = self.nodes.get(kind).ok_or_else(|| UnknownKindError {
            kind: kind.to_string(),
        })?;
        factory(value, self).with_context(|| format!("revive node '{kind}'"))
    }

    pub fn revive_move_leaf(&self, value: &Value) -> Result<Box<dyn MoveLeaf>> {
        let kind = require_kind(value)?;
        let factory = self.move_leaves.get(kind).ok_or_else(|| UnknownKindError {
            kind: kind.to_string(),
        })?;
        factory(value, self).with_context(|| format!("revive move leaf '{kind}'"))
    }

    pub fn revive_dig_leaf(&self, value: &Value) -> Result<Box<dyn DigLeaf>> {
        let kind = require_kind(value)?;
        let factory = self.dig_leaves.get(kind).ok_or_else(|| UnknownKindError {
            kind: kind.to_string(),
        })?;
        factory(value, self).with_context(|| format!("revive dig leaf '{kind}'"))
    }

    pub fn revive_place_leaf(&self, value: &Value) -> Result<Box<dyn PlaceLeaf>> {
        let kind = require_kind(value)?;
        let factory = self.place_leaves.get(kind).ok_or_else(|| UnknownKindError {
            kind: kind.to_string(),
        })?;
        factory(value, self).with_context(|| format!("revive place leaf '{kind}'"))
    }

    pub fn revive_drop_leaf(&self, value: &Value) -> Result<Box<dyn DropLeaf>> {
        let kind = require_kind(value)?;
        let factory = self.drop_leaves.get(kind).ok_or_else(|| UnknownKindError {
            kind: kind.to_string(),
        })?;
        factory(value, self).with_context(|| format!("revive drop leaf '{kind}'"))
    }

    pub fn revive_suck_leaf(&self, value: &Value) -> Result<Box<dyn SuckLeaf>> {
        let kind = require_kind(value)?;
        let factory = self.suck_leaves.get(kind).ok_or_else(|| UnknownKindError {
            kind: kind.to_string(),
        })?;
        factory(value, self).with_context(|| format!("revive suck leaf '{kind}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_channel;
    use serde_json::json;

    #[test]
    fn duplicate_kind_is_a_registration_error() {
        let channel = memory_channel();
        let mut registry = NodeRegistry::with_builtins(&channel).expect("builtins");
        let err = registry
            .register_node(Sequence::KIND, Sequence::revive)
            .expect_err("collision");
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn unknown_kind_is_fatal_and_names_the_kind() {
        let channel = memory_channel();
        let registry = NodeRegistry::with_builtins(&channel).expect("builtins");
        let err = registry
            .revive(&json!({"kind": "warp_drive"}))
            .expect_err("unknown kind");
        let unknown = err
            .downcast_ref::<UnknownKindError>()
            .expect("downcast UnknownKindError");
        assert_eq!(unknown.kind, "warp_drive");
    }

    #[test]
    fn configured_retry_delay_applies_to_revived_retry_nodes() {
        let channel = memory_channel();
        let config = EngineConfig {
            retry_delay_ms: 250,
            ..EngineConfig::default()
        };
        let registry =
            NodeRegistry::with_builtins_configured(&channel, &config).expect("builtins");

        // No delay_ms in the serialized form: the config's delay applies.
        let raw = json!({
            "kind": "retry_on_failure",
            "child": {"kind": "counter", "key": "tries"},
        });
        let node = registry.revive(&raw).expect("revive");
        assert_eq!(node.save().expect("save")["delay_ms"], 250);

        // An explicit delay_ms still wins over the configured default.
        let raw = json!({
            "kind": "retry_on_failure",
            "delay_ms": 10,
            "child": {"kind": "counter", "key": "tries"},
        });
        let node = registry.revive(&raw).expect("revive");
        assert_eq!(node.save().expect("save")["delay_ms"], 10);
    }

    #[test]
    fn builtins_cover_composites_decorators_and_adapters() {
        let channel = memory_channel();
        let registry = NodeRegistry::with_builtins(&channel).expect("builtins");
        let raw = json!({
            "kind": "sequence",
            "children": [
                {"kind": "move_interpreter", "child": {"kind": "move", "motion": "forward"}},
                {"kind": "succeeder", "child": {
                    "kind": "dig_interpreter", "child": {"kind": "dig", "direction": "forward"},
                }},
                {"kind": "counter", "key": "steps"},
            ],
        });
        let node = registry.revive(&raw).expect("revive");
        assert_eq!(node.kind(), "sequence");
    }
}
