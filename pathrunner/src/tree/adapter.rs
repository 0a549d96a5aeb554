//! Result-interpreter adapters.
//!
//! Each adapter wraps a domain leaf whose `perform` returns that domain's
//! own outcome enum, and maps the outcome through the domain's
//! `is_success` predicate into tree `Success`/`Failure`. The move adapter
//! additionally drives the recovery handshake around the one
//! non-idempotent primitive per tick.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::agent::Agent;
use crate::recovery::MarkerChannel;
use crate::registry::NodeRegistry;
use crate::state::PathState;
use crate::tree::leaf::{DigLeaf, DropLeaf, MoveLeaf, PlaceLeaf, SuckLeaf};
use crate::tree::node::require_field;
use crate::tree::{Node, Status};

/// Adapts a [`MoveLeaf`] into the tree, with crash recovery.
///
/// Requires the marker channel at construction, so a move adapter cannot
/// exist detached from its side channel. Tick order:
///
/// 1. A pending marker is resolved through the leaf's `recover` hook
///    before anything else; a confirmed-complete motion short-circuits to
///    `Success` without re-invoking the primitive.
/// 2. Otherwise a fresh intent is prepared and durably armed, the
///    primitive executes, and on a successful outcome the leaf's
///    `update_state` runs immediately — the marker's correctness depends
///    on the believed pose moving in the same tick as the physical move.
/// 3. On an unsuccessful outcome the marker is cleared in-tick (nothing
///    half-applied, a retry is safe). A successful motion leaves the
///    marker armed: its outcome is durably known only once the driver
///    persists this tick's snapshot, and the driver releases the channel
///    right after that. A crash in between resumes from the stale
///    snapshot, re-enters this adapter, and resolves the still-pending
///    marker instead of moving twice.
pub struct MoveResultInterpreter {
    child: Box<dyn MoveLeaf>,
    channel: MarkerChannel,
}

impl MoveResultInterpreter {
    pub const KIND: &'static str = "move_interpreter";

    pub fn new(child: Box<dyn MoveLeaf>, channel: MarkerChannel) -> Self {
        Self { child, channel }
    }

    pub(crate) fn revive(
        value: &Value,
        registry: &NodeRegistry,
        channel: &MarkerChannel,
    ) -> Result<Box<dyn Node>> {
        let child = registry
            .revive_move_leaf(require_field(value, "child")?)
            .context("revive move leaf")?;
        Ok(Box::new(Self::new(child, channel.clone())))
    }
}

impl Node for MoveResultInterpreter {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        if let Some(intent) = self.channel.pending()? {
            debug!(kind = ?intent.kind, "resolving pending recovery marker");
            if self.child.recover(agent, &intent)? {
                // The interrupted motion already happened; credit it
                // without touching the primitive again. The driver
                // clears the marker once this tick's snapshot lands.
                return Ok(Status::Success);
            }
            self.channel.clear()?;
        }

        let intent = self.child.prepare(agent)?;
        self.channel.arm(&intent)?;
        let outcome = self.child.perform(agent, state)?;
        trace!(?outcome, "move leaf performed");
        if outcome.is_success() {
            self.child.update_state(agent, state)?;
            // Marker stays armed until the driver persists this tick.
            Ok(Status::Success)
        } else {
            // Nothing half-applied: an unsuccessful motion must not
            // trigger resolution after a later crash.
            self.channel.clear()?;
            Ok(Status::Failure)
        }
    }

    // The pose commit already happened inside perform; forwarding the
    // root-level pass here would apply it twice.
    fn update_state(&mut self, _agent: &mut dyn Agent, _state: &mut PathState) -> Result<()> {
        Ok(())
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({"kind": Self::KIND, "child": self.child.save()?}))
    }
}

/// Adapts a [`DigLeaf`] outcome into tree Success/Failure.
pub struct DigResultInterpreter {
    child: Box<dyn DigLeaf>,
}

impl DigResultInterpreter {
    pub const KIND: &'static str = "dig_interpreter";

    pub fn new(child: Box<dyn DigLeaf>) -> Self {
        Self { child }
    }

    pub(crate) fn revive(value: &Value, registry: &NodeRegistry) -> Result<Box<dyn Node>> {
        let child = registry
            .revive_dig_leaf(require_field(value, "child")?)
            .context("revive dig leaf")?;
        Ok(Box::new(Self::new(child)))
    }
}

impl Node for DigResultInterpreter {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        let outcome = self.child.perform(agent, state)?;
        trace!(?outcome, "dig leaf performed");
        Ok(if outcome.is_success() {
            Status::Success
        } else {
            Status::Failure
        })
    }

    fn update_state(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<()> {
        self.child.update_state(agent, state)
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({"kind": Self::KIND, "child": self.child.save()?}))
    }
}

/// Adapts a [`PlaceLeaf`] outcome into tree Success/Failure.
pub struct PlaceResultInterpreter {
    child: Box<dyn PlaceLeaf>,
}

impl PlaceResultInterpreter {
    pub const KIND: &'static str = "place_interpreter";

    pub fn new(child: Box<dyn PlaceLeaf>) -> Self {
        Self { child }
    }

    pub(crate) fn revive(value: &Value, registry: &NodeRegistry) -> Result<Box<dyn Node>> {
        let child = registry
            .revive_place_leaf(require_field(value, "child")?)
            .context("revive place leaf")?;
        Ok(Box::new(Self::new(child)))
    }
}

impl Node for PlaceResultInterpreter {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        let outcome = self.child.perform(agent, state)?;
        trace!(?outcome, "place leaf performed");
        Ok(if outcome.is_success() {
            Status::Success
        } else {
            Status::Failure
        })
    }

    fn update_state(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<()> {
        self.child.update_state(agent, state)
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({"kind": Self::KIND, "child": self.child.save()?}))
    }
}

/// Adapts a [`DropLeaf`] outcome into tree Success/Failure.
pub struct DropResultInterpreter {
    child: Box<dyn DropLeaf>,
}

impl DropResultInterpreter {
    pub const KIND: &'static str = "drop_interpreter";

    pub fn new(child: Box<dyn DropLeaf>) -> Self {
        Self { child }
    }

    pub(crate) fn revive(value: &Value, registry: &NodeRegistry) -> Result<Box<dyn Node>> {
        let child = registry
            .revive_drop_leaf(require_field(value, "child")?)
            .context("revive drop leaf")?;
        Ok(Box::new(Self::new(child)))
    }
}

impl Node for DropResultInterpreter {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        let outcome = self.child.perform(agent, state)?;
        trace!(?outcome, "drop leaf performed");
        Ok(if outcome.is_success() {
            Status::Success
        } else {
            Status::Failure
        })
    }

    fn update_state(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<()> {
        self.child.update_state(agent, state)
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({"kind": Self::KIND, "child": self.child.save()?}))
    }
}

/// Adapts a [`SuckLeaf`] outcome into tree Success/Failure.
pub struct SuckResultInterpreter {
    child: Box<dyn SuckLeaf>,
}

impl SuckResultInterpreter {
    pub const KIND: &'static str = "suck_interpreter";

    pub fn new(child: Box<dyn SuckLeaf>) -> Self {
        Self { child }
    }

    pub(crate) fn revive(value: &Value, registry: &NodeRegistry) -> Result<Box<dyn Node>> {
        let child = registry
            .revive_suck_leaf(require_field(value, "child")?)
            .context("revive suck leaf")?;
        Ok(Box::new(Self::new(child)))
    }
}

impl Node for SuckResultInterpreter {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        let outcome = self.child.perform(agent, state)?;
        trace!(?outcome, "suck leaf performed");
        Ok(if outcome.is_success() {
            Status::Success
        } else {
            Status::Failure
        })
    }

    fn update_state(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<()> {
        self.child.update_state(agent, state)
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({"kind": Self::KIND, "child": self.child.save()?}))
    }
}
