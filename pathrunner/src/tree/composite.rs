//! Composite nodes: Sequence, Selector, RandomSelector.
//!
//! Composites never evaluate more than one child per tick. This bounds
//! the side-effecting work per tick to exactly one primitive leaf action,
//! which is the property the crash-recovery model depends on. Each tracks
//! a durable 1-based cursor that survives `Running` results and resets on
//! any terminal result.

use std::collections::BTreeSet;

use anyhow::{Context, Result, anyhow};
use rand::Rng;
use serde_json::{Value, json};
use tracing::trace;

use crate::agent::Agent;
use crate::registry::NodeRegistry;
use crate::state::PathState;
use crate::tree::node::{cursor_field, require_field, save_children};
use crate::tree::{Node, Status};

fn revive_children(value: &Value, registry: &NodeRegistry) -> Result<Vec<Box<dyn Node>>> {
    let raw = require_field(value, "children")?
        .as_array()
        .ok_or_else(|| anyhow!("'children' must be an array"))?;
    raw.iter()
        .enumerate()
        .map(|(i, child)| {
            registry
                .revive(child)
                .with_context(|| format!("revive child {i}"))
        })
        .collect()
}

/// Runs children in order, one per tick. Fails as soon as any child
/// fails; succeeds once the last child has succeeded.
pub struct Sequence {
    children: Vec<Box<dyn Node>>,
    /// 1-based cursor into `children`.
    current: usize,
}

impl Sequence {
    pub const KIND: &'static str = "sequence";

    pub fn new(children: Vec<Box<dyn Node>>) -> Result<Self> {
        if children.is_empty() {
            return Err(anyhow!("sequence requires at least one child"));
        }
        Ok(Self {
            children,
            current: 1,
        })
    }

    pub(crate) fn revive(value: &Value, registry: &NodeRegistry) -> Result<Box<dyn Node>> {
        let children = revive_children(value, registry)?;
        let current = cursor_field(value, "current_index", children.len())?;
        let mut sequence = Self::new(children)?;
        sequence.current = current;
        Ok(Box::new(sequence))
    }
}

impl Node for Sequence {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        let index = self.current;
        let status = self.children[index - 1].perform(agent, state)?;
        trace!(index, ?status, "sequence child performed");
        match status {
            Status::Success => {
                if index == self.children.len() {
                    self.current = 1;
                    Ok(Status::Success)
                } else {
                    // One child per tick: the next child waits for the
                    // next tick even though it is already due.
                    self.current = index + 1;
                    Ok(Status::Running)
                }
            }
            Status::Running => Ok(Status::Running),
            Status::Failure => {
                self.current = 1;
                Ok(Status::Failure)
            }
        }
    }

    fn update_state(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<()> {
        for child in &mut self.children {
            child.update_state(agent, state)?;
        }
        Ok(())
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({
            "kind": Self::KIND,
            "current_index": self.current,
            "children": save_children(&self.children)?,
        }))
    }
}

/// Tries children in order, one per tick. Succeeds as soon as any child
/// succeeds; fails once the last child has failed.
pub struct Selector {
    children: Vec<Box<dyn Node>>,
    /// 1-based cursor into `children`.
    current: usize,
}

impl Selector {
    pub const KIND: &'static str = "selector";

    pub fn new(children: Vec<Box<dyn Node>>) -> Result<Self> {
        if children.is_empty() {
            return Err(anyhow!("selector requires at least one child"));
        }
        Ok(Self {
            children,
            current: 1,
        })
    }

    pub(crate) fn revive(value: &Value, registry: &NodeRegistry) -> Result<Box<dyn Node>> {
        let children = revive_children(value, registry)?;
        let current = cursor_field(value, "current_index", children.len())?;
        let mut selector = Self::new(children)?;
        selector.current = current;
        Ok(Box::new(selector))
    }
}

impl Node for Selector {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        let index = self.current;
        let status = self.children[index - 1].perform(agent, state)?;
        trace!(index, ?status, "selector child performed");
        match status {
            Status::Success => {
                self.current = 1;
                Ok(Status::Success)
            }
            Status::Running => Ok(Status::Running),
            Status::Failure => {
                if index == self.children.len() {
                    self.current = 1;
                    Ok(Status::Failure)
                } else {
                    self.current = index + 1;
                    Ok(Status::Running)
                }
            }
        }
    }

    fn update_state(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<()> {
        for child in &mut self.children {
            child.update_state(agent, state)?;
        }
        Ok(())
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({
            "kind": Self::KIND,
            "current_index": self.current,
            "children": save_children(&self.children)?,
        }))
    }
}

/// Tries children in uniformly random order without repetition until one
/// succeeds.
///
/// `banned` holds the 1-based indices tried (and failed) since the last
/// terminal result; `current` is the in-progress pick, persisted so a
/// `Running` child is resumed rather than re-rolled after a reload.
pub struct RandomSelector {
    children: Vec<Box<dyn Node>>,
    banned: BTreeSet<usize>,
    current: Option<usize>,
}

impl RandomSelector {
    pub const KIND: &'static str = "random_selector";

    pub fn new(children: Vec<Box<dyn Node>>) -> Result<Self> {
        if children.is_empty() {
            return Err(anyhow!("random selector requires at least one child"));
        }
        Ok(Self {
            children,
            banned: BTreeSet::new(),
            current: None,
        })
    }

    pub(crate) fn revive(value: &Value, registry: &NodeRegistry) -> Result<Box<dyn Node>> {
        let children = revive_children(value, registry)?;
        let count = children.len();

        let banned = match value.get("banned_indexes") {
            None | Some(Value::Null) => BTreeSet::new(),
            Some(raw) => {
                let list = raw
                    .as_array()
                    .ok_or_else(|| anyhow!("'banned_indexes' must be an array"))?;
                let mut banned = BTreeSet::new();
                for entry in list {
                    let index = entry
                        .as_u64()
                        .and_then(|n| usize::try_from(n).ok())
                        .filter(|&i| i >= 1 && i <= count)
                        .ok_or_else(|| {
                            anyhow!("'banned_indexes' entry out of range for {count} children")
                        })?;
                    banned.insert(index);
                }
                banned
            }
        };
        let current = match value.get("current_index") {
            None | Some(Value::Null) => None,
            Some(_) => Some(cursor_field(value, "current_index", count)?),
        };
        // A fully-banned set is a valid snapshot while a pick is still in
        // progress: the pick is banned at selection time, so the last
        // untried child returning Running persists exactly this shape.
        if banned.len() == count && current.is_none() {
            return Err(anyhow!(
                "'banned_indexes' covers every child with no pick in progress; \
                 this state is unreachable"
            ));
        }

        let mut selector = Self::new(children)?;
        selector.banned = banned;
        selector.current = current;
        Ok(Box::new(selector))
    }

    /// Choose uniformly among indices not yet banned this round.
    fn pick(&mut self) -> usize {
        let open: Vec<usize> = (1..=self.children.len())
            .filter(|index| !self.banned.contains(index))
            .collect();
        // Non-empty: the banned set is cleared whenever it covers every
        // child, both at exhaustion and at revive time.
        let pick = open[rand::rng().random_range(0..open.len())];
        self.banned.insert(pick);
        self.current = Some(pick);
        pick
    }
}

impl Node for RandomSelector {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        let index = match self.current {
            Some(index) => index,
            None => self.pick(),
        };
        let status = self.children[index - 1].perform(agent, state)?;
        trace!(index, ?status, "random selector child performed");
        match status {
            Status::Success => {
                self.banned.clear();
                self.current = None;
                Ok(Status::Success)
            }
            Status::Running => Ok(Status::Running),
            Status::Failure => {
                self.current = None;
                if self.banned.len() == self.children.len() {
                    self.banned.clear();
                    Ok(Status::Failure)
                } else {
                    Ok(Status::Running)
                }
            }
        }
    }

    fn update_state(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<()> {
        for child in &mut self.children {
            child.update_state(agent, state)?;
        }
        Ok(())
    }

    fn save(&self) -> Result<Value> {
        let banned: Vec<usize> = self.banned.iter().copied().collect();
        Ok(json!({
            "kind": Self::KIND,
            "current_index": self.current,
            "banned_indexes": banned,
            "children": save_children(&self.children)?,
        }))
    }
}
