//! Decorator nodes: exactly one child, transforming its status.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::agent::Agent;
use crate::registry::NodeRegistry;
use crate::state::PathState;
use crate::tree::node::{counter_field, require_field};
use crate::tree::{Node, Status};

/// Default delay before `RetryOnFailure` hands back `Running`.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

fn revive_child(value: &Value, registry: &NodeRegistry) -> Result<Box<dyn Node>> {
    registry
        .revive(require_field(value, "child")?)
        .context("revive decorator child")
}

/// Swaps Success and Failure; Running passes through unchanged.
pub struct Inverter {
    child: Box<dyn Node>,
}

impl Inverter {
    pub const KIND: &'static str = "inverter";

    pub fn new(child: Box<dyn Node>) -> Self {
        Self { child }
    }

    pub(crate) fn revive(value: &Value, registry: &NodeRegistry) -> Result<Box<dyn Node>> {
        Ok(Box::new(Self::new(revive_child(value, registry)?)))
    }
}

impl Node for Inverter {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        Ok(match self.child.perform(agent, state)? {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
            Status::Running => Status::Running,
        })
    }

    fn update_state(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<()> {
        self.child.update_state(agent, state)
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({"kind": Self::KIND, "child": self.child.save()?}))
    }
}

/// Running passes through; any terminal result becomes Success.
pub struct Succeeder {
    child: Box<dyn Node>,
}

impl Succeeder {
    pub const KIND: &'static str = "succeeder";

    pub fn new(child: Box<dyn Node>) -> Self {
        Self { child }
    }

    pub(crate) fn revive(value: &Value, registry: &NodeRegistry) -> Result<Box<dyn Node>> {
        Ok(Box::new(Self::new(revive_child(value, registry)?)))
    }
}

impl Node for Succeeder {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        Ok(match self.child.perform(agent, state)? {
            Status::Running => Status::Running,
            _ => Status::Success,
        })
    }

    fn update_state(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<()> {
        self.child.update_state(agent, state)
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({"kind": Self::KIND, "child": self.child.save()?}))
    }
}

/// Keeps the child going: Running and Success both become Running.
/// Failure is the loop's only exit and passes through unchanged.
pub struct RepeatUntilFailure {
    child: Box<dyn Node>,
}

impl RepeatUntilFailure {
    pub const KIND: &'static str = "repeat_until_failure";

    pub fn new(child: Box<dyn Node>) -> Self {
        Self { child }
    }

    pub(crate) fn revive(value: &Value, registry: &NodeRegistry) -> Result<Box<dyn Node>> {
        Ok(Box::new(Self::new(revive_child(value, registry)?)))
    }
}

impl Node for RepeatUntilFailure {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        Ok(match self.child.perform(agent, state)? {
            Status::Failure => Status::Failure,
            _ => Status::Running,
        })
    }

    fn update_state(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<()> {
        self.child.update_state(agent, state)
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({"kind": Self::KIND, "child": self.child.save()?}))
    }
}

/// Counts child successes toward `times`, returning Running until the
/// count is reached. `times: None` is the unbounded configuration: it
/// never terminates via count, only via Failure. The counter resets on
/// any terminal result.
pub struct Repeater {
    child: Box<dyn Node>,
    times: Option<u64>,
    counter: u64,
}

impl Repeater {
    pub const KIND: &'static str = "repeater";

    pub fn new(child: Box<dyn Node>, times: Option<u64>) -> Result<Self> {
        if times == Some(0) {
            return Err(anyhow!("repeater times must be > 0 (or unbounded)"));
        }
        Ok(Self {
            child,
            times,
            counter: 0,
        })
    }

    pub(crate) fn revive(value: &Value, registry: &NodeRegistry) -> Result<Box<dyn Node>> {
        let child = revive_child(value, registry)?;
        // Absent defaults to 1; an explicit null means unbounded.
        let times = match value.get("times") {
            None => Some(1),
            Some(Value::Null) => None,
            Some(raw) => Some(
                raw.as_u64()
                    .ok_or_else(|| anyhow!("'times' must be a non-negative integer or null"))?,
            ),
        };
        let counter = counter_field(value, "counter")?;
        let mut repeater = Self::new(child, times)?;
        repeater.counter = counter;
        Ok(Box::new(repeater))
    }
}

impl Node for Repeater {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        match self.child.perform(agent, state)? {
            Status::Running => Ok(Status::Running),
            Status::Failure => {
                self.counter = 0;
                Ok(Status::Failure)
            }
            Status::Success => {
                self.counter += 1;
                match self.times {
                    Some(times) if self.counter >= times => {
                        self.counter = 0;
                        Ok(Status::Success)
                    }
                    _ => Ok(Status::Running),
                }
            }
        }
    }

    fn update_state(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<()> {
        self.child.update_state(agent, state)
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({
            "kind": Self::KIND,
            "times": self.times,
            "counter": self.counter,
            "child": self.child.save()?,
        }))
    }
}

/// Fatal error raised when a child under [`DieOnFailure`] fails.
///
/// Downcastable from the `anyhow::Error` that aborts the tick, so a
/// driver can distinguish an asserted-invariant breach from I/O trouble.
#[derive(Debug)]
pub struct DieOnFailureError {
    pub child_kind: String,
}

impl fmt::Display for DieOnFailureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node '{}' failed under die_on_failure; asserted invariant breached",
            self.child_kind
        )
    }
}

impl std::error::Error for DieOnFailureError {}

/// Promotes child Failure to a fatal, tick-aborting error.
///
/// Exists to make "this must never fail" explicit and loud: the Failure
/// is not a status the tree can absorb, it escalates as `Err` through
/// the whole driver.
pub struct DieOnFailure {
    child: Box<dyn Node>,
}

impl DieOnFailure {
    pub const KIND: &'static str = "die_on_failure";

    pub fn new(child: Box<dyn Node>) -> Self {
        Self { child }
    }

    pub(crate) fn revive(value: &Value, registry: &NodeRegistry) -> Result<Box<dyn Node>> {
        Ok(Box::new(Self::new(revive_child(value, registry)?)))
    }
}

impl Node for DieOnFailure {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        match self.child.perform(agent, state)? {
            Status::Failure => Err(DieOnFailureError {
                child_kind: self.child.kind().to_string(),
            }
            .into()),
            status => Ok(status),
        }
    }

    fn update_state(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<()> {
        self.child.update_state(agent, state)
    }

    fn save(&self) -> Result<Value> {
        Ok(json!({"kind": Self::KIND, "child": self.child.save()?}))
    }
}

/// Retries the child indefinitely: Failure blocks briefly, then reports
/// Running so the same child is performed again next tick.
pub struct RetryOnFailure {
    child: Box<dyn Node>,
    delay: Duration,
}

impl RetryOnFailure {
    pub const KIND: &'static str = "retry_on_failure";

    pub fn new(child: Box<dyn Node>) -> Self {
        Self::with_delay(child, DEFAULT_RETRY_DELAY)
    }

    pub fn with_delay(child: Box<dyn Node>, delay: Duration) -> Self {
        Self { child, delay }
    }

    /// `default_delay` (the engine config's `retry_delay_ms`) applies
    /// when the serialized form carries no `delay_ms` of its own.
    pub(crate) fn revive(
        value: &Value,
        registry: &NodeRegistry,
        default_delay: Duration,
    ) -> Result<Box<dyn Node>> {
        let child = revive_child(value, registry)?;
        let delay = match value.get("delay_ms") {
            None | Some(Value::Null) => default_delay,
            Some(raw) => Duration::from_millis(
                raw.as_u64()
                    .ok_or_else(|| anyhow!("'delay_ms' must be a non-negative integer"))?,
            ),
        };
        Ok(Box::new(Self::with_delay(child, delay)))
    }
}

impl Node for RetryOnFailure {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status> {
        match self.child.perform(agent, state)? {
            Status::Failure => {
                warn!(child = self.child.kind(), "child failed; retrying");
                std::thread::sleep(self.delay);
                Ok(Status::Running)
            }
            status => Ok(status),
        }
    }

    fn update_state(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<()> {
        self.child.update_state(agent, state)
    }

    fn save(&self) -> Result<Value> {
        debug!(delay_ms = self.delay.as_millis() as u64, "saving retry decorator");
        Ok(json!({
            "kind": Self::KIND,
            "delay_ms": self.delay.as_millis() as u64,
            "child": self.child.save()?,
        }))
    }
}
