//! The polymorphic node contract and serialized-form helpers.

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::agent::Agent;
use crate::state::PathState;
use crate::tree::Status;

/// A node in an action path.
///
/// Implementations advance by exactly one logical step per [`perform`]
/// call and serialize themselves to a JSON object carrying a stable
/// `"kind"` discriminant. Deserialization is not part of the trait: it
/// goes through a [`crate::registry::NodeRegistry`] factory keyed by that
/// kind, so the set of node types stays open to the embedding application.
///
/// Any side channel a node needs (the move adapter's recovery channel)
/// is required at construction, which makes "performed before being
/// attached to a driver" structurally impossible.
///
/// [`perform`]: Node::perform
pub trait Node {
    /// Stable identifier used as the serialization discriminant.
    ///
    /// Must be unique across the whole registry; collisions are a
    /// registration-time fatal error.
    fn kind(&self) -> &'static str;

    /// Advance this node by exactly one logical step.
    ///
    /// Ordinary domain failures are expressed as [`Status::Failure`];
    /// `Err` is reserved for fatal, unrecoverable conditions (see
    /// [`crate::tree::decorator::DieOnFailure`]).
    fn perform(&mut self, agent: &mut dyn Agent, state: &mut PathState) -> Result<Status>;

    /// Commit hook, invoked by the driver only when the **root** node's
    /// `perform` returned [`Status::Success`] on this tick.
    ///
    /// Most nodes no-op. Composites and decorators forward the pass so
    /// state-committing leaves see it regardless of depth.
    fn update_state(&mut self, _agent: &mut dyn Agent, _state: &mut PathState) -> Result<()> {
        Ok(())
    }

    /// Serialize this node (recursively, for composites and decorators)
    /// to a JSON object that includes its `"kind"`.
    fn save(&self) -> Result<Value>;
}

impl std::fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node").field("kind", &self.kind()).finish()
    }
}

/// Extract the `"kind"` discriminant from a serialized node.
pub(crate) fn require_kind(value: &Value) -> Result<&str> {
    value
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("serialized node missing string 'kind'"))
}

/// Extract a required field from a serialized node.
pub(crate) fn require_field<'a>(value: &'a Value, name: &str) -> Result<&'a Value> {
    value
        .get(name)
        .ok_or_else(|| anyhow!("serialized node missing '{name}'"))
}

/// Read a 1-based cursor field, defaulting to its identity value when
/// absent, and validate it against the child count.
pub(crate) fn cursor_field(value: &Value, name: &str, child_count: usize) -> Result<usize> {
    let cursor = match value.get(name) {
        None | Some(Value::Null) => 1,
        Some(raw) => raw
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| anyhow!("'{name}' must be a positive integer"))?,
    };
    if cursor < 1 || cursor > child_count {
        return Err(anyhow!(
            "'{name}' {cursor} out of range for {child_count} children"
        ));
    }
    Ok(cursor)
}

/// Read a non-negative counter field, defaulting to zero when absent.
pub(crate) fn counter_field(value: &Value, name: &str) -> Result<u64> {
    match value.get(name) {
        None | Some(Value::Null) => Ok(0),
        Some(raw) => raw
            .as_u64()
            .ok_or_else(|| anyhow!("'{name}' must be a non-negative integer")),
    }
}

/// Save a slice of children into a JSON array.
pub(crate) fn save_children(children: &[Box<dyn Node>]) -> Result<Vec<Value>> {
    children
        .iter()
        .enumerate()
        .map(|(i, child)| child.save().with_context(|| format!("save child {i}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn require_kind_rejects_missing_discriminant() {
        let err = require_kind(&json!({"children": []})).expect_err("kind");
        assert!(err.to_string().contains("kind"));
    }

    #[test]
    fn cursor_field_defaults_to_one() {
        let cursor = cursor_field(&json!({}), "current_index", 3).expect("cursor");
        assert_eq!(cursor, 1);
    }

    #[test]
    fn cursor_field_rejects_out_of_range() {
        let err = cursor_field(&json!({"current_index": 4}), "current_index", 3)
            .expect_err("out of range");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn counter_field_defaults_to_zero() {
        assert_eq!(counter_field(&json!({}), "counter").expect("counter"), 0);
        assert_eq!(
            counter_field(&json!({"counter": 7}), "counter").expect("counter"),
            7
        );
    }
}
