//! Recovery marker side channel for the one in-flight motion.
//!
//! The marker bridges the gap between "motion executed" and "tree state
//! persisted": it is durably armed *before* the physical motion and
//! cleared once the outcome is durably known. These are two
//! independently-timed durability points, distinct from the per-tick path
//! snapshot, which is what makes exactly-once recovery possible for the
//! motion even though the tree is only persisted once per full tick.
//!
//! On resume the tree re-enters the tick that was destroyed; because
//! evaluation is deterministic (an in-progress random pick is part of the
//! persisted tree), the same move adapter encounters the pending marker
//! and resolves it against observed world state before anything else runs.

use std::rc::Rc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::{Facing, MoveKind, Position};

/// Pre-operation intent recorded before one physical motion.
///
/// Records the believed pre-state and the pose the motion is expected to
/// reach, so a resume can classify observed world state as "happened" or
/// "did not happen".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIntent {
    pub kind: MoveKind,
    pub from: Position,
    pub facing: Facing,
    pub destination: Position,
    pub expected_facing: Facing,
}

impl MoveIntent {
    /// Build the intent for executing `kind` from the believed pose.
    pub fn new(kind: MoveKind, from: Position, facing: Facing) -> Self {
        let (destination, expected_facing) = kind.destination(from, facing);
        Self {
            kind,
            from,
            facing,
            destination,
            expected_facing,
        }
    }
}

/// Durable storage for the single in-flight marker.
///
/// `arm` must be durable before the motion executes; `clear` after the
/// outcome is known. File-backed in [`crate::io::marker_store`], in-memory
/// in `test_support`.
pub trait MarkerStore {
    fn pending(&self) -> Result<Option<MoveIntent>>;
    fn arm(&self, intent: &MoveIntent) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Cloneable handle to the marker side channel.
///
/// Move adapters take this at construction; the whole engine is
/// single-threaded by design (one active path owns all state), so a
/// shared `Rc` handle suffices.
#[derive(Clone)]
pub struct MarkerChannel {
    store: Rc<dyn MarkerStore>,
}

impl MarkerChannel {
    pub fn new(store: Rc<dyn MarkerStore>) -> Self {
        Self { store }
    }

    pub fn pending(&self) -> Result<Option<MoveIntent>> {
        self.store.pending()
    }

    pub fn arm(&self, intent: &MoveIntent) -> Result<()> {
        debug!(kind = ?intent.kind, from = ?intent.from, "arming recovery marker");
        self.store.arm(intent)
    }

    pub fn clear(&self) -> Result<()> {
        debug!("clearing recovery marker");
        self.store.clear()
    }
}
