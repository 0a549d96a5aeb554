//! Built-in domain leaves: the agent's action vocabulary.
//!
//! Leaves return their family's own outcome enum and are wrapped by the
//! result-interpreter adapters in [`crate::tree::adapter`]. They hold
//! only serializable configuration; all world effects go through the
//! [`crate::agent::Agent`] capability surface.

pub mod counter;
pub mod digging;
pub mod inventory;
pub mod movement;
pub mod placing;
