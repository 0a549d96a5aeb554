//! Side-effecting persistence for the engine.
//!
//! Everything that touches the filesystem lives here: the per-tick path
//! snapshot, the recovery marker side channel, and the engine
//! configuration. All writes are atomic (temp file + rename) so a crash
//! mid-write leaves the previous durable state intact.

pub mod config;
pub mod marker_store;
pub mod path_store;
pub mod paths;
