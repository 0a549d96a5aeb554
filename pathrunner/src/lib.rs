//! Resumable behavior-tree execution engine for interruptible agents.
//!
//! This crate implements an "action path": a behavior tree whose execution
//! can be destroyed at an arbitrary point (power loss, process kill) and
//! resumed from durable state without double-applying non-idempotent
//! effects. The architecture enforces a strict separation:
//!
//! - **[`tree`]**: Pure node semantics (composites, decorators, outcome
//!   adapters). No I/O, fully testable in isolation.
//! - **[`actions`]**: Built-in domain leaves (movement, digging, placing,
//!   inventory transfer) expressed against the [`agent::Agent`] capability
//!   surface.
//! - **[`io`]**: Side-effecting persistence (path snapshots, the recovery
//!   marker side channel, engine configuration). Isolated to enable
//!   in-memory doubles in tests.
//!
//! Orchestration modules ([`path`], [`looping`], [`registry`],
//! [`recovery`]) tie node semantics to durable state: a driver ticks the
//! root once, persists the whole tree, and yields to the host — the host
//! may be killed at any point after that and resume exactly there.

pub mod actions;
pub mod agent;
pub mod io;
pub mod logging;
pub mod looping;
pub mod path;
pub mod recovery;
pub mod registry;
pub mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tree;
