//! Pure behavior-tree semantics shared by the engine.
//!
//! Tree modules must be free of filesystem I/O. Nodes operate on the
//! agent capability surface and the blackboard passed into every call and
//! return deterministic statuses suitable for tests.

pub mod adapter;
pub mod composite;
pub mod decorator;
pub mod leaf;
pub mod node;
pub mod status;

pub use node::Node;
pub use status::Status;
