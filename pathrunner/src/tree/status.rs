//! Three-valued tick status shared by every node.

/// Status returned by a node after a single tick.
///
/// Compared by identity, never by magnitude. `Running` means "call me
/// again before anything else in the tree progresses"; `Success` and
/// `Failure` propagate up through composites and decorators per their own
/// rules. Domain outcomes (movement, digging, inventory) are distinct
/// enums and must be explicitly adapted into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The node completed its step successfully.
    Success,
    /// The node has started but needs more ticks.
    Running,
    /// The node could not complete its step.
    Failure,
}

impl Status {
    /// True for `Success` and `Failure`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_is_not_terminal() {
        assert!(Status::Success.is_terminal());
        assert!(Status::Failure.is_terminal());
        assert!(!Status::Running.is_terminal());
    }
}
