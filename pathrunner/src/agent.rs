//! Agent capability surface and domain vocabulary.
//!
//! The engine treats the physical agent as an external collaborator: every
//! primitive operation is an opaque, potentially slow call returning a
//! domain outcome code. Domain outcomes are deliberately distinct from the
//! tree's [`crate::tree::Status`] and are mapped into it only by the
//! result-interpreter adapters in [`crate::tree::adapter`].

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Believed or observed agent position in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Position {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

/// Horizontal heading of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    North,
    East,
    South,
    West,
}

impl Facing {
    pub fn left(self) -> Self {
        match self {
            Facing::North => Facing::West,
            Facing::West => Facing::South,
            Facing::South => Facing::East,
            Facing::East => Facing::North,
        }
    }

    pub fn right(self) -> Self {
        match self {
            Facing::North => Facing::East,
            Facing::East => Facing::South,
            Facing::South => Facing::West,
            Facing::West => Facing::North,
        }
    }

    /// Unit step `(dx, dz)` for one move along this heading.
    pub fn step(self) -> (i64, i64) {
        match self {
            Facing::North => (0, -1),
            Facing::South => (0, 1),
            Facing::East => (1, 0),
            Facing::West => (-1, 0),
        }
    }
}

/// One primitive motion of the agent. Turns are motions too: they mutate
/// the believed pose and are non-idempotent across a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    Forward,
    Back,
    Up,
    Down,
    TurnLeft,
    TurnRight,
}

impl MoveKind {
    /// The pose this motion reaches from `(from, facing)`.
    pub fn destination(self, from: Position, facing: Facing) -> (Position, Facing) {
        match self {
            MoveKind::Forward => {
                let (dx, dz) = facing.step();
                (Position::new(from.x + dx, from.y, from.z + dz), facing)
            }
            MoveKind::Back => {
                let (dx, dz) = facing.step();
                (Position::new(from.x - dx, from.y, from.z - dz), facing)
            }
            MoveKind::Up => (Position::new(from.x, from.y + 1, from.z), facing),
            MoveKind::Down => (Position::new(from.x, from.y - 1, from.z), facing),
            MoveKind::TurnLeft => (from, facing.left()),
            MoveKind::TurnRight => (from, facing.right()),
        }
    }

    /// Translations burn fuel; turns do not.
    pub fn consumes_fuel(self) -> bool {
        !matches!(self, MoveKind::TurnLeft | MoveKind::TurnRight)
    }
}

/// Direction a tool-facing primitive (dig/place/drop/suck) acts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolDirection {
    Forward,
    Up,
    Down,
}

/// Outcome of one physical motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    Blocked,
    OutOfFuel,
}

impl MoveOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, MoveOutcome::Moved)
    }
}

/// Outcome of one dig attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigOutcome {
    Dug,
    /// No block in reach.
    Nothing,
    /// Block present but the tool cannot break it.
    Unbreakable,
}

impl DigOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, DigOutcome::Dug)
    }
}

/// Outcome of one place attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    Placed,
    Obstructed,
    OutOfItems,
}

impl PlaceOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, PlaceOutcome::Placed)
    }
}

/// Outcome of one inventory drop, after verified accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// The full requested quantity was transferred.
    Dropped,
    /// Some items moved, but fewer than requested.
    Incomplete,
    /// Nothing matching the request was available.
    Empty,
}

impl DropOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, DropOutcome::Dropped)
    }
}

/// Outcome of one suck attempt, after verified accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuckOutcome {
    /// Requested quantity taken (or, with no requested count, anything).
    Sucked,
    /// Something was taken but less than the requested count.
    Short,
    Nothing,
}

impl SuckOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, SuckOutcome::Sucked)
    }
}

/// What an inventory drop should transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DropStrategy {
    /// Drop `count` items from a specific slot.
    Item { slot: u32, count: u32 },
    /// Drop `count` items of a named type, from any slots.
    ItemType { name: String, count: u32 },
    /// Drop everything that is not the named type.
    ExceptItemType { name: String },
}

/// Capability surface the engine requires of the physical agent.
///
/// Believed pose (`position`/`facing`) is the agent's own bookkeeping,
/// committed by leaf `update_state` hooks. Observed pose
/// (`observed_position`/`observed_facing`) is world truth (GPS-style) and
/// is consulted only by the recovery handshake, never on the hot path.
pub trait Agent {
    fn position(&self) -> Position;
    fn facing(&self) -> Facing;
    fn set_position(&mut self, position: Position);
    fn set_facing(&mut self, facing: Facing);

    /// World-observable position, used to decide whether an interrupted
    /// motion already happened.
    fn observed_position(&mut self) -> Result<Position>;
    /// World-observable heading, used the same way for turns.
    fn observed_facing(&mut self) -> Result<Facing>;

    fn fuel_level(&self) -> Result<u64>;

    /// Execute exactly one physical motion. Non-idempotent; the caller is
    /// responsible for arming the recovery marker first.
    fn execute_move(&mut self, kind: MoveKind) -> Result<MoveOutcome>;

    fn dig(&mut self, direction: ToolDirection) -> Result<DigOutcome>;
    fn place(&mut self, direction: ToolDirection, item: Option<&str>) -> Result<PlaceOutcome>;

    /// Transfer items out per `strategy`, returning the count actually
    /// moved so callers can verify the requested quantity.
    fn drop_items(&mut self, direction: ToolDirection, strategy: &DropStrategy) -> Result<u32>;

    /// Take up to `limit` items (unbounded when `None`), returning the
    /// count actually taken.
    fn suck(&mut self, direction: ToolDirection, limit: Option<u32>) -> Result<u32>;

    /// Count of held items with the given name.
    fn item_count(&self, name: &str) -> Result<u32>;
    /// Count of all held items.
    fn inventory_total(&self) -> Result<u32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_rotations_are_inverse() {
        for facing in [Facing::North, Facing::East, Facing::South, Facing::West] {
            assert_eq!(facing.left().right(), facing);
            assert_eq!(facing.right().right().right().right(), facing);
        }
    }

    #[test]
    fn forward_and_back_cancel_out() {
        let start = Position::new(3, 10, -2);
        for facing in [Facing::North, Facing::East, Facing::South, Facing::West] {
            let (there, _) = MoveKind::Forward.destination(start, facing);
            let (back, _) = MoveKind::Back.destination(there, facing);
            assert_eq!(back, start);
        }
    }

    #[test]
    fn turns_keep_position_and_burn_no_fuel() {
        let start = Position::new(0, 0, 0);
        let (pos, facing) = MoveKind::TurnLeft.destination(start, Facing::North);
        assert_eq!(pos, start);
        assert_eq!(facing, Facing::West);
        assert!(!MoveKind::TurnLeft.consumes_fuel());
        assert!(MoveKind::Up.consumes_fuel());
    }
}
