//! Shared identifiers, coordinates, and the task model used across the system.

use std::fmt;

use serde::Deserialize;

/// Unique identifier for an agent, allocated by an [`IdAllocator`].
pub type AgentId = u64;

/// Integer grid coordinate. Negative values are valid positions for agents,
/// although the grid map itself only spans non-negative cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "[i32; 2]")]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance, widened so large coordinates cannot overflow.
    pub fn distance_sq(self, other: Position) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }
}

impl From<[i32; 2]> for Position {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Logical role of an agent in the cleaning pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Scanner,
    Collector,
    Finisher,
}

impl Role {
    /// Dense index used by per-role tables.
    pub const fn index(self) -> usize {
        match self {
            Role::Scanner => 0,
            Role::Collector => 1,
            Role::Finisher => 2,
        }
    }

    /// The only kind of work an agent of this role can complete.
    pub const fn work_kind(self) -> WorkKind {
        match self {
            Role::Scanner => WorkKind::Scan,
            Role::Collector => WorkKind::Collect,
            Role::Finisher => WorkKind::Finish,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Scanner => "scanner",
            Role::Collector => "collector",
            Role::Finisher => "finisher",
        };
        f.write_str(name)
    }
}

/// Coarse-grained activity state of an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityState {
    Idle,
    Moving,
    Arrived,
    Working,
    Faulted,
}

/// Work vocabulary carried by `StartWork` commands and completion events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkKind {
    Collect,
    Finish,
    Scan,
}

impl WorkKind {
    /// Wire label for the kind (`"COLLECT"`, `"FINISH"`, `"SCAN"`).
    pub const fn label(self) -> &'static str {
        match self {
            WorkKind::Collect => "COLLECT",
            WorkKind::Finish => "FINISH",
            WorkKind::Scan => "SCAN",
        }
    }
}

/// Pipeline stage a queued task requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Collect,
    Finish,
}

impl Stage {
    /// Role qualified to perform this stage.
    pub const fn role(self) -> Role {
        match self {
            Stage::Collect => Role::Collector,
            Stage::Finish => Role::Finisher,
        }
    }

    pub const fn work_kind(self) -> WorkKind {
        match self {
            Stage::Collect => WorkKind::Collect,
            Stage::Finish => WorkKind::Finish,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.work_kind().label())
    }
}

/// Unit of pipeline work: a target cell and the stage it still needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Task {
    pub cell: Position,
    pub stage: Stage,
}

impl Task {
    pub fn new(cell: Position, stage: Stage) -> Self {
        Self { cell, stage }
    }
}

/// Hands out monotonically increasing agent ids, starting at 1.
///
/// Owned by whoever builds the fleet so that separate runs (and tests) get
/// reproducible ids instead of sharing a process-wide counter.
#[derive(Debug)]
pub struct IdAllocator {
    next: AgentId,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> AgentId {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
