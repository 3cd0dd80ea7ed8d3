//! Error types for grid_sweep.
//!
//! Only configuration-class failures are errors. An unavailable agent or a
//! stale task is an expected outcome and is reported through `Option`/`bool`.

use thiserror::Error;

use crate::types::AgentId;

/// Result type alias for grid_sweep operations
pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("grid dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("grid {width}x{height} exceeds the {max} cell limit")]
    GridTooLarge { width: i32, height: i32, max: usize },

    #[error("seed cell ({x},{y}) lies outside the {width}x{height} grid")]
    SeedOutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },

    #[error("agent id {0} is already registered")]
    DuplicateAgent(AgentId),

    #[error("no scanner agents registered")]
    NoScanners,

    #[error("planner is not configured; seed the grid before running")]
    PlannerNotConfigured,

    #[error("planner produced {got} scan plans for {expected} scanners")]
    PlanMismatch { expected: usize, got: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
