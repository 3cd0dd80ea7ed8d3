//! grid_sweep: a fleet of scanners, collectors, and finishers cleaning a
//! contaminated grid, coordinated over an in-process command/event bus.

pub mod agent;
pub mod bus;
pub mod config;
pub mod control_loop;
pub mod error;
pub mod grid_map;
pub mod logging;
pub mod planner;
pub mod registry;
pub mod scenario;
pub mod sim;
pub mod task_queue;
pub mod types;

pub use agent::{Agent, AgentKind, Fault};
pub use bus::{Command, Event, EventBus};
pub use config::SimConfig;
pub use control_loop::{BootstrapFeed, ControlLoop, RunOutcome, RunReport};
pub use error::{Result, SimError};
pub use grid_map::{CellState, GridMap};
pub use planner::Planner;
pub use registry::SpatialRegistry;
pub use types::{ActivityState, AgentId, IdAllocator, Position, Role, Stage, Task, WorkKind};
