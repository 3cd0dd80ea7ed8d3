//! In-process command/event bus.
//!
//! Commands flow orchestrator -> agent and are routed by address through the
//! registry. Events flow agent -> orchestrator through a single unbounded
//! FIFO that the orchestrator drains with [`EventBus::poll`].

use std::collections::VecDeque;

use tracing::{trace, warn};

use crate::registry::SpatialRegistry;
use crate::types::{ActivityState, AgentId, Position, Role, WorkKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Move { target: AgentId, destination: Position },
    StartWork { target: AgentId, kind: WorkKind },
    Stop { target: AgentId },
}

impl Command {
    /// Agent this command is addressed to.
    pub fn target(&self) -> AgentId {
        match self {
            Command::Move { target, .. }
            | Command::StartWork { target, .. }
            | Command::Stop { target } => *target,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    StatusChanged {
        agent: AgentId,
        role: Role,
        state: ActivityState,
        position: Position,
    },
    WorkCompleted {
        agent: AgentId,
        kind: WorkKind,
        position: Position,
        success: bool,
    },
}

impl Event {
    pub fn agent(&self) -> AgentId {
        match self {
            Event::StatusChanged { agent, .. } | Event::WorkCompleted { agent, .. } => *agent,
        }
    }
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: VecDeque<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `command` to its addressed agent and queue whatever it publishes.
    /// Returns false when no agent has that id.
    pub fn send(&mut self, registry: &SpatialRegistry, command: Command) -> bool {
        trace!(?command, "send");
        match registry.deliver(&command) {
            Some(events) => {
                self.events.extend(events);
                true
            }
            None => {
                warn!(agent = command.target(), "command for unknown agent dropped");
                false
            }
        }
    }

    /// Fan a command out to every agent of `role`, in registration order.
    /// Returns how many agents it reached.
    pub fn send_to_role<F>(&mut self, registry: &SpatialRegistry, role: Role, build: F) -> usize
    where
        F: Fn(AgentId) -> Command,
    {
        registry
            .by_role(role)
            .iter()
            .filter(|agent| self.send(registry, build(agent.id())))
            .count()
    }

    /// Oldest pending event, if any.
    pub fn poll(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
