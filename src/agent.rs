//! Simulated fleet members.
//!
//! Physical behavior is reduced to instantaneous state transitions: a move
//! lands immediately, work finishes immediately. Each handled command yields
//! the events the agent publishes in response.

use serde::Deserialize;
use tracing::debug;

use crate::bus::{Command, Event};
use crate::types::{ActivityState, AgentId, IdAllocator, Position, Role, WorkKind};

/// Role plus the per-role counters an agent keeps about finished work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentKind {
    Scanner { cells_scanned: u32 },
    Collector { cells_collected: u32 },
    Finisher { cells_finished: u32 },
}

impl AgentKind {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Scanner => AgentKind::Scanner { cells_scanned: 0 },
            Role::Collector => AgentKind::Collector { cells_collected: 0 },
            Role::Finisher => AgentKind::Finisher { cells_finished: 0 },
        }
    }

    pub fn role(&self) -> Role {
        match self {
            AgentKind::Scanner { .. } => Role::Scanner,
            AgentKind::Collector { .. } => Role::Collector,
            AgentKind::Finisher { .. } => Role::Finisher,
        }
    }

    /// Units of work this agent completed successfully.
    pub fn completed(&self) -> u32 {
        match self {
            AgentKind::Scanner { cells_scanned } => *cells_scanned,
            AgentKind::Collector { cells_collected } => *cells_collected,
            AgentKind::Finisher { cells_finished } => *cells_finished,
        }
    }

    fn record_completion(&mut self) {
        match self {
            AgentKind::Scanner { cells_scanned } => *cells_scanned += 1,
            AgentKind::Collector { cells_collected } => *cells_collected += 1,
            AgentKind::Finisher { cells_finished } => *cells_finished += 1,
        }
    }
}

/// Injected misbehavior for exercising the failure paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    /// Faults on the first move and never arrives anywhere.
    Immobile,
    /// Arrives normally but every unit of work reports failure.
    WorkFails,
}

#[derive(Clone, Debug)]
pub struct Agent {
    id: AgentId,
    label: String,
    kind: AgentKind,
    state: ActivityState,
    position: Position,
    fault: Option<Fault>,
}

impl Agent {
    /// Build an idle agent with a freshly allocated id.
    pub fn new(
        ids: &mut IdAllocator,
        label: impl Into<String>,
        role: Role,
        position: Position,
    ) -> Self {
        Self {
            id: ids.next_id(),
            label: label.into(),
            kind: AgentKind::for_role(role),
            state: ActivityState::Idle,
            position,
            fault: None,
        }
    }

    pub fn relabel(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn role(&self) -> Role {
        self.kind.role()
    }

    pub fn kind(&self) -> &AgentKind {
        &self.kind
    }

    pub fn state(&self) -> ActivityState {
        self.state
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_idle(&self) -> bool {
        self.state == ActivityState::Idle
    }

    /// Overwrite the last known position (registry bookkeeping only).
    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Apply a command addressed to this agent and return what it publishes.
    /// Commands addressed elsewhere produce nothing.
    pub fn handle(&mut self, command: &Command) -> Vec<Event> {
        if command.target() != self.id {
            return Vec::new();
        }
        match command {
            Command::Move { destination, .. } => self.move_to(*destination),
            Command::StartWork { kind, .. } => self.start_work(*kind),
            Command::Stop { .. } => self.stop(),
        }
    }

    fn move_to(&mut self, destination: Position) -> Vec<Event> {
        if !matches!(self.state, ActivityState::Idle | ActivityState::Arrived) {
            debug!(agent = %self.label, state = ?self.state, "busy, ignoring move");
            return vec![self.status()];
        }
        if self.fault == Some(Fault::Immobile) {
            self.state = ActivityState::Faulted;
            return vec![self.status()];
        }
        self.state = ActivityState::Moving;
        self.position = destination;
        self.state = ActivityState::Arrived;
        vec![self.status()]
    }

    fn start_work(&mut self, kind: WorkKind) -> Vec<Event> {
        if !matches!(self.state, ActivityState::Idle | ActivityState::Arrived) {
            debug!(agent = %self.label, state = ?self.state, "busy, ignoring work");
            return vec![self.status()];
        }
        self.state = ActivityState::Working;
        let success = kind == self.role().work_kind() && self.fault != Some(Fault::WorkFails);
        if success {
            self.kind.record_completion();
        }
        self.state = ActivityState::Idle;
        vec![
            Event::WorkCompleted {
                agent: self.id,
                kind,
                position: self.position,
                success,
            },
            self.status(),
        ]
    }

    fn stop(&mut self) -> Vec<Event> {
        if self.state != ActivityState::Faulted {
            self.state = ActivityState::Idle;
        }
        vec![self.status()]
    }

    fn status(&self) -> Event {
        Event::StatusChanged {
            agent: self.id,
            role: self.role(),
            state: self.state,
            position: self.position,
        }
    }
}
