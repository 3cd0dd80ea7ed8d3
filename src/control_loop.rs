//! Orchestrator: drives scanners along their paths and turns discovered
//! contamination into a Collect -> Finish task pipeline.
//!
//! Each tick tries three fronts in order: advance every scanner one cell,
//! dispatch the Collect queue, dispatch the Finish queue. Dispatch is
//! event-driven: the agent is sent a `Move`, and only an `Arrived` status at
//! the target earns it the `StartWork`. Every command is followed by a full
//! drain of the bus before the next decision.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::bus::{Command, Event, EventBus};
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::grid_map::GridMap;
use crate::planner::Planner;
use crate::registry::SpatialRegistry;
use crate::task_queue::StageQueue;
use crate::types::{ActivityState, AgentId, Position, Role, Stage, Task, WorkKind};

/// Bootstrap input: grid size and the seeded contamination.
#[derive(Debug, Clone, Default)]
pub struct BootstrapFeed {
    pub width: i32,
    pub height: i32,
    pub contaminated: Vec<Position>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanPhase {
    NotStarted,
    Advancing,
    ReturningToOrigin,
    Finished,
}

#[derive(Debug)]
struct ScanCursor {
    agent: AgentId,
    label: String,
    path: Vec<Position>,
    next: usize,
    phase: ScanPhase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AssignmentPhase {
    AwaitingArrival,
    Working,
}

#[derive(Clone, Copy, Debug)]
struct PendingAssignment {
    task: Task,
    phase: AssignmentPhase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// All scanners finished and both queues drained.
    Completed,
    /// A full tick made no progress on any front.
    Stalled,
}

/// Which fronts moved during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickProgress {
    pub scanned: bool,
    pub collect_dispatched: bool,
    pub finish_dispatched: bool,
}

impl TickProgress {
    pub fn any(&self) -> bool {
        self.scanned || self.collect_dispatched || self.finish_dispatched
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageStats {
    pub created: u64,
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
    pub stale_dropped: u64,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub ticks: u64,
    pub collect: StageStats,
    pub finish: StageStats,
    /// Cells not Clean when the run ended.
    pub cells_remaining: usize,
    created: HashMap<(Position, Stage), u32>,
}

impl RunReport {
    /// How many tasks of `stage` were ever created for `cell`.
    pub fn tasks_created(&self, cell: Position, stage: Stage) -> u32 {
        self.created.get(&(cell, stage)).copied().unwrap_or(0)
    }

    /// True if any cell ever had two tasks created for the same stage.
    pub fn duplicate_tasks(&self) -> bool {
        self.created.values().any(|&count| count > 1)
    }

    pub fn failed_tasks(&self) -> u64 {
        self.collect.failed + self.finish.failed
    }

    pub fn all_clean(&self) -> bool {
        self.cells_remaining == 0
    }
}

/// Queue and in-flight contents at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSnapshot {
    pub collect_queued: Vec<Position>,
    pub collect_in_flight: Vec<Position>,
    pub finish_queued: Vec<Position>,
    pub finish_in_flight: Vec<Position>,
}

pub struct ControlLoop {
    registry: SpatialRegistry,
    map: GridMap,
    planner: Planner,
    bus: EventBus,
    config: SimConfig,

    scanners: Vec<ScanCursor>,
    collect: StageQueue,
    finish: StageQueue,
    pending: HashMap<AgentId, PendingAssignment>,

    ticks: u64,
    collect_stats: StageStats,
    finish_stats: StageStats,
    created: HashMap<(Position, Stage), u32>,
}

impl ControlLoop {
    pub fn new(registry: SpatialRegistry, config: SimConfig) -> Self {
        Self {
            registry,
            map: GridMap::new(),
            planner: Planner::new(),
            bus: EventBus::new(),
            config,
            scanners: Vec::new(),
            collect: StageQueue::new(Stage::Collect),
            finish: StageQueue::new(Stage::Finish),
            pending: HashMap::new(),
            ticks: 0,
            collect_stats: StageStats::default(),
            finish_stats: StageStats::default(),
            created: HashMap::new(),
        }
    }

    /// Initialize the grid and the planner from bootstrap input.
    pub fn seed_from(&mut self, feed: &BootstrapFeed) -> Result<()> {
        self.map
            .initialize(feed.width, feed.height, &feed.contaminated)?;
        self.planner.configure(feed.width, feed.height);
        info!(
            width = feed.width,
            height = feed.height,
            contaminated = self.map.remaining(),
            "grid seeded"
        );
        Ok(())
    }

    pub fn registry(&self) -> &SpatialRegistry {
        &self.registry
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn scanner_phases(&self) -> Vec<ScanPhase> {
        self.scanners.iter().map(|cursor| cursor.phase).collect()
    }

    /// Run ticks until the pipeline completes or stalls.
    pub fn run(&mut self) -> Result<RunReport> {
        self.start()?;
        let outcome = loop {
            let progress = self.tick();
            if self.is_done() {
                break RunOutcome::Completed;
            }
            if !progress.any() {
                warn!(tick = self.ticks, "run loop made no progress; aborting");
                break RunOutcome::Stalled;
            }
        };
        let report = self.report(outcome);
        info!(
            outcome = ?report.outcome,
            ticks = report.ticks,
            remaining = report.cells_remaining,
            failed = report.failed_tasks(),
            "run finished"
        );
        Ok(report)
    }

    /// Validate the setup, build scan plans, and reset per-run state.
    pub fn start(&mut self) -> Result<()> {
        if !self.planner.is_configured() {
            return Err(SimError::PlannerNotConfigured);
        }
        let scanners = self.registry.by_role(Role::Scanner);
        if scanners.is_empty() {
            return Err(SimError::NoScanners);
        }
        let plans = self.planner.build_scan_plans(scanners.len());
        if plans.len() != scanners.len() {
            return Err(SimError::PlanMismatch {
                expected: scanners.len(),
                got: plans.len(),
            });
        }

        self.scanners = scanners
            .iter()
            .zip(plans)
            .map(|(agent, path)| ScanCursor {
                agent: agent.id(),
                label: agent.label().to_string(),
                path,
                next: 0,
                phase: ScanPhase::NotStarted,
            })
            .collect();
        self.collect.clear();
        self.finish.clear();
        self.pending.clear();
        self.ticks = 0;
        self.collect_stats = StageStats::default();
        self.finish_stats = StageStats::default();
        self.created.clear();
        Ok(())
    }

    /// One pass over all three fronts.
    pub fn tick(&mut self) -> TickProgress {
        self.ticks += 1;
        let scanned = self.advance_scanners();
        let collect_dispatched = self.dispatch(Stage::Collect);
        let finish_dispatched = self.dispatch(Stage::Finish);
        TickProgress {
            scanned,
            collect_dispatched,
            finish_dispatched,
        }
    }

    pub fn is_done(&self) -> bool {
        self.scanners
            .iter()
            .all(|cursor| cursor.phase == ScanPhase::Finished)
            && self.collect.is_empty()
            && self.finish.is_empty()
            && self.pending.is_empty()
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        let in_flight = |stage: Stage| -> Vec<Position> {
            self.pending
                .values()
                .filter(|assignment| assignment.task.stage == stage)
                .map(|assignment| assignment.task.cell)
                .collect()
        };
        PipelineSnapshot {
            collect_queued: self.collect.queued(),
            collect_in_flight: in_flight(Stage::Collect),
            finish_queued: self.finish.queued(),
            finish_in_flight: in_flight(Stage::Finish),
        }
    }

    pub fn report(&self, outcome: RunOutcome) -> RunReport {
        RunReport {
            outcome,
            ticks: self.ticks,
            collect: self.collect_stats,
            finish: self.finish_stats,
            cells_remaining: self.map.remaining(),
            created: self.created.clone(),
        }
    }

    fn advance_scanners(&mut self) -> bool {
        let mut progressed = false;
        for idx in 0..self.scanners.len() {
            progressed |= self.advance_scanner(idx);
        }
        progressed
    }

    fn advance_scanner(&mut self, idx: usize) -> bool {
        let cursor = &mut self.scanners[idx];
        match cursor.phase {
            ScanPhase::Finished => return false,
            ScanPhase::NotStarted => {
                info!(agent = %cursor.label, cells = cursor.path.len(), "start scan");
                cursor.phase = ScanPhase::Advancing;
            }
            ScanPhase::Advancing | ScanPhase::ReturningToOrigin => {}
        }

        let agent = cursor.agent;
        if cursor.phase == ScanPhase::Advancing {
            if let Some(&cell) = cursor.path.get(cursor.next) {
                cursor.next += 1;
                self.scan_cell(idx, agent, cell);
                return true;
            }
            cursor.phase = ScanPhase::ReturningToOrigin;
        }

        let origin = self.config.run.origin;
        if self.position_of(agent) != Some(origin) {
            self.command(Command::Move {
                target: agent,
                destination: origin,
            });
        }
        self.command(Command::Stop { target: agent });
        let cursor = &mut self.scanners[idx];
        cursor.phase = ScanPhase::Finished;
        info!(agent = %cursor.label, "scan finished");
        true
    }

    fn scan_cell(&mut self, idx: usize, agent: AgentId, cell: Position) {
        if self.position_of(agent) != Some(cell) {
            self.command(Command::Move {
                target: agent,
                destination: cell,
            });
        }

        let arrived = self
            .registry
            .by_id(agent)
            .is_some_and(|a| a.position() == cell && a.state() != ActivityState::Faulted);
        if !arrived {
            let cursor = &mut self.scanners[idx];
            warn!(agent = %cursor.label, %cell, "scanner lost; abandoning its path");
            cursor.phase = ScanPhase::Finished;
            return;
        }

        self.command(Command::StartWork {
            target: agent,
            kind: WorkKind::Scan,
        });

        if self.map.is_contaminated(cell) && self.enqueue(Stage::Collect, cell) {
            info!(agent = %self.scanners[idx].label, %cell, "contamination detected");
        }
    }

    /// Dispatch as much of one queue as idle agents allow. Stops at the
    /// first task nobody can take, leaving it at the front.
    fn dispatch(&mut self, stage: Stage) -> bool {
        let radius = self.config.registry.search_radius;
        let mut dispatched = false;

        while let Some(task) = self.queue(stage).front() {
            if !self.still_required(task) {
                self.queue_mut(stage).pop_front();
                self.queue_mut(stage).release(task.cell);
                self.stats_mut(stage).stale_dropped += 1;
                debug!(%stage, cell = %task.cell, "dropping stale task");
                continue;
            }

            let Some(agent) = self
                .registry
                .find_nearest_idle(stage.role(), task.cell, radius)
            else {
                debug!(%stage, cell = %task.cell, "no idle agent; task stays queued");
                break;
            };

            self.assign(task, &agent);
            self.drain();
            dispatched = true;
        }

        dispatched
    }

    /// Move the front task of its stage into the pending table and send the
    /// agent on its way. The resulting events stay on the bus.
    fn assign(&mut self, task: Task, agent: &Agent) {
        self.queue_mut(task.stage).pop_front();
        let previous = self.pending.insert(
            agent.id(),
            PendingAssignment {
                task,
                phase: AssignmentPhase::AwaitingArrival,
            },
        );
        debug_assert!(previous.is_none(), "agent assigned twice");
        self.stats_mut(task.stage).dispatched += 1;
        info!(agent = %agent.label(), stage = %task.stage, cell = %task.cell, "task dispatched");

        self.bus.send(
            &self.registry,
            Command::Move {
                target: agent.id(),
                destination: task.cell,
            },
        );
    }

    fn enqueue(&mut self, stage: Stage, cell: Position) -> bool {
        if !self.queue_mut(stage).push(cell) {
            return false;
        }
        self.stats_mut(stage).created += 1;
        *self.created.entry((cell, stage)).or_insert(0) += 1;
        true
    }

    fn still_required(&self, task: Task) -> bool {
        match task.stage {
            Stage::Collect => self.map.is_contaminated(task.cell),
            Stage::Finish => self.map.needs_finishing(task.cell),
        }
    }

    /// Send a command and drain every event it causes, including events
    /// from follow-up commands issued while handling them.
    fn command(&mut self, command: Command) {
        self.bus.send(&self.registry, command);
        self.drain();
    }

    fn drain(&mut self) {
        while let Some(event) = self.bus.poll() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::StatusChanged {
                agent,
                state,
                position,
                ..
            } => self.on_status(agent, state, position),
            Event::WorkCompleted {
                agent,
                kind,
                success,
                ..
            } => self.on_work_completed(agent, kind, success),
        }
    }

    fn on_status(&mut self, agent: AgentId, state: ActivityState, position: Position) {
        let Some(assignment) = self.pending.get_mut(&agent) else {
            return;
        };
        if assignment.phase != AssignmentPhase::AwaitingArrival {
            return;
        }

        let task = assignment.task;
        if state == ActivityState::Arrived && position == task.cell {
            assignment.phase = AssignmentPhase::Working;
            self.bus.send(
                &self.registry,
                Command::StartWork {
                    target: agent,
                    kind: task.stage.work_kind(),
                },
            );
        } else {
            warn!(agent, ?state, cell = %task.cell, "agent did not arrive; dropping task");
            self.settle(agent, task, false);
        }
    }

    fn on_work_completed(&mut self, agent: AgentId, kind: WorkKind, success: bool) {
        let Some(assignment) = self.pending.get(&agent) else {
            return;
        };
        if assignment.phase != AssignmentPhase::Working || assignment.task.stage.work_kind() != kind
        {
            return;
        }
        let task = assignment.task;
        if !success {
            warn!(agent, stage = %task.stage, cell = %task.cell, "work failed; dropping task");
        }
        self.settle(agent, task, success);
    }

    /// Close out a pending assignment and push any follow-on work.
    fn settle(&mut self, agent: AgentId, task: Task, success: bool) {
        self.pending.remove(&agent);
        self.queue_mut(task.stage).release(task.cell);

        if success {
            let applied = match task.stage {
                Stage::Collect => self.map.mark_collected(task.cell),
                Stage::Finish => self.map.mark_finished(task.cell),
            };
            if applied {
                self.stats_mut(task.stage).completed += 1;
                info!(agent, stage = %task.stage, cell = %task.cell, "task completed");
            } else {
                debug!(agent, stage = %task.stage, cell = %task.cell, "cell already past stage");
            }
            if task.stage == Stage::Collect
                && self.map.needs_finishing(task.cell)
                && self.enqueue(Stage::Finish, task.cell)
            {
                debug!(cell = %task.cell, "finish task queued");
            }
        } else {
            self.stats_mut(task.stage).failed += 1;
        }

        self.bus.send(&self.registry, Command::Stop { target: agent });
    }

    fn position_of(&self, agent: AgentId) -> Option<Position> {
        self.registry.by_id(agent).map(|a| a.position())
    }

    fn queue(&self, stage: Stage) -> &StageQueue {
        match stage {
            Stage::Collect => &self.collect,
            Stage::Finish => &self.finish,
        }
    }

    fn queue_mut(&mut self, stage: Stage) -> &mut StageQueue {
        match stage {
            Stage::Collect => &mut self.collect,
            Stage::Finish => &mut self.finish,
        }
    }

    fn stats_mut(&mut self, stage: Stage) -> &mut StageStats {
        match stage {
            Stage::Collect => &mut self.collect_stats,
            Stage::Finish => &mut self.finish_stats,
        }
    }
}

impl std::fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("registry", &self.registry)
            .field("ticks", &self.ticks)
            .field("scanners", &self.scanners.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Fault;
    use crate::grid_map::CellState;
    use crate::types::IdAllocator;

    fn p(x: i32, y: i32) -> Position {
        Position::new(x, y)
    }

    fn fleet(roles: &[(Role, i32, i32)]) -> SpatialRegistry {
        let registry = SpatialRegistry::new();
        let mut ids = IdAllocator::new();
        for (n, (role, x, y)) in roles.iter().enumerate() {
            registry.register(Agent::new(&mut ids, format!("{role}-{n}"), *role, p(*x, *y)));
        }
        registry
    }

    fn seeded(registry: SpatialRegistry, width: i32, height: i32, dirt: &[Position]) -> ControlLoop {
        let mut cu = ControlLoop::new(registry, SimConfig::default());
        cu.seed_from(&BootstrapFeed {
            width,
            height,
            contaminated: dirt.to_vec(),
        })
        .expect("valid feed");
        cu
    }

    #[test]
    fn run_without_seed_is_a_configuration_error() {
        let mut cu = ControlLoop::new(fleet(&[(Role::Scanner, 0, 0)]), SimConfig::default());
        assert!(matches!(cu.run(), Err(SimError::PlannerNotConfigured)));
    }

    #[test]
    fn run_without_scanners_is_a_configuration_error() {
        let mut cu = seeded(fleet(&[(Role::Collector, 0, 0)]), 3, 3, &[p(1, 1)]);
        assert!(matches!(cu.run(), Err(SimError::NoScanners)));
    }

    #[test]
    fn invalid_feed_is_rejected() {
        let mut cu = ControlLoop::new(fleet(&[(Role::Scanner, 0, 0)]), SimConfig::default());
        let err = cu.seed_from(&BootstrapFeed {
            width: 2,
            height: 2,
            contaminated: vec![p(2, 0)],
        });
        assert!(matches!(err, Err(SimError::SeedOutOfBounds { .. })));
        assert!(matches!(cu.run(), Err(SimError::PlannerNotConfigured)));
    }

    #[test]
    fn full_fleet_cleans_every_cell() {
        let registry = fleet(&[
            (Role::Scanner, 0, 0),
            (Role::Collector, 2, 2),
            (Role::Finisher, 0, 2),
        ]);
        let mut cu = seeded(registry, 3, 3, &[p(1, 1), p(2, 0)]);
        let report = cu.run().expect("run starts");
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert!(report.all_clean());
        assert_eq!(report.collect.completed, 2);
        assert_eq!(report.finish.completed, 2);
        assert_eq!(cu.scanner_phases(), vec![ScanPhase::Finished]);
    }

    #[test]
    fn scanner_returns_to_origin() {
        let registry = fleet(&[(Role::Scanner, 0, 0)]);
        let scanner = registry.by_role(Role::Scanner)[0].id();
        let mut cu = seeded(registry, 2, 2, &[]);
        cu.run().expect("run starts");
        let agent = cu.registry().by_id(scanner).expect("scanner registered");
        assert_eq!(agent.position(), p(0, 0));
        assert_eq!(agent.state(), ActivityState::Idle);
        assert_eq!(agent.kind().completed(), 4);
    }

    #[test]
    fn missing_collectors_stall_the_run() {
        let registry = fleet(&[(Role::Scanner, 0, 0), (Role::Finisher, 0, 0)]);
        let mut cu = seeded(registry, 3, 3, &[p(1, 1)]);
        let report = cu.run().expect("run starts");
        assert_eq!(report.outcome, RunOutcome::Stalled);
        assert!(cu.map().is_contaminated(p(1, 1)));
        assert_eq!(report.tasks_created(p(1, 1), Stage::Finish), 0);
        assert_eq!(cu.snapshot().collect_queued, vec![p(1, 1)]);
    }

    #[test]
    fn failed_work_is_dropped_without_retry() {
        let registry = SpatialRegistry::new();
        let mut ids = IdAllocator::new();
        registry.register(Agent::new(&mut ids, "s1", Role::Scanner, p(0, 0)));
        registry.register(
            Agent::new(&mut ids, "c1", Role::Collector, p(0, 0)).with_fault(Fault::WorkFails),
        );
        registry.register(Agent::new(&mut ids, "f1", Role::Finisher, p(0, 0)));

        let mut cu = seeded(registry, 3, 3, &[p(1, 1)]);
        let report = cu.run().expect("run starts");
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.collect.failed, 1);
        assert_eq!(report.tasks_created(p(1, 1), Stage::Collect), 1);
        assert_eq!(report.tasks_created(p(1, 1), Stage::Finish), 0);
        assert!(cu.map().is_contaminated(p(1, 1)));
    }

    #[test]
    fn non_arrival_counts_as_failure() {
        let registry = SpatialRegistry::new();
        let mut ids = IdAllocator::new();
        registry.register(Agent::new(&mut ids, "s1", Role::Scanner, p(0, 0)));
        registry.register(
            Agent::new(&mut ids, "c1", Role::Collector, p(0, 0)).with_fault(Fault::Immobile),
        );
        registry.register(Agent::new(&mut ids, "f1", Role::Finisher, p(0, 0)));

        let mut cu = seeded(registry, 2, 2, &[p(1, 0), p(1, 1)]);
        let report = cu.run().expect("run starts");
        // The first dispatch faults the only collector; the second cell
        // then waits forever for an idle collector.
        assert_eq!(report.collect.failed, 1);
        assert_eq!(report.outcome, RunOutcome::Stalled);
        assert!(!report.all_clean());
    }

    #[test]
    fn lost_scanner_abandons_its_path() {
        let registry = SpatialRegistry::new();
        let mut ids = IdAllocator::new();
        registry.register(
            Agent::new(&mut ids, "s1", Role::Scanner, p(0, 0)).with_fault(Fault::Immobile),
        );
        let mut cu = seeded(registry, 3, 1, &[p(2, 0)]);
        let report = cu.run().expect("run starts");
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.collect.created, 0);
        assert_eq!(cu.scanner_phases(), vec![ScanPhase::Finished]);
    }

    #[test]
    fn pending_cell_cannot_be_requeued_until_it_settles() {
        let registry = fleet(&[
            (Role::Scanner, 0, 0),
            (Role::Collector, 2, 2),
            (Role::Finisher, 0, 2),
        ]);
        let mut cu = seeded(registry, 3, 3, &[p(1, 1)]);
        cu.start().expect("start");
        assert!(cu.enqueue(Stage::Collect, p(1, 1)));

        let task = cu.collect.front().expect("task queued");
        let agent = cu
            .registry
            .find_nearest_idle(Role::Collector, task.cell, cu.config.registry.search_radius)
            .expect("idle collector");
        cu.assign(task, &agent);

        // Move sent, arrival not handled yet.
        let snap = cu.snapshot();
        assert_eq!(snap.collect_in_flight, vec![p(1, 1)]);
        assert!(snap.collect_queued.is_empty());
        assert!(!cu.enqueue(Stage::Collect, p(1, 1)));

        // Arrival handled alone: StartWork is out, its result still queued.
        let arrival = cu.bus.poll().expect("arrival event");
        cu.handle_event(arrival);
        assert_eq!(
            cu.pending.get(&agent.id()).map(|a| a.phase),
            Some(AssignmentPhase::Working)
        );
        assert!(!cu.enqueue(Stage::Collect, p(1, 1)));
        let snap = cu.snapshot();
        assert_eq!(snap.collect_in_flight, vec![p(1, 1)]);
        assert!(snap.collect_queued.is_empty());

        cu.drain();
        let snap = cu.snapshot();
        assert!(snap.collect_in_flight.is_empty());
        assert_eq!(snap.finish_queued, vec![p(1, 1)]);
        assert_eq!(cu.map().state(p(1, 1)), Some(CellState::PartiallyTreated));
        let report = cu.report(RunOutcome::Completed);
        assert_eq!(report.tasks_created(p(1, 1), Stage::Collect), 1);
    }

    #[test]
    fn unbounded_search_radius_still_stalls_promptly() {
        let registry = SpatialRegistry::new();
        let mut ids = IdAllocator::new();
        registry.register(Agent::new(&mut ids, "s1", Role::Scanner, p(0, 0)));
        registry.register(
            Agent::new(&mut ids, "c1", Role::Collector, p(0, 0)).with_fault(Fault::Immobile),
        );
        registry.register(Agent::new(&mut ids, "f1", Role::Finisher, p(0, 0)));

        let mut config = SimConfig::default();
        config.registry.search_radius = u32::MAX;
        let mut cu = ControlLoop::new(registry, config);
        cu.seed_from(&BootstrapFeed {
            width: 3,
            height: 1,
            contaminated: vec![p(1, 0), p(2, 0)],
        })
        .expect("valid feed");

        let report = cu.run().expect("run starts");
        assert_eq!(report.outcome, RunOutcome::Stalled);
        assert_eq!(report.collect.failed, 1);
        assert_eq!(cu.snapshot().collect_queued, vec![p(2, 0)]);
    }

    #[test]
    fn scanners_return_to_configured_origin() {
        let registry = fleet(&[
            (Role::Scanner, 0, 0),
            (Role::Scanner, 0, 0),
            (Role::Collector, 1, 1),
            (Role::Finisher, 1, 1),
        ]);
        let scanners: Vec<_> = registry.by_role(Role::Scanner).iter().map(Agent::id).collect();

        let mut config = SimConfig::default();
        config.run.origin = p(2, 1);
        let mut cu = ControlLoop::new(registry, config);
        cu.seed_from(&BootstrapFeed {
            width: 3,
            height: 3,
            contaminated: vec![p(0, 2)],
        })
        .expect("valid feed");

        let report = cu.run().expect("run starts");
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert!(report.all_clean());
        for id in scanners {
            let scanner = cu.registry().by_id(id).expect("scanner registered");
            assert_eq!(scanner.position(), p(2, 1));
            assert_eq!(scanner.state(), ActivityState::Idle);
        }
    }

    #[test]
    fn tick_reports_progress_per_front() {
        let registry = fleet(&[
            (Role::Scanner, 0, 0),
            (Role::Collector, 0, 0),
            (Role::Finisher, 0, 0),
        ]);
        let mut cu = seeded(registry, 2, 1, &[p(0, 0)]);
        cu.start().expect("start");
        let first = cu.tick();
        assert_eq!(
            first,
            TickProgress {
                scanned: true,
                collect_dispatched: true,
                finish_dispatched: true,
            }
        );
        assert!(cu.map().is_all_clean());
        assert!(!cu.is_done());
    }
}
