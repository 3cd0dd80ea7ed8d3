//! Demo, scenario, benchmark, and stress-test runners for grid_sweep.

use std::path::Path;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::agent::{Agent, Fault};
use crate::config::SimConfig;
use crate::control_loop::{BootstrapFeed, ControlLoop, RunOutcome, RunReport};
use crate::error::Result;
use crate::registry::SpatialRegistry;
use crate::scenario::{Scenario, feed_covering};
use crate::types::{IdAllocator, Position, Role};

const BENCH_HEADER: &str = "width,height,scanners,collectors,finishers,contaminated,elapsed_ms,ticks,collect_tasks,finish_tasks,failed_tasks,cpu_user_s,cpu_sys_s,outcome,cells_remaining";

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    // SAFETY: `rusage` is plain old data; all-zero is a valid value and
    // getrusage only writes into the struct we hand it.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let seconds = |tv: libc::timeval| tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0;
    Some((seconds(usage.ru_utime), seconds(usage.ru_stime)))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// Fleet and grid shape for one generated run.
#[derive(Debug, Clone)]
pub struct BenchParams {
    pub width: i32,
    pub height: i32,
    /// Fraction of cells seeded as contaminated.
    pub density: f64,
    pub scanners: usize,
    pub collectors: usize,
    pub finishers: usize,
    pub seed: u64,
    /// Make the first collector fail every unit of work.
    pub faulty: bool,
}

impl Default for BenchParams {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            density: 0.1,
            scanners: 2,
            collectors: 2,
            finishers: 1,
            seed: 7,
            faulty: false,
        }
    }
}

/// Aggregated metrics from a single benchmark run.
struct BenchResult {
    params: BenchParams,
    contaminated: usize,
    elapsed_ms: f64,
    cpu_user_s: Option<f64>,
    cpu_sys_s: Option<f64>,
    report: RunReport,
}

impl BenchResult {
    fn csv_row(&self) -> String {
        let cpu = |v: Option<f64>| v.map(|v| format!("{v:.4}")).unwrap_or_else(|| "NA".to_string());
        format!(
            "{},{},{},{},{},{},{:.2},{},{},{},{},{},{},{},{}",
            self.params.width,
            self.params.height,
            self.params.scanners,
            self.params.collectors,
            self.params.finishers,
            self.contaminated,
            self.elapsed_ms,
            self.report.ticks,
            self.report.collect.created,
            self.report.finish.created,
            self.report.failed_tasks(),
            cpu(self.cpu_user_s),
            cpu(self.cpu_sys_s),
            outcome_label(self.report.outcome),
            self.report.cells_remaining
        )
    }

    /// Print violations of the pipeline guarantees to stderr.
    fn report_violations(&self) {
        if self.report.duplicate_tasks() {
            eprintln!("# violation,duplicate_tasks");
        }
        if self.report.failed_tasks() == 0 && !self.report.all_clean() {
            eprintln!("# violation,cells_left_dirty,{}", self.report.cells_remaining);
        }
    }
}

fn outcome_label(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Completed => "completed",
        RunOutcome::Stalled => "stalled",
    }
}

/// Evenly spread `count` agents of `role` along the grid's middle row.
fn spread(
    registry: &SpatialRegistry,
    ids: &mut IdAllocator,
    role: Role,
    count: usize,
    width: i32,
    height: i32,
) -> Vec<Agent> {
    (0..count)
        .map(|n| {
            let x = ((n as i64 * i64::from(width)) / count.max(1) as i64) as i32;
            let agent = Agent::new(ids, format!("{role}-{n}"), role, Position::new(x, height / 2));
            registry.register(agent.clone());
            agent
        })
        .collect()
}

fn generated_feed(params: &BenchParams) -> BootstrapFeed {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut contaminated = Vec::new();
    for y in 0..params.height {
        for x in 0..params.width {
            if rng.random_bool(params.density.clamp(0.0, 1.0)) {
                contaminated.push(Position::new(x, y));
            }
        }
    }
    BootstrapFeed {
        width: params.width,
        height: params.height,
        contaminated,
    }
}

fn benchmark_once(params: &BenchParams, config: &SimConfig) -> Result<BenchResult> {
    let registry = SpatialRegistry::with_bucket_size(config.registry.bucket_size);
    let mut ids = IdAllocator::new();
    for n in 0..params.scanners {
        registry.register(Agent::new(
            &mut ids,
            format!("scanner-{n}"),
            Role::Scanner,
            config.run.origin,
        ));
    }
    let collectors = spread(
        &registry,
        &mut ids,
        Role::Collector,
        params.collectors,
        params.width,
        params.height,
    );
    spread(
        &registry,
        &mut ids,
        Role::Finisher,
        params.finishers,
        params.width,
        params.height,
    );
    if params.faulty {
        if let Some(first) = collectors.first() {
            // Re-register the first collector with an injected fault.
            registry.remove(first.id());
            registry.register(first.clone().with_fault(Fault::WorkFails));
        }
    }

    let feed = generated_feed(params);
    let contaminated = feed.contaminated.len();
    let mut cu = ControlLoop::new(registry, config.clone());
    cu.seed_from(&feed)?;

    let cpu_start = cpu_times_seconds();
    let start = Instant::now();
    let report = cu.run()?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let (cpu_user_s, cpu_sys_s) = match (cpu_start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            (Some(user_end - user_start), Some(sys_end - sys_start))
        }
        _ => (None, None),
    };

    Ok(BenchResult {
        params: params.clone(),
        contaminated,
        elapsed_ms,
        cpu_user_s,
        cpu_sys_s,
        report,
    })
}

fn print_summary(title: &str, cu: &ControlLoop, report: &RunReport) {
    println!("{title}");
    println!("grid={}x{}", cu.map().width(), cu.map().height());
    println!("agents={}", cu.registry().len());
    println!("ticks={}", report.ticks);
    println!("outcome={}", outcome_label(report.outcome));
    println!("cells_remaining={}", report.cells_remaining);
    println!("collect_tasks={}", report.collect.created);
    println!("finish_tasks={}", report.finish.created);
    println!("failed_tasks={}", report.failed_tasks());
    println!("stale_dropped={}", report.collect.stale_dropped + report.finish.stale_dropped);
    let work: Vec<String> = cu
        .registry()
        .all()
        .iter()
        .map(|agent| format!("{}:{}", agent.label(), agent.kind().completed()))
        .collect();
    println!("work_per_agent=[{}]", work.join(","));
}

/// Run the default demo: two scanners, two collectors, one finisher, three
/// contaminated cells.
pub fn run_demo(config: &SimConfig) -> Result<RunReport> {
    info!("demo start");
    let registry = SpatialRegistry::with_bucket_size(config.registry.bucket_size);
    let mut ids = IdAllocator::new();
    let fleet = [
        ("d1", Role::Scanner, Position::new(4, 2)),
        ("d2", Role::Scanner, Position::new(3, 1)),
        ("v1", Role::Collector, Position::new(1, 0)),
        ("v2", Role::Collector, Position::new(5, 2)),
        ("w1", Role::Finisher, Position::new(2, 0)),
    ];
    for (label, role, position) in fleet {
        registry.register(Agent::new(&mut ids, label, role, position));
    }

    let feed = feed_covering(&[Position::new(3, 1), Position::new(4, 2), Position::new(5, 2)]);
    let mut cu = ControlLoop::new(registry, config.clone());
    cu.seed_from(&feed)?;
    let report = cu.run()?;
    print_summary("DEMO SUMMARY", &cu, &report);
    Ok(report)
}

/// Run a scenario file and print its summary.
pub fn run_scenario(path: &Path, config: &SimConfig) -> Result<RunReport> {
    let scenario = Scenario::load(path)?;
    let registry = scenario.build_registry(config.registry.bucket_size)?;
    let mut cu = ControlLoop::new(registry, config.clone());
    cu.seed_from(&scenario.feed())?;
    let report = cu.run()?;
    print_summary("SCENARIO SUMMARY", &cu, &report);
    Ok(report)
}

/// Run a single generated benchmark and print one CSV row.
pub fn run_benchmark(params: &BenchParams, config: &SimConfig, validate: bool) -> Result<()> {
    let result = benchmark_once(params, config)?;
    println!("{BENCH_HEADER}");
    println!("{}", result.csv_row());
    if validate {
        result.report_violations();
    }
    Ok(())
}

/// Sweep square grid sizes against fleet sizes (the same count for every
/// role) and print CSV output.
pub fn run_stress(
    sizes: &[i32],
    fleets: &[usize],
    base: &BenchParams,
    config: &SimConfig,
    validate: bool,
) -> Result<()> {
    let mut sizes: Vec<i32> = sizes.to_vec();
    let before = sizes.len();
    sizes.retain(|&size| size > 0);
    let dropped = before - sizes.len();
    if dropped > 0 {
        eprintln!("stress warning: ignored {dropped} grid size(s) <= 0");
    }

    println!("{BENCH_HEADER}");
    for &size in &sizes {
        for &fleet in fleets.iter().filter(|&&fleet| fleet > 0) {
            let params = BenchParams {
                width: size,
                height: size,
                scanners: fleet,
                collectors: fleet,
                finishers: fleet,
                ..base.clone()
            };
            let result = benchmark_once(&params, config)?;
            println!("{}", result.csv_row());
            if validate {
                result.report_violations();
            }
        }
    }
    Ok(())
}
