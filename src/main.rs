use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use grid_sweep::config::SimConfig;
use grid_sweep::control_loop::RunOutcome;
use grid_sweep::error::Result;
use grid_sweep::logging;
use grid_sweep::sim::{self, BenchParams};

#[derive(Parser)]
#[command(name = "grid_sweep", version, about = "Grid-cleaning fleet simulation")]
struct Cli {
    /// TOML file with registry and run settings
    #[arg(short, long, global = true, env = "GRID_SWEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the built-in demo fleet (default)
    Demo,

    /// Run a scenario file; exits 2 if the run stalls
    Run {
        /// Scenario TOML with [grid] and [[agents]]
        scenario: PathBuf,
    },

    /// Run one generated grid and print a CSV row
    Bench {
        #[arg(long, default_value_t = 20)]
        width: i32,
        #[arg(long, default_value_t = 20)]
        height: i32,
        /// Fraction of cells seeded as contaminated
        #[arg(long, default_value_t = 0.1)]
        density: f64,
        #[arg(long, default_value_t = 2)]
        scanners: usize,
        #[arg(long, default_value_t = 2)]
        collectors: usize,
        #[arg(long, default_value_t = 1)]
        finishers: usize,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        /// Report duplicate tasks and unexpected leftovers on stderr
        #[arg(long)]
        validate: bool,
        /// Make the first collector fail all of its work
        #[arg(long)]
        faulty: bool,
    },

    /// Sweep grid sizes against fleet sizes and print CSV rows
    Stress {
        /// Square grid edge lengths, comma-separated
        #[arg(long, value_delimiter = ',', default_values_t = [10, 20, 40])]
        sizes: Vec<i32>,
        /// Agents per role, comma-separated
        #[arg(long, value_delimiter = ',', default_values_t = [1, 2, 4])]
        fleets: Vec<usize>,
        #[arg(long, default_value_t = 0.1)]
        density: f64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        #[arg(long)]
        validate: bool,
        #[arg(long)]
        faulty: bool,
    },
}

fn outcome_code(outcome: RunOutcome) -> ExitCode {
    match outcome {
        RunOutcome::Completed => ExitCode::SUCCESS,
        RunOutcome::Stalled => ExitCode::from(2),
    }
}

fn execute(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    match cli.command.unwrap_or(Commands::Demo) {
        Commands::Demo => {
            sim::run_demo(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { scenario } => {
            let report = sim::run_scenario(&scenario, &config)?;
            Ok(outcome_code(report.outcome))
        }
        Commands::Bench {
            width,
            height,
            density,
            scanners,
            collectors,
            finishers,
            seed,
            validate,
            faulty,
        } => {
            let params = BenchParams {
                width,
                height,
                density,
                scanners,
                collectors,
                finishers,
                seed,
                faulty,
            };
            sim::run_benchmark(&params, &config, validate)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Stress {
            sizes,
            fleets,
            density,
            seed,
            validate,
            faulty,
        } => {
            let base = BenchParams {
                density,
                seed,
                faulty,
                ..BenchParams::default()
            };
            sim::run_stress(&sizes, &fleets, &base, &config, validate)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = logging::init(cli.verbose) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }
    match execute(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
