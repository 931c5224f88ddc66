//! Headless skirmish runner.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario and print the JSON summary
//! cargo run -p skirmish_headless -- run --scenario scenarios/outpost.ron
//!
//! # Override the tick budget, with debug logs
//! cargo run -p skirmish_headless -- run --scenario scenarios/outpost.ron --ticks 2400 --verbose
//!
//! # Print A* waypoints for a ground unit
//! cargo run -p skirmish_headless -- path --scenario scenarios/outpost.ron --from 40,256 --to 470,256
//! ```
//!
//! Output (stdout): JSON
//! Logs (stderr): controlled by `RUST_LOG`, default `info`

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skirmish_headless::{plan_path, run_scenario, Scenario, ScenarioError};

#[derive(Parser)]
#[command(name = "skirmish_headless")]
#[command(about = "Headless combat simulation runner")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print a JSON summary
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Ticks to simulate (defaults to the scenario's own budget)
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Print the A* waypoints between two points of a scenario map
    Path {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Start point as `x,y`
        #[arg(long, value_parser = parse_point)]
        from: (i32, i32),

        /// Goal point as `x,y`
        #[arg(long, value_parser = parse_point)]
        to: (i32, i32),

        /// Unit radius
        #[arg(long, default_value = "4")]
        radius: i32,
    },
}

fn parse_point(s: &str) -> Result<(i32, i32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{s}'"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in '{s}': {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in '{s}': {e}"))?;
    Ok((x, y))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for results
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Run { scenario, ticks } => cmd_run(&scenario, ticks),
        Commands::Path {
            scenario,
            from,
            to,
            radius,
        } => cmd_path(&scenario, from, to, radius),
    };

    match result {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Run a scenario to completion
fn cmd_run(path: &Path, ticks: Option<u64>) -> Result<String, ScenarioError> {
    let scenario = Scenario::load(path)?;
    let report = run_scenario(&scenario, ticks)?;
    Ok(to_json(&report))
}

/// Plan a ground path on a scenario map
fn cmd_path(
    path: &Path,
    from: (i32, i32),
    to: (i32, i32),
    radius: i32,
) -> Result<String, ScenarioError> {
    let scenario = Scenario::load(path)?;
    let waypoints = plan_path(&scenario, from, to, radius)?;
    Ok(to_json(&waypoints))
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}
