//! Headless scenario runner for CI smoke runs and balance checks.
//!
//! Loads a RON [`Scenario`], runs the fixed-step combat simulation with the
//! reference physics world and summarises the outcome as JSON.
//!
//! - **stdout**: JSON results
//! - **stderr**: logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! cargo run -p skirmish_headless -- run --scenario scenarios/outpost.ron --ticks 1200
//! cargo run -p skirmish_headless -- path --scenario scenarios/outpost.ron --from 40,256 --to 470,256
//! ```

pub mod runner;
pub mod scenario;

pub use runner::{plan_path, run_scenario, HeadlessRunner, RunReport};
pub use scenario::{Scenario, ScenarioError};
