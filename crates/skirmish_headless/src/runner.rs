//! Fixed-step scenario runner.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use skirmish_core::components::{EntityId, TeamId, Tick};
use skirmish_core::events::{GameEvent, TickEvents};
use skirmish_core::math::{Fixed, Vec2Fixed};
use skirmish_core::simulation::{Simulation, TICK_RATE};

use crate::scenario::{Scenario, ScenarioError};

/// Summary of a finished run, printed as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Scenario name.
    pub scenario: String,
    /// Ticks simulated.
    pub ticks: Tick,
    /// Final state hash, for comparing runs.
    pub state_hash: u64,
    /// Active units and buildings per team at the end.
    pub survivors_by_team: BTreeMap<TeamId, usize>,
    /// Entities destroyed by damage, in order of destruction.
    pub destroyed: Vec<EntityId>,
    /// Total damage dealt over the run.
    pub damage_dealt: f64,
}

/// Runs a scenario's simulation and accumulates what happened.
pub struct HeadlessRunner {
    name: String,
    sim: Simulation,
    destroyed: Vec<EntityId>,
    damage_dealt: Fixed,
}

impl HeadlessRunner {
    /// Build the scenario's simulation.
    pub fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        Ok(Self {
            name: scenario.name.clone(),
            sim: scenario.build()?,
            destroyed: Vec::new(),
            damage_dealt: Fixed::ZERO,
        })
    }

    /// The simulation being run.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Advance one tick.
    pub fn step(&mut self) -> TickEvents {
        let events = self.sim.tick();
        for event in &events.events {
            match *event {
                GameEvent::Damaged { amount, .. } => self.damage_dealt += amount,
                GameEvent::Destroyed { id, by } => {
                    debug!(tick = events.tick, id, by, "entity destroyed");
                    self.destroyed.push(id);
                }
                _ => {}
            }
        }
        events
    }

    /// Advance `ticks` ticks and report.
    pub fn run(&mut self, ticks: Tick) -> RunReport {
        info!(
            scenario = %self.name,
            ticks,
            seconds = ticks / u64::from(TICK_RATE),
            "running scenario"
        );
        for _ in 0..ticks {
            self.step();
        }
        let report = self.report();
        info!(
            destroyed = report.destroyed.len(),
            state_hash = report.state_hash,
            "run complete"
        );
        report
    }

    /// Summary of the run so far.
    #[must_use]
    pub fn report(&self) -> RunReport {
        let registry = self.sim.registry();
        let mut survivors_by_team: BTreeMap<TeamId, usize> = BTreeMap::new();
        let teams = registry
            .units
            .values()
            .filter(|u| u.core.active)
            .map(|u| u.team)
            .chain(
                registry
                    .buildings
                    .values()
                    .filter(|b| b.core.active)
                    .map(|b| b.team),
            );
        for team in teams {
            *survivors_by_team.entry(team).or_default() += 1;
        }

        RunReport {
            scenario: self.name.clone(),
            ticks: self.sim.get_tick(),
            state_hash: self.sim.state_hash(),
            survivors_by_team,
            destroyed: self.destroyed.clone(),
            damage_dealt: self.damage_dealt.to_num::<f64>(),
        }
    }
}

/// Load, run and summarise a scenario.
pub fn run_scenario(scenario: &Scenario, ticks: Option<Tick>) -> Result<RunReport, ScenarioError> {
    let mut runner = HeadlessRunner::new(scenario)?;
    Ok(runner.run(scenario.tick_budget(ticks)))
}

/// Waypoints for a ground unit of `radius` between two points of a scenario map.
pub fn plan_path(
    scenario: &Scenario,
    from: (i32, i32),
    to: (i32, i32),
    radius: i32,
) -> Result<Vec<(f64, f64)>, ScenarioError> {
    let sim = scenario.build()?;
    let path = sim.find_path(
        Vec2Fixed::from_ints(from.0, from.1),
        Vec2Fixed::from_ints(to.0, to.1),
        Fixed::from_num(radius),
        false,
    );
    Ok(path
        .into_iter()
        .map(|p| (p.x.to_num::<f64>(), p.y.to_num::<f64>()))
        .collect())
}
