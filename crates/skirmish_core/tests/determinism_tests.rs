//! Lockstep determinism of full scenarios.

use skirmish_core::simulation::Simulation;
use skirmish_test_utils::determinism::{
    compute_hash, find_first_divergence, run_parallel_simulations, verify_determinism,
    verify_simulation_determinism,
};
use skirmish_test_utils::fixtures::{fortress_scenario, skirmish_scenario};

#[test]
fn test_skirmish_is_deterministic() {
    let result = verify_determinism(
        3,
        300,
        || skirmish_scenario(5),
        |sim| {
            sim.tick();
        },
        Simulation::state_hash,
    );
    result.assert_deterministic();
    assert_eq!(result.unique_hashes().len(), 1);
}

#[test]
fn test_fortress_is_deterministic() {
    assert!(verify_simulation_determinism(fortress_scenario, 400));
    assert_eq!(find_first_divergence(fortress_scenario, 400), None);
}

#[test]
fn test_parallel_runs_agree() {
    run_parallel_simulations(|| skirmish_scenario(3), 8, 200).assert_deterministic();
}

#[test]
fn test_combat_changes_state() {
    let mut sim = skirmish_scenario(2);
    let start = sim.state_hash();
    let events = sim.run(100);
    assert_ne!(sim.state_hash(), start);
    assert!(events.iter().any(|tick| !tick.is_empty()));
}

#[test]
fn test_event_streams_match() {
    let digest = || {
        let mut sim = fortress_scenario();
        let events = sim.run(300);
        let destroyed: Vec<_> = events.iter().flat_map(|tick| tick.destroyed()).collect();
        let damage: Vec<i64> = events.iter().map(|tick| tick.total_damage().to_bits()).collect();
        compute_hash(&(destroyed, damage))
    };
    assert_eq!(digest(), digest());
}
