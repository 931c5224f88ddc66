//! The scenarios shipped in `scenarios/` load, build and run.

use std::path::PathBuf;

use skirmish_headless::{run_scenario, Scenario};

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../scenarios")
        .join(name)
}

#[test]
fn test_outpost_runs() {
    let scenario = Scenario::load(scenario_path("outpost.ron")).unwrap();
    assert_eq!(scenario.tick_budget(None), 1200);

    let report = run_scenario(&scenario, Some(400)).unwrap();
    assert_eq!(report.ticks, 400);
    assert!(report.damage_dealt > 0.0);
}

#[test]
fn test_duel_is_reproducible() {
    let scenario = Scenario::load(scenario_path("duel.ron")).unwrap();
    let first = run_scenario(&scenario, None).unwrap();
    let second = run_scenario(&scenario, None).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.ticks, 600);
    assert!(!first.destroyed.is_empty());
}
