//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the combat core guards against:
//!
//! - **Floating-point math**: we use fixed-point arithmetic via
//!   [`skirmish_core::math::Fixed`] throughout.
//! - **Hash map iteration order**: entities, bodies and contacts are always
//!   visited in sorted order.
//! - **Spawns during iteration**: entities created during contact
//!   arbitration are queued and registered in queue order.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual rules (arbiter, field effects, turrets)
//! 2. **Property tests**: random inputs must still produce deterministic outputs
//! 3. **Integration tests**: full scenarios are reproducible
//! 4. **Parallel tests**: N simulations run on separate threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use skirmish_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a [`Simulation`] twice from identical setup and compare final hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Run N simulations on separate threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(hash) => hash,
                Err(_) => panic!("simulation thread panicked"),
            })
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two simulation runs tick-by-tick, finding the first divergence.
///
/// Returns `None` if the runs never diverge, `Some(tick)` otherwise.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick, "simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for combat-core inputs.
pub mod strategies {
    use proptest::prelude::*;
    use skirmish_core::components::{ElevationMask, TeamId};
    use skirmish_core::field_effect::{FieldCategory, FieldSpawn};
    use skirmish_core::math::{Fixed, Vec2Fixed};

    /// Fixed-point coordinate inside a 2000-unit map.
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (0i32..2000i32).prop_map(Fixed::from_num)
    }

    /// Position inside a 2000 × 2000 map.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Velocity with components in `-8..8` units per tick.
    pub fn arb_velocity() -> impl Strategy<Value = Vec2Fixed> {
        (-8i32..8i32, -8i32..8i32).prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
    }

    /// Team id, including the free-for-all team.
    pub fn arb_team() -> impl Strategy<Value = TeamId> {
        0u8..4u8
    }

    /// Damage values (1-100).
    pub fn arb_damage() -> impl Strategy<Value = Fixed> {
        (1i32..100i32).prop_map(Fixed::from_num)
    }

    /// Any field-effect category.
    pub fn arb_field_category() -> impl Strategy<Value = FieldCategory> {
        prop_oneof![
            Just(FieldCategory::Explosion),
            Just(FieldCategory::Fragmentation),
            Just(FieldCategory::FlakBurst),
            Just(FieldCategory::Fire),
            Just(FieldCategory::Electric),
            Just(FieldCategory::Sandstorm),
        ]
    }

    /// Field-effect parameters with `initial_radius <= max_radius`.
    pub fn arb_field_spawn() -> impl Strategy<Value = FieldSpawn> {
        (
            arb_field_category(),
            arb_vec2_position(),
            1i32..200i32,
            0u32..=100u32,
            arb_damage(),
            0u64..20u64,
            0u64..120u64,
        )
            .prop_map(|(category, position, radius, initial, damage, arming_delay, duration)| {
                let max_radius = Fixed::from_num(radius);
                FieldSpawn {
                    owner: 0,
                    team: 1,
                    category,
                    position,
                    initial_radius: max_radius * Fixed::from_num(initial) / Fixed::from_num(100),
                    max_radius,
                    damage,
                    elevation_mask: ElevationMask::ALL,
                    arming_delay,
                    duration,
                }
            })
    }

    /// Number of enemy units lined up in a piercing shot's path.
    pub fn arb_line_length() -> impl Strategy<Value = usize> {
        1usize..6usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fortress_scenario, skirmish_scenario};

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_simulation_determinism() {
        assert!(verify_simulation_determinism(Simulation::new, 100));
    }

    #[test]
    fn test_skirmish_determinism() {
        assert!(verify_simulation_determinism(|| skirmish_scenario(4), 200));
        assert_eq!(find_first_divergence(fortress_scenario, 200), None);
    }

    #[test]
    fn test_parallel_simulations_match() {
        let result = run_parallel_simulations(fortress_scenario, 4, 150);
        assert_eq!(result.hashes.len(), 4);
        result.assert_deterministic();
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&(1u64, 2u64)), compute_hash(&(1u64, 2u64)));
        assert_ne!(compute_hash(&1u64), compute_hash(&2u64));
    }

    #[test]
    #[should_panic(expected = "non-deterministic")]
    fn test_assert_deterministic_panics_on_mismatch() {
        DeterminismResult {
            is_deterministic: false,
            hashes: vec![1, 2],
            ticks: 10,
        }
        .assert_deterministic();
    }
}
