//! Simulation benchmarks for skirmish_core.
//!
//! Run with: `cargo bench -p skirmish_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use skirmish_core::obstacle::Obstacle;
use skirmish_core::pathfinding::NavWorld;
use skirmish_test_utils::fixtures::{fixed, fortress_scenario, skirmish_scenario, vec2};

/// A* across a field of rectangular rocks.
pub fn pathfinding_benchmark(c: &mut Criterion) {
    let obstacles: Vec<Obstacle> = (0..12)
        .map(|i| {
            let x = 80 + i * 60;
            let y = if i % 2 == 0 { 160 } else { 320 };
            Obstacle::rectangle(i as u64 + 1, vec2(x, y), fixed(24), fixed(200), 0)
        })
        .collect();
    let world = NavWorld::new(fixed(1024), fixed(512)).with_obstacles(&obstacles);

    c.bench_function("find_path_around_rocks", |b| {
        b.iter(|| {
            black_box(world.find_path(
                black_box(vec2(10, 250)),
                black_box(vec2(1000, 250)),
                fixed(4),
                false,
            ))
        })
    });
}

/// Ticking populated battles.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("skirmish_tick_40_units", |b| {
        b.iter_batched(
            || skirmish_scenario(20),
            |mut sim| {
                for _ in 0..20 {
                    black_box(sim.tick());
                }
                sim
            },
            criterion::BatchSize::SmallInput,
        )
    });

    c.bench_function("fortress_100_ticks", |b| {
        b.iter_batched(
            fortress_scenario,
            |mut sim| {
                black_box(sim.run(100));
                sim
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, pathfinding_benchmark, simulation_benchmark);
criterion_main!(benches);
