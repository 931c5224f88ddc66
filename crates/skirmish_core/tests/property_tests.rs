//! Property tests for the combat invariants.

use proptest::prelude::*;
use skirmish_core::components::{ElevationMask, EntityId, Tick};
use skirmish_core::events::GameEvent;
use skirmish_core::field_effect::{FieldCategory, FieldEffect, FieldSpawn};
use skirmish_core::math::{Fixed, Vec2Fixed};
use skirmish_core::obstacle::Obstacle;
use skirmish_core::pathfinding::find_path;
use skirmish_core::simulation::Simulation;
use skirmish_core::targeting::intercept_point;
use skirmish_test_utils::determinism::strategies::{
    arb_damage, arb_field_spawn, arb_line_length, arb_vec2_position, arb_velocity,
};
use skirmish_test_utils::fixtures::{add, bullet_along_x, fixed, ground_unit, piercing, vec2};

#[test]
fn test_explosion_falloff_at_half_radius() {
    let effect = FieldEffect::new(
        1,
        FieldSpawn {
            owner: 0,
            team: 1,
            category: FieldCategory::Explosion,
            position: Vec2Fixed::ZERO,
            initial_radius: fixed(50),
            max_radius: fixed(50),
            damage: fixed(100),
            elevation_mask: ElevationMask::ALL,
            arming_delay: 0,
            duration: 10,
        },
        0,
    );

    assert_eq!(effect.damage_at(vec2(25, 0)), fixed(75));
    // Rim is hit harder than the centre.
    assert_eq!(effect.damage_at(Vec2Fixed::ZERO), fixed(50));
    assert_eq!(effect.damage_at(vec2(50, 0)), fixed(100));
    assert_eq!(effect.damage_at(vec2(51, 0)), Fixed::ZERO);
}

#[test]
fn test_intercept_stationary_target_is_exact() {
    let target = vec2(120, -35);
    assert_eq!(
        intercept_point(vec2(3, 4), target, Vec2Fixed::ZERO, fixed(12)),
        target
    );
}

#[test]
fn test_open_ground_path_is_direct() {
    let start = vec2(10, 10);
    let goal = vec2(900, 700);
    let path = find_path(start, goal, &[], &[], fixed(4), fixed(1024), fixed(1024), false);
    assert_eq!(path, vec![start, goal]);
}

proptest! {
    #[test]
    fn prop_field_radius_monotonic_and_bounded(spawn in arb_field_spawn()) {
        let mut effect = FieldEffect::new(1, spawn, 0);
        let mut previous = effect.radius;
        for now in 0..=(spawn.duration + 2) {
            effect.update(now);
            prop_assert!(effect.radius >= previous);
            prop_assert!(effect.initial_radius <= effect.radius);
            prop_assert!(effect.radius <= effect.max_radius);
            previous = effect.radius;
        }
    }

    #[test]
    fn prop_intercept_falls_back_to_current_position(
        shooter in arb_vec2_position(),
        target in arb_vec2_position(),
        velocity in arb_velocity(),
    ) {
        // No projectile speed: nothing to lead with.
        prop_assert_eq!(intercept_point(shooter, target, velocity, Fixed::ZERO), target);
        // Stationary target: aim where it stands.
        prop_assert_eq!(intercept_point(shooter, target, Vec2Fixed::ZERO, fixed(10)), target);
    }

    #[test]
    fn prop_path_without_obstacles_is_direct(
        start in arb_vec2_position(),
        goal in arb_vec2_position(),
        airborne in any::<bool>(),
    ) {
        let path = find_path(start, goal, &[], &[], fixed(4), fixed(2048), fixed(2048), airborne);
        prop_assert_eq!(path, vec![start, goal]);
    }

    #[test]
    fn prop_obstacle_health_never_drops(hits in prop::collection::vec(arb_damage(), 1..50)) {
        let mut rock = Obstacle::circle(1, vec2(0, 0), fixed(10), 0);
        let before = rock.core.health;
        for amount in hits {
            prop_assert!(!rock.apply_damage(amount));
        }
        prop_assert_eq!(rock.core.health, before);
        prop_assert!(rock.core.health > Fixed::ZERO);
    }

    #[test]
    fn prop_piercing_hits_each_target_exactly_once(count in arb_line_length(), damage in 1i32..20) {
        let mut sim = Simulation::new();
        let targets: Vec<EntityId> = (0..count)
            .map(|i| {
                let x = 30 * (i32::try_from(i).unwrap() + 1);
                add(&mut sim, ground_unit(i as EntityId + 1, 2, x, 0, 100))
            })
            .collect();
        let reach = 30 * (i32::try_from(count).unwrap() + 1);
        let shot = sim
            .fire_projectile(piercing(bullet_along_x(Vec2Fixed::ZERO, 1, damage, reach)))
            .unwrap();

        let ticks: Tick = 3 * count as Tick + 6;
        let events = sim.run(ticks);
        for target in &targets {
            let hits = events
                .iter()
                .flat_map(|t| t.events.iter())
                .filter(|e| matches!(e, GameEvent::Damaged { target: t, .. } if t == target))
                .count();
            prop_assert_eq!(hits, 1);
            prop_assert_eq!(sim.registry().units[target].core.health, fixed(100 - damage));
        }
        prop_assert!(!sim.registry().contains(shot));
    }

    #[test]
    fn prop_plain_projectile_hits_at_most_once(count in arb_line_length()) {
        let mut sim = Simulation::new();
        for i in 0..count {
            let x = 30 * (i32::try_from(i).unwrap() + 1);
            add(&mut sim, ground_unit(i as EntityId + 1, 2, x, 0, 100));
        }
        sim.fire_projectile(bullet_along_x(Vec2Fixed::ZERO, 1, 10, 500))
            .unwrap();

        let events = sim.run(3 * count as Tick + 6);
        let hits = events
            .iter()
            .flat_map(|t| t.events.iter())
            .filter(|e| matches!(e, GameEvent::Damaged { .. }))
            .count();
        prop_assert_eq!(hits, 1);
        prop_assert_eq!(sim.registry().units[&1].core.health, fixed(90));
    }
}
