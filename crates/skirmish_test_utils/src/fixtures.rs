//! Test fixtures and helpers.
//!
//! Pre-built entities and simulations for consistent testing.

use fixed::types::I32F32;
use skirmish_core::ballistics::ProjectileSpawn;
use skirmish_core::components::{ElevationMask, EntityId, TeamId};
use skirmish_core::math::Vec2Fixed;
use skirmish_core::obstacle::Obstacle;
use skirmish_core::ordinance::{BulletEffect, BulletEffects, OrdinanceType};
use skirmish_core::simulation::Simulation;
use skirmish_core::units::{Building, Unit, WallSegment, Weapon};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a vector from integer coordinates.
#[must_use]
pub fn vec2(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// Basic kinetic weapon: 10 damage, range 150, 10-tick cooldown.
#[must_use]
pub fn rifle() -> Weapon {
    Weapon::new(OrdinanceType::Bullet, fixed(10), fixed(150), 10)
}

/// Hit-scan weapon: 25 damage, range 200, 20-tick cooldown.
#[must_use]
pub fn laser() -> Weapon {
    Weapon::new(OrdinanceType::Laser, fixed(25), fixed(200), 20)
}

/// Explosive artillery: 40 damage, range 300, 40-tick cooldown.
#[must_use]
pub fn artillery() -> Weapon {
    Weapon::new(OrdinanceType::Shell, fixed(40), fixed(300), 40)
}

/// Unarmed ground unit of radius 4.
#[must_use]
pub fn ground_unit(id: EntityId, team: TeamId, x: i32, y: i32, health: i32) -> Unit {
    Unit::new(id, team, vec2(x, y), fixed(4), fixed(health), 0)
}

/// Projectile spawn moving along +x from `origin` at 10 units per tick.
#[must_use]
pub fn bullet_along_x(
    origin: Vec2Fixed,
    team: TeamId,
    damage: i32,
    max_range: i32,
) -> ProjectileSpawn {
    ProjectileSpawn {
        origin,
        velocity: vec2(10, 0),
        damage: fixed(damage),
        max_range: fixed(max_range),
        owner: 0,
        team,
        linear_damping: I32F32::ZERO,
        effects: BulletEffects::NONE,
        ordinance: OrdinanceType::Bullet,
        elevation_mask: ElevationMask::SURFACE_AND_LOW,
        radius: I32F32::ONE,
    }
}

/// The same spawn carrying the piercing effect.
#[must_use]
pub fn piercing(spawn: ProjectileSpawn) -> ProjectileSpawn {
    ProjectileSpawn {
        effects: spawn.effects.with(BulletEffect::Piercing),
        ..spawn
    }
}

/// Add an entity to a simulation, panicking on failure.
///
/// # Panics
///
/// Panics if the id is already registered.
pub fn add<E>(sim: &mut Simulation, entity: E) -> EntityId
where
    E: Into<skirmish_core::registry::Entity>,
{
    match sim.add(entity) {
        Ok(id) => id,
        Err(err) => panic!("fixture entity rejected: {err}"),
    }
}

/// Two armed squads facing each other 120 units apart.
#[must_use]
pub fn skirmish_scenario(per_team: i32) -> Simulation {
    let mut sim = Simulation::new();
    for i in 0..per_team {
        let y = i * 20;
        let id = sim.allocate_id();
        add(
            &mut sim,
            ground_unit(id, 1, 0, y, 60).with_turret(Vec2Fixed::ZERO, rifle()),
        );
        let id = sim.allocate_id();
        add(
            &mut sim,
            ground_unit(id, 2, 120, y, 60).with_turret(Vec2Fixed::ZERO, rifle()),
        );
    }
    sim
}

/// A shielded laser tower behind a wall, attacked by artillery, with rocks.
#[must_use]
pub fn fortress_scenario() -> Simulation {
    let mut sim = Simulation::new();

    let id = sim.allocate_id();
    add(
        &mut sim,
        Building::new(id, 1, vec2(300, 200), fixed(30), fixed(30), fixed(600), 0)
            .with_shield(fixed(60))
            .with_turret(Vec2Fixed::ZERO, laser()),
    );
    let id = sim.allocate_id();
    add(
        &mut sim,
        WallSegment::new(id, 1, vec2(230, 150), vec2(230, 250), fixed(6), fixed(400), 0),
    );

    for (i, y) in [160, 200, 240].into_iter().enumerate() {
        let id = sim.allocate_id();
        let weapon = if i == 1 { artillery() } else { rifle() };
        add(
            &mut sim,
            ground_unit(id, 2, 80, y, 80).with_turret(Vec2Fixed::ZERO, weapon),
        );
    }

    let id = sim.allocate_id();
    add(&mut sim, Obstacle::circle(id, vec2(160, 120), fixed(12), 0));
    let id = sim.allocate_id();
    add(
        &mut sim,
        Obstacle::rectangle(id, vec2(160, 280), fixed(20), fixed(20), 0).destructible(),
    );
    sim
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_helpers() {
        assert_eq!(fixed(10), I32F32::from_num(10));
        assert_eq!(fixed_f(1.5), I32F32::from_num(1.5));
        assert_eq!(vec2(3, 4).length(), fixed(5));
    }

    #[test]
    fn test_scenarios_populate_registry() {
        let sim = skirmish_scenario(3);
        assert_eq!(sim.registry().units.len(), 6);

        let fortress = fortress_scenario();
        assert_eq!(fortress.registry().buildings.len(), 1);
        assert_eq!(fortress.registry().walls.len(), 1);
        assert_eq!(fortress.registry().units.len(), 3);
        assert_eq!(fortress.registry().obstacles.len(), 2);
    }
}
