//! Contact arbitration: turns physics contacts into gameplay outcomes.
//!
//! The physics world calls [`arbitrate`] once per contact during its step.
//! The return value tells it whether to apply a physical collision response.
//! Only contacts involving an active projectile carry gameplay rules; every
//! other pair collides normally.
//!
//! Entities cannot be registered while the physics world is stepping, so
//! explosions spawned here are queued on the registry and flushed after the
//! step.

use tracing::{trace, warn};

use crate::ballistics::Projectile;
use crate::components::{are_allied, ElevationMask, EntityId, TeamId, Tick};
use crate::events::{GameEvent, TickEvents};
use crate::field_effect::{FieldEffect, FieldSpawn};
use crate::math::{Fixed, Vec2Fixed};
use crate::ordinance::{OrdinanceCatalog, OrdinanceType};
use crate::physics::{BodyTag, Contact};
use crate::registry::{EntityKind, EntityRegistry};

/// Share of projectile damage a shield passes on to its building.
pub const SHIELD_DAMAGE_PERCENT: u32 = 10;

/// Projectile state needed to resolve one contact.
#[derive(Debug, Clone, Copy)]
struct Shot {
    id: EntityId,
    owner: EntityId,
    team: TeamId,
    damage: Fixed,
    ordinance: OrdinanceType,
    elevation_mask: ElevationMask,
    origin: Vec2Fixed,
    piercing: bool,
    explosive: bool,
}

impl Shot {
    fn of(projectile: &Projectile) -> Self {
        Self {
            id: projectile.core.id,
            owner: projectile.owner,
            team: projectile.team,
            damage: projectile.damage,
            ordinance: projectile.ordinance,
            elevation_mask: projectile.elevation_mask,
            origin: projectile.origin,
            piercing: projectile.is_piercing(),
            explosive: projectile.is_explosive(),
        }
    }
}

fn projectile_id(registry: &EntityRegistry, tag: BodyTag) -> Option<EntityId> {
    match tag {
        BodyTag::Entity(id) if registry.kind_of(id) == Some(EntityKind::Projectile) => Some(id),
        _ => None,
    }
}

/// Resolve one contact. Returns `true` if physics should respond.
pub fn arbitrate(
    contact: &Contact,
    registry: &mut EntityRegistry,
    catalog: &OrdinanceCatalog,
    now: Tick,
    events: &mut TickEvents,
) -> bool {
    let (id, other) = match (
        projectile_id(registry, contact.tag_a),
        projectile_id(registry, contact.tag_b),
    ) {
        (Some(_), Some(_)) => return false,
        (Some(id), None) => (id, contact.tag_b),
        (None, Some(id)) => (id, contact.tag_a),
        (None, None) => return true,
    };

    let Some(shot) = registry
        .projectiles
        .get(&id)
        .filter(|p| p.core.active)
        .map(Shot::of)
    else {
        return false;
    };

    match other {
        BodyTag::Shield(building) => hit_shield(registry, shot, building, events),
        BodyTag::Entity(target) => match registry.kind_of(target) {
            Some(EntityKind::Unit | EntityKind::Building | EntityKind::Wall) => {
                hit_target(registry, catalog, shot, target, contact.point, now, events)
            }
            Some(EntityKind::Obstacle) => {
                hit_obstacle(registry, catalog, shot, target, contact.point, now, events)
            }
            Some(EntityKind::Projectile) => false,
            _ => true,
        },
    }
}

fn hit_shield(
    registry: &mut EntityRegistry,
    shot: Shot,
    building_id: EntityId,
    events: &mut TickEvents,
) -> bool {
    let Some(building) = registry.buildings.get_mut(&building_id) else {
        return false;
    };
    let Some(shield) = building.shield.as_ref() else {
        return false;
    };
    if !building.core.active
        || !shield.active
        || are_allied(shot.team, building.team)
        || shield.covers(building.core.position, shot.origin)
    {
        return false;
    }

    let amount = shot.damage * Fixed::from_num(SHIELD_DAMAGE_PERCENT) / Fixed::from_num(100);
    let killed = building.core.apply_damage(amount);
    events.damage(building_id, shot.id, amount, killed);
    trace!(projectile = shot.id, building = building_id, "projectile stopped by shield");
    spend(registry, shot.id, events);
    false
}

fn hit_target(
    registry: &mut EntityRegistry,
    catalog: &OrdinanceCatalog,
    shot: Shot,
    target_id: EntityId,
    point: Vec2Fixed,
    now: Tick,
    events: &mut TickEvents,
) -> bool {
    if target_id == shot.owner {
        return false;
    }
    let already_hit = registry
        .projectiles
        .get(&shot.id)
        .is_some_and(|p| p.affected.contains(&target_id));
    let is_unit = registry.kind_of(target_id) == Some(EntityKind::Unit);

    let Some(target) = registry.targetable_mut(target_id) else {
        return false;
    };
    if !target.is_active()
        || are_allied(shot.team, target.team())
        || !shot.elevation_mask.permits(target.elevation())
        || already_hit
    {
        return false;
    }

    let killed = target.core_mut().apply_damage(shot.damage);
    events.damage(target_id, shot.id, shot.damage, killed);
    if let Some(projectile) = registry.projectiles.get_mut(&shot.id) {
        projectile.record_hit(target_id);
    }
    trace!(projectile = shot.id, target = target_id, killed, "projectile hit");

    if shot.explosive {
        detonate(registry, catalog, shot, point, now, events);
    }
    if !(shot.piercing && is_unit) {
        spend(registry, shot.id, events);
    }
    false
}

fn hit_obstacle(
    registry: &mut EntityRegistry,
    catalog: &OrdinanceCatalog,
    shot: Shot,
    obstacle_id: EntityId,
    point: Vec2Fixed,
    now: Tick,
    events: &mut TickEvents,
) -> bool {
    if let Some(obstacle) = registry.obstacles.get_mut(&obstacle_id) {
        if obstacle.core.active {
            let before = obstacle.core.health;
            let killed = obstacle.apply_damage(shot.damage);
            if obstacle.core.health < before {
                events.damage(obstacle_id, shot.id, shot.damage, killed);
            }
        }
    }
    if shot.explosive {
        detonate(registry, catalog, shot, point, now, events);
    }
    spend(registry, shot.id, events);
    true
}

fn spend(registry: &mut EntityRegistry, id: EntityId, events: &mut TickEvents) {
    if let Some(projectile) = registry.projectiles.get_mut(&id) {
        if projectile.core.active {
            projectile.core.deactivate();
            events.push(GameEvent::ProjectileSpent { id });
        }
    }
}

fn detonate(
    registry: &mut EntityRegistry,
    catalog: &OrdinanceCatalog,
    shot: Shot,
    point: Vec2Fixed,
    now: Tick,
    events: &mut TickEvents,
) {
    let spawn = FieldSpawn::explosion(
        shot.owner,
        shot.team,
        point,
        catalog.get(shot.ordinance).size,
        shot.damage,
        shot.elevation_mask,
    );
    let id = registry.allocate_id();
    let field = FieldEffect::new(id, spawn, now);
    let category = field.category;
    match registry.queue_spawn(field) {
        Ok(id) => events.push(GameEvent::FieldSpawned { id, category }),
        Err(err) => warn!(projectile = shot.id, %err, "failed to queue explosion"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballistics::ProjectileSpawn;
    use crate::field_effect::FieldCategory;
    use crate::obstacle::Obstacle;
    use crate::ordinance::{BulletEffect, BulletEffects};
    use crate::physics::{BodyHandle, KinematicWorld};
    use crate::units::{Building, Unit, WallSegment};

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn vec2(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::from_ints(x, y)
    }

    struct Arena {
        registry: EntityRegistry,
        world: KinematicWorld,
        catalog: OrdinanceCatalog,
        events: TickEvents,
    }

    impl Arena {
        fn new() -> Self {
            Self {
                registry: EntityRegistry::new(),
                world: KinematicWorld::new(),
                catalog: OrdinanceCatalog::new(),
                events: TickEvents::new(1),
            }
        }

        fn shoot(&mut self, ordinance: OrdinanceType, effects: BulletEffects) -> EntityId {
            let id = self.registry.allocate_id();
            let projectile = Projectile::new(
                id,
                ProjectileSpawn {
                    origin: vec2(0, 0),
                    velocity: vec2(10, 0),
                    damage: fixed(20),
                    max_range: fixed(500),
                    owner: 100,
                    team: 1,
                    linear_damping: Fixed::ZERO,
                    effects,
                    ordinance,
                    elevation_mask: ElevationMask::SURFACE_AND_LOW,
                    radius: Fixed::ONE,
                },
                0,
            );
            self.registry.add(projectile, &mut self.world).unwrap()
        }

        fn unit(&mut self, team: TeamId, x: i32) -> EntityId {
            let id = self.registry.allocate_id();
            self.registry
                .add(Unit::new(id, team, vec2(x, 0), fixed(4), fixed(100), 0), &mut self.world)
                .unwrap()
        }

        fn body(&self, id: EntityId) -> BodyHandle {
            self.registry.core(id).and_then(|c| c.body).unwrap()
        }

        fn contact(&mut self, projectile: EntityId, other: BodyTag, x: i32) -> bool {
            let contact = Contact {
                a: self.body(projectile),
                b: BodyHandle(999),
                tag_a: BodyTag::Entity(projectile),
                tag_b: other,
                point: vec2(x, 0),
            };
            arbitrate(
                &contact,
                &mut self.registry,
                &self.catalog,
                1,
                &mut self.events,
            )
        }

        fn active(&self, id: EntityId) -> bool {
            self.registry.core(id).is_some_and(|c| c.active)
        }

        fn health(&self, id: EntityId) -> Fixed {
            self.registry.core(id).map(|c| c.health).unwrap()
        }
    }

    #[test]
    fn test_enemy_unit_hit_once() {
        let mut arena = Arena::new();
        let shot = arena.shoot(OrdinanceType::Bullet, BulletEffects::NONE);
        let enemy = arena.unit(2, 20);

        assert!(!arena.contact(shot, BodyTag::Entity(enemy), 20));
        assert_eq!(arena.health(enemy), fixed(80));
        assert!(!arena.active(shot));
        assert!(arena
            .events
            .events
            .contains(&GameEvent::ProjectileSpent { id: shot }));

        // Re-entrant contact after deactivation does nothing.
        assert!(!arena.contact(shot, BodyTag::Entity(enemy), 20));
        assert_eq!(arena.health(enemy), fixed(80));
    }

    #[test]
    fn test_friendly_fire_passes_through() {
        let mut arena = Arena::new();
        let shot = arena.shoot(OrdinanceType::Bullet, BulletEffects::NONE);
        let friend = arena.unit(1, 20);
        assert!(!arena.contact(shot, BodyTag::Entity(friend), 20));
        assert_eq!(arena.health(friend), fixed(100));
        assert!(arena.active(shot));
    }

    #[test]
    fn test_owner_passthrough() {
        let mut arena = Arena::new();
        arena
            .registry
            .add(
                Unit::new(100, 2, vec2(0, 0), fixed(4), fixed(100), 0),
                &mut arena.world,
            )
            .unwrap();
        let shot = arena.shoot(OrdinanceType::Bullet, BulletEffects::NONE);
        assert!(!arena.contact(shot, BodyTag::Entity(100), 0));
        assert_eq!(arena.health(100), fixed(100));
        assert!(arena.active(shot));
    }

    #[test]
    fn test_piercing_continues_through_units_only() {
        let mut arena = Arena::new();
        let piercing = BulletEffects::NONE.with(BulletEffect::Piercing);
        let shot = arena.shoot(OrdinanceType::Bullet, piercing);
        let first = arena.unit(2, 20);
        let second = arena.unit(2, 40);

        arena.contact(shot, BodyTag::Entity(first), 20);
        arena.contact(shot, BodyTag::Entity(second), 40);
        arena.contact(shot, BodyTag::Entity(first), 20);
        assert_eq!(arena.health(first), fixed(80));
        assert_eq!(arena.health(second), fixed(80));
        assert!(arena.active(shot));

        let wall_id = arena.registry.allocate_id();
        arena
            .registry
            .add(
                WallSegment::new(wall_id, 2, vec2(60, -10), vec2(60, 10), fixed(2), fixed(200), 0),
                &mut arena.world,
            )
            .unwrap();
        arena.contact(shot, BodyTag::Entity(wall_id), 59);
        assert_eq!(arena.health(wall_id), fixed(180));
        assert!(!arena.active(shot));
    }

    #[test]
    fn test_elevation_mismatch_passes_through() {
        let mut arena = Arena::new();
        let shot = arena.shoot(OrdinanceType::Bullet, BulletEffects::NONE);
        let id = arena.registry.allocate_id();
        arena
            .registry
            .add(
                Unit::new(id, 2, vec2(20, 0), fixed(4), fixed(100), 0)
                    .with_elevation(crate::components::Elevation::High),
                &mut arena.world,
            )
            .unwrap();
        assert!(!arena.contact(shot, BodyTag::Entity(id), 20));
        assert_eq!(arena.health(id), fixed(100));
        assert!(arena.active(shot));
    }

    #[test]
    fn test_explosive_hit_queues_explosion() {
        let mut arena = Arena::new();
        let shot = arena.shoot(OrdinanceType::Shell, BulletEffects::NONE);
        let enemy = arena.unit(2, 20);
        arena.contact(shot, BodyTag::Entity(enemy), 18);

        assert_eq!(arena.registry.pending_spawns(), 1);
        let spawned = arena.registry.flush_spawns(&mut arena.world).unwrap();
        let field = &arena.registry.field_effects[&spawned[0]];
        assert_eq!(field.core.position, vec2(18, 0));
        assert_eq!(field.team, 1);
        assert_eq!(field.damage, arena.registry.projectiles[&shot].damage / 2);
    }

    #[test]
    fn test_obstacle_stops_projectile_with_response() {
        let mut arena = Arena::new();
        let shot = arena.shoot(OrdinanceType::Bullet, BulletEffects::NONE);
        let rock = arena.registry.allocate_id();
        arena
            .registry
            .add(Obstacle::circle(rock, vec2(30, 0), fixed(5), 0), &mut arena.world)
            .unwrap();
        let before = arena.health(rock);
        assert!(arena.contact(shot, BodyTag::Entity(rock), 25));
        assert!(!arena.active(shot));
        assert_eq!(arena.health(rock), before);
    }

    #[test]
    fn test_explosive_obstacle_hit_spends_and_detonates() {
        let mut arena = Arena::new();
        let shot = arena.shoot(OrdinanceType::Shell, BulletEffects::NONE);
        let rock = arena.registry.allocate_id();
        arena
            .registry
            .add(Obstacle::circle(rock, vec2(30, 0), fixed(5), 0), &mut arena.world)
            .unwrap();

        assert!(arena.contact(shot, BodyTag::Entity(rock), 25));
        assert!(!arena.active(shot));
        assert!(arena
            .events
            .events
            .contains(&GameEvent::ProjectileSpent { id: shot }));

        assert_eq!(arena.registry.pending_spawns(), 1);
        let spawned = arena.registry.flush_spawns(&mut arena.world).unwrap();
        assert_eq!(spawned.len(), 1);
        let field = &arena.registry.field_effects[&spawned[0]];
        assert_eq!(field.category, FieldCategory::Explosion);
        assert_eq!(field.core.position, vec2(25, 0));
        assert_eq!(field.damage, fixed(10));
    }

    #[test]
    fn test_projectile_passes_allied_shield() {
        let mut arena = Arena::new();
        let home = arena.registry.allocate_id();
        arena
            .registry
            .add(
                Building::new(home, 1, vec2(100, 0), fixed(20), fixed(20), fixed(500), 0)
                    .with_shield(fixed(50)),
                &mut arena.world,
            )
            .unwrap();

        let shot = arena.shoot(OrdinanceType::Bullet, BulletEffects::NONE);
        assert!(!arena.contact(shot, BodyTag::Shield(home), 50));
        assert_eq!(arena.health(home), fixed(500));
        assert!(arena.active(shot));
        assert!(arena.events.is_empty());
    }

    #[test]
    fn test_shield_rules() {
        let mut arena = Arena::new();
        let enemy_base = arena.registry.allocate_id();
        arena
            .registry
            .add(
                Building::new(enemy_base, 2, vec2(100, 0), fixed(20), fixed(20), fixed(500), 0)
                    .with_shield(fixed(50)),
                &mut arena.world,
            )
            .unwrap();

        let shot = arena.shoot(OrdinanceType::Bullet, BulletEffects::NONE);
        assert!(!arena.contact(shot, BodyTag::Shield(enemy_base), 50));
        assert_eq!(arena.health(enemy_base), fixed(498));
        assert!(!arena.active(shot));

        // Fired from inside the dome: allowed out.
        let inside = arena.shoot(OrdinanceType::Bullet, BulletEffects::NONE);
        arena
            .registry
            .projectiles
            .get_mut(&inside)
            .unwrap()
            .origin = vec2(90, 0);
        assert!(!arena.contact(inside, BodyTag::Shield(enemy_base), 50));
        assert!(arena.active(inside));

        // Inactive shield lets everything through.
        arena
            .registry
            .buildings
            .get_mut(&enemy_base)
            .unwrap()
            .shield
            .as_mut()
            .unwrap()
            .active = false;
        let late = arena.shoot(OrdinanceType::Bullet, BulletEffects::NONE);
        assert!(!arena.contact(late, BodyTag::Shield(enemy_base), 50));
        assert!(arena.active(late));
        assert_eq!(arena.health(enemy_base), fixed(498));
    }

    #[test]
    fn test_non_projectile_pairs_collide() {
        let mut arena = Arena::new();
        let a = arena.unit(1, 0);
        let b = arena.unit(2, 5);
        let contact = Contact {
            a: arena.body(a),
            b: arena.body(b),
            tag_a: BodyTag::Entity(a),
            tag_b: BodyTag::Entity(b),
            point: vec2(1, 0),
        };
        assert!(arbitrate(
            &contact,
            &mut arena.registry,
            &arena.catalog,
            1,
            &mut arena.events
        ));
    }

    #[test]
    fn test_projectile_pairs_ignore_each_other() {
        let mut arena = Arena::new();
        let first = arena.shoot(OrdinanceType::Bullet, BulletEffects::NONE);
        let second = arena.shoot(OrdinanceType::Bullet, BulletEffects::NONE);
        assert!(!arena.contact(first, BodyTag::Entity(second), 0));
        assert!(arena.active(first));
        assert!(arena.active(second));
    }
}
