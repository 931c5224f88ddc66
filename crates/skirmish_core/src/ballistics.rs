//! Projectiles and hit-scan beams.
//!
//! Projectiles move through the physics world and are resolved contact by
//! contact in [`crate::arbiter`]. Beams are resolved once, when they are
//! created: [`BeamCast`] performs the raycast into a plain value, [`Beam`]
//! is built from it, and [`register_beam`] applies the impact.

use std::collections::BTreeSet;

use tracing::trace;

use crate::components::{are_allied, ElevationMask, EntityCore, EntityId, TeamId, Tick};
use crate::error::{GameError, Result};
use crate::events::{GameEvent, TickEvents};
use crate::field_effect::{FieldEffect, FieldSpawn};
use crate::geometry::Shape;
use crate::math::{fixed_atan2, Fixed, Vec2Fixed};
use crate::ordinance::{BulletEffect, BulletEffects, OrdinanceCatalog, OrdinanceType};
use crate::physics::{BodyDesc, BodyHandle, BodyKind, BodyTag, PhysicsWorld};
use crate::registry::{Entity, EntityKind, EntityRegistry};

/// Parameters for firing a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileSpawn {
    /// Muzzle position.
    pub origin: Vec2Fixed,
    /// Initial velocity in units per tick.
    pub velocity: Vec2Fixed,
    /// Damage per hit.
    pub damage: Fixed,
    /// Distance from the origin after which the projectile is spent.
    pub max_range: Fixed,
    /// Firing entity.
    pub owner: EntityId,
    /// Team of the firing entity.
    pub team: TeamId,
    /// Fraction of velocity lost per tick.
    pub linear_damping: Fixed,
    /// Bullet effects carried.
    pub effects: BulletEffects,
    /// Payload type.
    pub ordinance: OrdinanceType,
    /// Elevations the projectile can hit.
    pub elevation_mask: ElevationMask,
    /// Body radius.
    pub radius: Fixed,
}

/// A moving round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projectile {
    /// Shared entity state.
    pub core: EntityCore,
    /// Firing entity.
    pub owner: EntityId,
    /// Team of the firing entity.
    pub team: TeamId,
    /// Damage per hit.
    pub damage: Fixed,
    /// Payload type.
    pub ordinance: OrdinanceType,
    /// Bullet effects carried.
    pub effects: BulletEffects,
    /// Where the projectile was fired from.
    pub origin: Vec2Fixed,
    /// Travel limit measured from `origin`.
    pub max_range: Fixed,
    /// Elevations the projectile can hit.
    pub elevation_mask: ElevationMask,
    /// Fraction of velocity lost per tick.
    pub linear_damping: Fixed,
    /// Body radius.
    pub radius: Fixed,
    /// Targets already damaged. Only ever grows.
    pub affected: BTreeSet<EntityId>,
}

impl Projectile {
    /// Create a projectile at its origin.
    #[must_use]
    pub fn new(id: EntityId, spawn: ProjectileSpawn, now: Tick) -> Self {
        Self {
            core: EntityCore::new(id, spawn.origin, Fixed::ONE, now).with_velocity(spawn.velocity),
            owner: spawn.owner,
            team: spawn.team,
            damage: spawn.damage,
            ordinance: spawn.ordinance,
            effects: spawn.effects,
            origin: spawn.origin,
            max_range: spawn.max_range,
            elevation_mask: spawn.elevation_mask,
            linear_damping: spawn.linear_damping,
            radius: spawn.radius,
            affected: BTreeSet::new(),
        }
    }

    /// Whether the projectile continues through units it hits.
    #[must_use]
    pub fn is_piercing(&self) -> bool {
        self.effects.contains(BulletEffect::Piercing)
    }

    /// Whether impacts spawn an explosion.
    #[must_use]
    pub fn is_explosive(&self) -> bool {
        self.ordinance.is_explosive() || self.effects.contains(BulletEffect::Explosive)
    }

    /// Record a hit on `target`. Returns `false` if it was already hit.
    pub fn record_hit(&mut self, target: EntityId) -> bool {
        self.affected.insert(target)
    }

    /// Distance travelled from the origin.
    #[must_use]
    pub fn distance_travelled(&self) -> Fixed {
        self.origin.distance(self.core.position)
    }

    /// Per-tick update: spent once it has travelled its maximum range.
    ///
    /// Returns `true` if this update deactivated the projectile.
    pub fn update(&mut self) -> bool {
        if self.core.active && self.distance_travelled() >= self.max_range {
            self.core.deactivate();
            return true;
        }
        false
    }

    /// Small dynamic circle with the projectile's damping.
    #[must_use]
    pub fn body_desc(&self) -> BodyDesc {
        BodyDesc::new(
            BodyTag::Entity(self.core.id),
            BodyKind::Dynamic,
            Shape::circle(self.radius),
            self.core.position,
        )
        .with_velocity(self.core.velocity)
        .with_damping(self.linear_damping)
    }
}

/// What a beam's raycast struck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamHit {
    /// Body struck.
    pub body: BodyHandle,
    /// Owner tag of the body.
    pub tag: BodyTag,
    /// World-space hit point.
    pub point: Vec2Fixed,
    /// Distance from the beam start.
    pub distance: Fixed,
}

impl BeamHit {
    /// Entity that owns the struck body.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        match self.tag {
            BodyTag::Entity(id) | BodyTag::Shield(id) => id,
        }
    }
}

/// First phase of beam construction: the resolved geometry of a shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamCast {
    /// Beam start.
    pub start: Vec2Fixed,
    /// Resolved end (hit point or full range).
    pub end: Vec2Fixed,
    /// Where the shot was aimed at full range.
    pub intended_end: Vec2Fixed,
    /// Nearest accepted hit, if any.
    pub hit: Option<BeamHit>,
}

impl BeamCast {
    /// Raycast from `start` along `direction` up to `max_range`.
    ///
    /// `filter` returns `true` for bodies the beam may stop on; the nearest
    /// accepted hit wins. A zero-length direction resolves to a zero-length
    /// beam at `start`.
    #[must_use]
    pub fn cast(
        physics: &dyn PhysicsWorld,
        start: Vec2Fixed,
        direction: Vec2Fixed,
        max_range: Fixed,
        filter: &dyn Fn(BodyHandle, BodyTag) -> bool,
    ) -> Self {
        let direction = direction.normalize();
        if direction.is_zero() {
            return Self::precomputed(start, start);
        }

        let intended_end = start + direction.scale(max_range);
        let hit = physics
            .raycast(start, direction, max_range, filter)
            .into_iter()
            .min_by(|a, b| a.distance.cmp(&b.distance).then(a.body.cmp(&b.body)))
            .map(|h| BeamHit {
                body: h.body,
                tag: h.tag,
                point: h.point,
                distance: h.distance,
            });

        Self {
            start,
            end: hit.map_or(intended_end, |h| h.point),
            intended_end,
            hit,
        }
    }

    /// A beam whose end was decided by the weapon, with no hit.
    #[must_use]
    pub const fn precomputed(start: Vec2Fixed, end: Vec2Fixed) -> Self {
        Self {
            start,
            end,
            intended_end: end,
            hit: None,
        }
    }
}

/// Parameters for a beam shot besides its geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamSpawn {
    /// Firing entity.
    pub owner: EntityId,
    /// Team of the firing entity.
    pub team: TeamId,
    /// Damage on impact.
    pub damage: Fixed,
    /// Payload type.
    pub ordinance: OrdinanceType,
    /// Bullet effects carried.
    pub effects: BulletEffects,
    /// Elevations the beam can hit.
    pub elevation_mask: ElevationMask,
    /// Visual thickness.
    pub thickness: Fixed,
    /// Ticks the beam stays visible.
    pub duration: u64,
}

/// A resolved hit-scan shot, kept alive while visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beam {
    /// Shared entity state; position is the midpoint, rotation the heading.
    pub core: EntityCore,
    /// Firing entity.
    pub owner: EntityId,
    /// Team of the firing entity.
    pub team: TeamId,
    /// Damage on impact.
    pub damage: Fixed,
    /// Payload type.
    pub ordinance: OrdinanceType,
    /// Bullet effects carried.
    pub effects: BulletEffects,
    /// Elevations the beam can hit.
    pub elevation_mask: ElevationMask,
    /// Beam start.
    pub start: Vec2Fixed,
    /// Beam end.
    pub end: Vec2Fixed,
    /// Full-range aim point.
    pub intended_end: Vec2Fixed,
    /// Length along the beam axis.
    pub width: Fixed,
    /// Visual thickness.
    pub thickness: Fixed,
    /// Ticks the beam stays visible.
    pub duration: u64,
    /// Ticks since firing.
    pub elapsed: u64,
    /// What the raycast struck.
    pub hit: Option<BeamHit>,
    /// Targets already damaged.
    pub affected: BTreeSet<EntityId>,
}

impl Beam {
    /// Second phase of construction: build the entity from a finished cast.
    #[must_use]
    pub fn from_cast(id: EntityId, cast: BeamCast, spawn: BeamSpawn, now: Tick) -> Self {
        let two = Fixed::from_num(2);
        let midpoint = Vec2Fixed::new(
            (cast.start.x + cast.end.x) / two,
            (cast.start.y + cast.end.y) / two,
        );
        let axis = cast.end - cast.start;
        let mut core = EntityCore::new(id, midpoint, Fixed::ONE, now);
        core.rotation = fixed_atan2(axis.y, axis.x);

        Self {
            core,
            owner: spawn.owner,
            team: spawn.team,
            damage: spawn.damage,
            ordinance: spawn.ordinance,
            effects: spawn.effects,
            elevation_mask: spawn.elevation_mask,
            start: cast.start,
            end: cast.end,
            intended_end: cast.intended_end,
            width: axis.length(),
            thickness: spawn.thickness,
            duration: spawn.duration,
            elapsed: 0,
            hit: cast.hit,
            affected: BTreeSet::new(),
        }
    }

    /// Whether the beam stopped on a body.
    #[must_use]
    pub const fn hit_obstacle(&self) -> bool {
        self.hit.is_some()
    }

    /// Beam length.
    #[must_use]
    pub fn length(&self) -> Fixed {
        self.width
    }

    /// Fade factor: 1 when fired, 0 once the duration has elapsed.
    #[must_use]
    pub fn opacity(&self) -> Fixed {
        if self.duration == 0 {
            return Fixed::ZERO;
        }
        let progress =
            (Fixed::from_num(self.elapsed) / Fixed::from_num(self.duration)).min(Fixed::ONE);
        Fixed::ONE - progress
    }

    /// Per-tick update: advance elapsed time, deactivate at the duration.
    pub fn update(&mut self) {
        if !self.core.active {
            return;
        }
        self.elapsed += 1;
        if self.elapsed >= self.duration {
            self.core.deactivate();
        }
    }

    /// Sensor body covering the visible beam.
    #[must_use]
    pub fn body_desc(&self) -> BodyDesc {
        let (shape, mid) = Shape::segment_box(self.start, self.end, self.thickness.max(Fixed::ONE));
        BodyDesc::new(BodyTag::Entity(self.core.id), BodyKind::Sensor, shape, mid)
            .with_rotation(self.core.rotation)
    }
}

/// Build the raycast filter for a beam fired by `shooter`.
///
/// Skips the firing entity's bodies, projectiles, beams, field effects,
/// allied units/buildings/walls and targets the beam cannot reach.
pub fn beam_filter<'a>(
    registry: &'a EntityRegistry,
    shooter: EntityId,
    team: TeamId,
    mask: ElevationMask,
) -> impl Fn(BodyHandle, BodyTag) -> bool + 'a {
    move |_, tag| {
        let BodyTag::Entity(id) = tag else {
            return false;
        };
        if id == shooter {
            return false;
        }
        match registry.kind_of(id) {
            Some(EntityKind::Obstacle) => true,
            Some(EntityKind::Unit | EntityKind::Building | EntityKind::Wall) => {
                registry.targetable(id).is_some_and(|target| {
                    target.is_active()
                        && !are_allied(team, target.team())
                        && mask.permits(target.elevation())
                })
            }
            _ => false,
        }
    }
}

/// Register a beam and apply its impact once.
///
/// Enemy targets take the beam's damage; obstacles take it too (ignored
/// unless destructible). Electric beams leave an electric field at the hit
/// point.
///
/// # Errors
///
/// Returns [`GameError::DuplicateEntity`] if the beam's id is taken; nothing
/// is applied in that case.
pub fn register_beam(
    registry: &mut EntityRegistry,
    physics: &mut dyn PhysicsWorld,
    catalog: &OrdinanceCatalog,
    mut beam: Beam,
    now: Tick,
    events: &mut TickEvents,
) -> Result<EntityId> {
    let beam_id = beam.core.id;
    if registry.contains(beam_id) {
        return Err(GameError::DuplicateEntity(beam_id));
    }
    let hit = beam.hit;

    if let Some(hit) = hit {
        let target = hit.entity();
        match registry.kind_of(target) {
            Some(EntityKind::Unit | EntityKind::Building | EntityKind::Wall) => {
                if beam.affected.insert(target) {
                    if let Some(t) = registry.targetable_mut(target) {
                        if t.is_active() && !are_allied(beam.team, t.team()) {
                            let killed = t.core_mut().apply_damage(beam.damage);
                            events.damage(target, beam_id, beam.damage, killed);
                        }
                    }
                }
            }
            Some(EntityKind::Obstacle) => {
                if let Some(obstacle) = registry.obstacles.get_mut(&target) {
                    let before = obstacle.core.health;
                    let killed = obstacle.apply_damage(beam.damage);
                    if obstacle.core.health < before {
                        events.damage(target, beam_id, beam.damage, killed);
                    }
                }
            }
            _ => {}
        }
    }

    events.push(GameEvent::BeamFired {
        id: beam_id,
        hit: hit.map(|h| h.entity()),
    });
    trace!(beam = beam_id, hit = ?hit.map(|h| h.entity()), "beam fired");

    let electric = (hit.is_some() && beam.effects.contains(BulletEffect::Electric)).then(|| {
        FieldSpawn::electric(
            beam.owner,
            beam.team,
            beam.end,
            catalog.get(beam.ordinance).size,
            beam.damage,
            beam.elevation_mask,
        )
    });
    registry.add(Entity::Beam(beam), physics)?;

    if let Some(spawn) = electric {
        let field_id = registry.allocate_id();
        let field = FieldEffect::new(field_id, spawn, now);
        events.push(GameEvent::FieldSpawned {
            id: field_id,
            category: field.category,
        });
        registry.add(Entity::FieldEffect(field), physics)?;
    }

    Ok(beam_id)
}
