//! Units, buildings, wall segments and the weapons they carry.

use crate::components::{Elevation, ElevationMask, EntityCore, EntityId, TeamId, Targetable, Tick};
use crate::geometry::Shape;
use crate::math::{Fixed, Vec2Fixed};
use crate::ordinance::{BulletEffects, OrdinanceCatalog, OrdinanceType};
use crate::physics::{BodyDesc, BodyHandle, BodyKind, BodyTag};
use crate::turret::Turret;

/// A weapon: ordinance plus firing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weapon {
    /// Payload fired.
    pub ordinance: OrdinanceType,
    /// Base damage before the ordinance damage scale.
    pub damage: Fixed,
    /// Maximum engagement range.
    pub range: Fixed,
    /// Ticks between shots.
    pub cooldown: u64,
    /// Base projectile speed in units per tick before the ordinance speed scale.
    pub projectile_speed: Fixed,
    /// Effects added on top of the ordinance defaults.
    pub extra_effects: BulletEffects,
    /// Linear damping applied to fired projectiles.
    pub projectile_damping: Fixed,
    /// Tick of the last shot.
    pub last_fired: Option<Tick>,
}

impl Weapon {
    /// Create a weapon with a default projectile speed of 12 units per tick.
    #[must_use]
    pub fn new(ordinance: OrdinanceType, damage: Fixed, range: Fixed, cooldown: u64) -> Self {
        Self {
            ordinance,
            damage,
            range,
            cooldown,
            projectile_speed: Fixed::from_num(12),
            extra_effects: BulletEffects::NONE,
            projectile_damping: Fixed::ZERO,
            last_fired: None,
        }
    }

    /// Builder method to set the base projectile speed.
    #[must_use]
    pub fn with_projectile_speed(mut self, speed: Fixed) -> Self {
        self.projectile_speed = speed;
        self
    }

    /// Builder method to add bullet effects.
    #[must_use]
    pub fn with_effects(mut self, effects: BulletEffects) -> Self {
        self.extra_effects = self.extra_effects.union(effects);
        self
    }

    /// Check if the cooldown allows firing at `now`.
    #[must_use]
    pub fn can_fire(&self, now: Tick) -> bool {
        self.last_fired
            .map_or(true, |last| now >= last.saturating_add(self.cooldown))
    }

    /// Record a shot.
    pub fn mark_fired(&mut self, now: Tick) {
        self.last_fired = Some(now);
    }

    /// Elevations this weapon can hit.
    #[must_use]
    pub fn elevation_mask(&self, catalog: &OrdinanceCatalog) -> ElevationMask {
        catalog.get(self.ordinance).elevation_mask
    }

    /// Damage per hit after the ordinance scale.
    #[must_use]
    pub fn effective_damage(&self, catalog: &OrdinanceCatalog) -> Fixed {
        self.damage * catalog.get(self.ordinance).damage_scale()
    }

    /// Projectile speed after the ordinance scale.
    #[must_use]
    pub fn effective_speed(&self, catalog: &OrdinanceCatalog) -> Fixed {
        self.projectile_speed * catalog.get(self.ordinance).speed_scale()
    }

    /// All bullet effects of a round fired by this weapon.
    #[must_use]
    pub fn effects(&self, catalog: &OrdinanceCatalog) -> BulletEffects {
        catalog
            .get(self.ordinance)
            .default_effects
            .union(self.extra_effects)
    }
}

/// A mobile unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Shared entity state.
    pub core: EntityCore,
    /// Owning team.
    pub team: TeamId,
    /// Altitude class.
    pub elevation: Elevation,
    /// Body radius.
    pub radius: Fixed,
    /// Whether the unit is cloaked.
    pub cloaked: bool,
    /// Weapon mounts. Single-weapon units carry one turret at zero offset.
    pub turrets: Vec<Turret>,
}

impl Unit {
    /// Create an unarmed ground unit.
    #[must_use]
    pub fn new(
        id: EntityId,
        team: TeamId,
        position: Vec2Fixed,
        radius: Fixed,
        max_health: Fixed,
        now: Tick,
    ) -> Self {
        Self {
            core: EntityCore::new(id, position, max_health, now),
            team,
            elevation: Elevation::Ground,
            radius,
            cloaked: false,
            turrets: Vec::new(),
        }
    }

    /// Builder method to set the elevation.
    #[must_use]
    pub fn with_elevation(mut self, elevation: Elevation) -> Self {
        self.elevation = elevation;
        self
    }

    /// Builder method to cloak the unit.
    #[must_use]
    pub fn cloaked(mut self) -> Self {
        self.cloaked = true;
        self
    }

    /// Builder method to set the velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec2Fixed) -> Self {
        self.core.velocity = velocity;
        self
    }

    /// Builder method to add a weapon mount.
    #[must_use]
    pub fn with_turret(mut self, offset: Vec2Fixed, weapon: Weapon) -> Self {
        let index = self.turrets.len() as u32;
        self.turrets.push(Turret::new(index, offset, weapon));
        self
    }

    /// Whether the unit flies (pathfinding ignores obstacles for it).
    #[must_use]
    pub fn is_airborne(&self) -> bool {
        self.elevation.is_airborne()
    }

    /// Physics body for this unit.
    #[must_use]
    pub fn body_desc(&self) -> BodyDesc {
        BodyDesc::new(
            BodyTag::Entity(self.core.id),
            BodyKind::Dynamic,
            Shape::circle(self.radius),
            self.core.position,
        )
        .with_velocity(self.core.velocity)
    }
}

impl Targetable for Unit {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn team(&self) -> TeamId {
        self.team
    }

    fn elevation(&self) -> Elevation {
        self.elevation
    }

    fn target_radius(&self) -> Fixed {
        self.radius
    }

    fn is_cloaked(&self) -> bool {
        self.cloaked
    }
}

/// Projectile-blocking dome around a building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shield {
    /// Coverage radius around the building centre.
    pub radius: Fixed,
    /// Inactive shields let everything through.
    pub active: bool,
    /// Sensor body, present once the building is registered.
    pub body: Option<BodyHandle>,
}

impl Shield {
    /// Create an active shield.
    #[must_use]
    pub const fn new(radius: Fixed) -> Self {
        Self {
            radius,
            active: true,
            body: None,
        }
    }

    /// Check if a point lies inside the shield dome centred on `center`.
    #[must_use]
    pub fn covers(&self, center: Vec2Fixed, point: Vec2Fixed) -> bool {
        center.distance_squared(point) <= self.radius * self.radius
    }
}

/// A static structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Building {
    /// Shared entity state.
    pub core: EntityCore,
    /// Owning team.
    pub team: TeamId,
    /// Half of the footprint width.
    pub half_width: Fixed,
    /// Half of the footprint height.
    pub half_height: Fixed,
    /// Optional shield generator.
    pub shield: Option<Shield>,
    /// Defensive weapon mounts.
    pub turrets: Vec<Turret>,
}

impl Building {
    /// Create a building with an axis-aligned footprint.
    #[must_use]
    pub fn new(
        id: EntityId,
        team: TeamId,
        position: Vec2Fixed,
        width: Fixed,
        height: Fixed,
        max_health: Fixed,
        now: Tick,
    ) -> Self {
        let two = Fixed::from_num(2);
        Self {
            core: EntityCore::new(id, position, max_health, now),
            team,
            half_width: width / two,
            half_height: height / two,
            shield: None,
            turrets: Vec::new(),
        }
    }

    /// Builder method to add a shield generator.
    #[must_use]
    pub fn with_shield(mut self, radius: Fixed) -> Self {
        self.shield = Some(Shield::new(radius));
        self
    }

    /// Builder method to add a weapon mount.
    #[must_use]
    pub fn with_turret(mut self, offset: Vec2Fixed, weapon: Weapon) -> Self {
        let index = self.turrets.len() as u32;
        self.turrets.push(Turret::new(index, offset, weapon));
        self
    }

    /// Footprint shape.
    #[must_use]
    pub fn shape(&self) -> Shape {
        Shape::Rect {
            half_width: self.half_width,
            half_height: self.half_height,
        }
    }

    /// Physics body for the structure itself.
    #[must_use]
    pub fn body_desc(&self) -> BodyDesc {
        BodyDesc::new(
            BodyTag::Entity(self.core.id),
            BodyKind::Static,
            self.shape(),
            self.core.position,
        )
    }

    /// Sensor body for the shield, if any.
    #[must_use]
    pub fn shield_body_desc(&self) -> Option<BodyDesc> {
        self.shield.as_ref().map(|shield| {
            BodyDesc::new(
                BodyTag::Shield(self.core.id),
                BodyKind::Sensor,
                Shape::circle(shield.radius),
                self.core.position,
            )
        })
    }
}

impl Targetable for Building {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn team(&self) -> TeamId {
        self.team
    }

    fn elevation(&self) -> Elevation {
        Elevation::Ground
    }

    fn target_radius(&self) -> Fixed {
        self.shape().bounding_radius()
    }
}

/// A straight piece of defensive wall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallSegment {
    /// Shared entity state; position is the segment midpoint.
    pub core: EntityCore,
    /// Owning team.
    pub team: TeamId,
    /// One end of the wall.
    pub start: Vec2Fixed,
    /// Other end of the wall.
    pub end: Vec2Fixed,
    /// Wall thickness.
    pub thickness: Fixed,
    shape: Shape,
}

impl WallSegment {
    /// Create a wall between two points.
    #[must_use]
    pub fn new(
        id: EntityId,
        team: TeamId,
        start: Vec2Fixed,
        end: Vec2Fixed,
        thickness: Fixed,
        max_health: Fixed,
        now: Tick,
    ) -> Self {
        let (shape, mid) = Shape::segment_box(start, end, thickness);
        Self {
            core: EntityCore::new(id, mid, max_health, now),
            team,
            start,
            end,
            thickness,
            shape,
        }
    }

    /// Collision shape relative to the midpoint.
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Physics body for the wall.
    #[must_use]
    pub fn body_desc(&self) -> BodyDesc {
        BodyDesc::new(
            BodyTag::Entity(self.core.id),
            BodyKind::Static,
            self.shape.clone(),
            self.core.position,
        )
    }
}

impl Targetable for WallSegment {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn team(&self) -> TeamId {
        self.team
    }

    fn elevation(&self) -> Elevation {
        Elevation::Ground
    }

    fn target_radius(&self) -> Fixed {
        self.shape.bounding_radius()
    }
}
