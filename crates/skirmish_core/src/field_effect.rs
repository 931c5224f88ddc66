//! Area effects: explosions, fires, electric fields and friends.
//!
//! A field grows from its initial to its maximum radius over the first
//! half of its lifetime, then holds. Instantaneous categories damage each
//! target at most once; continuous ones damage every tick a target stays
//! inside.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::components::{are_allied, ElevationMask, EntityCore, EntityId, TeamId, Targetable, Tick};
use crate::events::TickEvents;
use crate::geometry::Shape;
use crate::math::{percent, Fixed, Vec2Fixed};
use crate::physics::{BodyDesc, BodyKind, BodyTag};
use crate::units::{Building, Unit, WallSegment};

/// Radius change that forces the sensor shape to be rebuilt. About 0.1.
pub const SENSOR_REBUILD_THRESHOLD: Fixed = Fixed::from_bits(429_496_730);

/// Explosion radius per unit of ordinance size.
pub const EXPLOSION_RADIUS_PER_SIZE: i32 = 15;

/// Explosion damage as a percentage of the projectile's damage.
pub const EXPLOSION_DAMAGE_PERCENT: u32 = 50;

/// Initial explosion radius as a percentage of its maximum.
pub const EXPLOSION_INITIAL_RADIUS_PERCENT: u32 = 20;

/// Explosion lifetime in ticks.
pub const EXPLOSION_DURATION: u64 = 10;

/// Electric field radius per unit of ordinance size.
pub const ELECTRIC_RADIUS_PER_SIZE: i32 = 10;

/// Electric field damage per tick as a percentage of the beam's damage.
pub const ELECTRIC_DAMAGE_PERCENT: u32 = 10;

/// Electric field lifetime in ticks.
pub const ELECTRIC_DURATION: u64 = 40;

/// Kind of area effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldCategory {
    /// Blast from explosive ordinance.
    Explosion,
    /// Burning ground.
    Fire,
    /// Lingering electric discharge.
    Electric,
    /// Shrapnel burst.
    Fragmentation,
    /// Obscuring, abrasive storm.
    Sandstorm,
    /// Anti-air burst.
    FlakBurst,
}

impl FieldCategory {
    /// Instantaneous effects hit each target once; the rest tick.
    #[must_use]
    pub const fn is_instantaneous(self) -> bool {
        matches!(self, Self::Explosion | Self::Fragmentation | Self::FlakBurst)
    }
}

/// Parameters for creating a field effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpawn {
    /// Entity responsible for the effect.
    pub owner: EntityId,
    /// Team of the owner.
    pub team: TeamId,
    /// Effect kind.
    pub category: FieldCategory,
    /// Centre of the effect.
    pub position: Vec2Fixed,
    /// Radius at creation.
    pub initial_radius: Fixed,
    /// Radius once fully grown.
    pub max_radius: Fixed,
    /// Damage at intensity 1 (per hit, or per tick for continuous effects).
    pub damage: Fixed,
    /// Elevations the effect can damage.
    pub elevation_mask: ElevationMask,
    /// Ticks before the effect is armed.
    pub arming_delay: u64,
    /// Lifetime in ticks.
    pub duration: u64,
}

impl FieldSpawn {
    /// Explosion from an explosive projectile of the given ordinance size.
    #[must_use]
    pub fn explosion(
        owner: EntityId,
        team: TeamId,
        position: Vec2Fixed,
        ordinance_size: Fixed,
        projectile_damage: Fixed,
        elevation_mask: ElevationMask,
    ) -> Self {
        let max_radius = ordinance_size * Fixed::from_num(EXPLOSION_RADIUS_PER_SIZE);
        Self {
            owner,
            team,
            category: FieldCategory::Explosion,
            position,
            initial_radius: max_radius * percent(EXPLOSION_INITIAL_RADIUS_PERCENT),
            max_radius,
            damage: projectile_damage * percent(EXPLOSION_DAMAGE_PERCENT),
            elevation_mask,
            arming_delay: 0,
            duration: EXPLOSION_DURATION,
        }
    }

    /// Electric field left by an electric beam.
    #[must_use]
    pub fn electric(
        owner: EntityId,
        team: TeamId,
        position: Vec2Fixed,
        ordinance_size: Fixed,
        beam_damage: Fixed,
        elevation_mask: ElevationMask,
    ) -> Self {
        let radius = ordinance_size * Fixed::from_num(ELECTRIC_RADIUS_PER_SIZE);
        Self {
            owner,
            team,
            category: FieldCategory::Electric,
            position,
            initial_radius: radius,
            max_radius: radius,
            damage: beam_damage * percent(ELECTRIC_DAMAGE_PERCENT),
            elevation_mask,
            arming_delay: 0,
            duration: ELECTRIC_DURATION,
        }
    }
}

/// A live area effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEffect {
    /// Shared entity state.
    pub core: EntityCore,
    /// Entity responsible for the effect.
    pub owner: EntityId,
    /// Team of the owner.
    pub team: TeamId,
    /// Effect kind.
    pub category: FieldCategory,
    /// Current radius.
    pub radius: Fixed,
    /// Radius at creation.
    pub initial_radius: Fixed,
    /// Radius once fully grown.
    pub max_radius: Fixed,
    /// Damage at intensity 1.
    pub damage: Fixed,
    /// Elevations the effect can damage.
    pub elevation_mask: ElevationMask,
    /// Ticks after creation before the effect is armed.
    pub arming_delay: u64,
    /// Lifetime in ticks.
    pub duration: u64,
    /// Targets already hit (instantaneous effects only).
    pub affected: BTreeSet<EntityId>,
    sensor_radius: Fixed,
}

impl FieldEffect {
    /// Create a field effect; it expires `duration` ticks after `now`.
    #[must_use]
    pub fn new(id: EntityId, spawn: FieldSpawn, now: Tick) -> Self {
        let max_radius = spawn.max_radius.max(Fixed::ZERO);
        let initial_radius = spawn.initial_radius.clamp(Fixed::ZERO, max_radius);
        let mut effect = Self {
            core: EntityCore::new(id, spawn.position, Fixed::ONE, now)
                .expiring_at(now.saturating_add(spawn.duration)),
            owner: spawn.owner,
            team: spawn.team,
            category: spawn.category,
            radius: initial_radius,
            initial_radius,
            max_radius,
            damage: spawn.damage,
            elevation_mask: spawn.elevation_mask,
            arming_delay: spawn.arming_delay,
            duration: spawn.duration,
            affected: BTreeSet::new(),
            sensor_radius: initial_radius,
        };
        if effect.duration == 0 {
            effect.radius = max_radius;
            effect.sensor_radius = max_radius;
        }
        effect
    }

    /// Whether each target is hit at most once.
    #[must_use]
    pub const fn is_instantaneous(&self) -> bool {
        self.category.is_instantaneous()
    }

    /// Whether the arming delay has passed.
    #[must_use]
    pub fn is_armed(&self, now: Tick) -> bool {
        self.arming_delay == 0 || now > self.core.created_at.saturating_add(self.arming_delay)
    }

    /// Radius the effect should have at `now`.
    ///
    /// Linear growth over the first half of the lifetime, then constant.
    #[must_use]
    pub fn radius_at(&self, now: Tick) -> Fixed {
        let half = Fixed::from_num(self.duration) / Fixed::from_num(2);
        if half == Fixed::ZERO {
            return self.max_radius;
        }
        let progress = (Fixed::from_num(self.core.age(now)) / half).min(Fixed::ONE);
        self.initial_radius + (self.max_radius - self.initial_radius) * progress
    }

    /// Advance the radius. Returns `true` when the sensor shape needs rebuilding.
    pub fn update_radius(&mut self, now: Tick) -> bool {
        let next = self.radius_at(now).clamp(self.radius, self.max_radius);
        self.radius = next;
        if (next - self.sensor_radius).abs() > SENSOR_REBUILD_THRESHOLD {
            self.sensor_radius = next;
            return true;
        }
        false
    }

    /// Radius of the sensor shape last given to physics.
    #[must_use]
    pub const fn sensor_radius(&self) -> Fixed {
        self.sensor_radius
    }

    /// Intensity of the effect at a world point.
    ///
    /// Zero outside the current radius. Explosions scale as
    /// `0.5 + 0.5 × distance / radius`, so the rim is hit harder than the
    /// centre; every other category is uniform.
    #[must_use]
    pub fn intensity_at(&self, point: Vec2Fixed) -> Fixed {
        let distance = self.core.position.distance(point);
        if distance > self.radius {
            return Fixed::ZERO;
        }
        match self.category {
            FieldCategory::Explosion => {
                let half = Fixed::from_num(0.5);
                if self.radius == Fixed::ZERO {
                    return half;
                }
                half + half * (distance / self.radius)
            }
            _ => Fixed::ONE,
        }
    }

    /// Damage dealt at a world point.
    #[must_use]
    pub fn damage_at(&self, point: Vec2Fixed) -> Fixed {
        self.damage * self.intensity_at(point)
    }

    /// Check whether the effect may damage `target`.
    #[must_use]
    pub fn can_affect(&self, target: &dyn Targetable) -> bool {
        if !target.is_active() || target.id() == self.owner {
            return false;
        }
        if !self.elevation_mask.permits(target.elevation()) {
            return false;
        }
        if are_allied(self.team, target.team()) {
            return false;
        }
        !(self.is_instantaneous() && self.affected.contains(&target.id()))
    }

    /// Physics sensor for the current radius.
    #[must_use]
    pub fn body_desc(&self) -> BodyDesc {
        BodyDesc::new(
            BodyTag::Entity(self.core.id),
            BodyKind::Sensor,
            Shape::circle(self.sensor_radius),
            self.core.position,
        )
    }

    /// Damage every eligible target overlapping the effect.
    fn strike(&mut self, target: &mut dyn Targetable, events: &mut TickEvents) {
        if !self.can_affect(target) {
            return;
        }
        let center = self.core.position;
        let distance = center.distance(target.position());
        if distance > self.radius + target.target_radius() {
            return;
        }

        // Targets overlapping the rim are evaluated at the rim.
        let probe = if distance > self.radius && distance > Fixed::ZERO {
            center.lerp(target.position(), self.radius / distance)
        } else {
            target.position()
        };
        let amount = self.damage_at(probe);
        if self.is_instantaneous() {
            self.affected.insert(target.id());
        }
        if amount <= Fixed::ZERO {
            return;
        }
        let killed = target.core_mut().apply_damage(amount);
        events.damage(target.id(), self.core.id, amount, killed);
    }

    /// Per-tick damage pass over units, buildings and walls, in id order.
    pub fn apply_damage(
        &mut self,
        units: &mut BTreeMap<EntityId, Unit>,
        buildings: &mut BTreeMap<EntityId, Building>,
        walls: &mut BTreeMap<EntityId, WallSegment>,
        now: Tick,
        events: &mut TickEvents,
    ) {
        if !self.core.active || !self.is_armed(now) {
            return;
        }
        for unit in units.values_mut() {
            self.strike(unit, events);
        }
        for building in buildings.values_mut() {
            self.strike(building, events);
        }
        for wall in walls.values_mut() {
            self.strike(wall, events);
        }
    }

    /// Per-tick update: deactivate when expired, else grow.
    ///
    /// Returns `true` when the sensor shape needs rebuilding.
    pub fn update(&mut self, now: Tick) -> bool {
        if !self.core.active {
            return false;
        }
        if self.core.is_expired(now) {
            self.core.deactivate();
            return false;
        }
        self.update_radius(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Elevation;

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn vec2(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::from_ints(x, y)
    }

    fn spawn(category: FieldCategory, initial: i32, max: i32, duration: u64) -> FieldSpawn {
        FieldSpawn {
            owner: 1,
            team: 1,
            category,
            position: vec2(0, 0),
            initial_radius: fixed(initial),
            max_radius: fixed(max),
            damage: fixed(100),
            elevation_mask: ElevationMask::ALL,
            arming_delay: 0,
            duration,
        }
    }

    #[test]
    fn test_explosion_intensity_increases_outward() {
        // Rim hits harder than the centre. Unusual for an explosion, but
        // this is the established balance formula; keep it pinned.
        let mut effect = FieldEffect::new(10, spawn(FieldCategory::Explosion, 50, 50, 10), 0);
        effect.radius = fixed(50);
        assert_eq!(effect.damage_at(vec2(25, 0)), fixed(75));
        assert_eq!(effect.damage_at(vec2(0, 0)), fixed(50));
        assert_eq!(effect.damage_at(vec2(50, 0)), fixed(100));
        assert_eq!(effect.damage_at(vec2(51, 0)), Fixed::ZERO);
    }

    #[test]
    fn test_uniform_intensity_for_other_categories() {
        let effect = FieldEffect::new(10, spawn(FieldCategory::Fire, 30, 30, 20), 0);
        assert_eq!(effect.intensity_at(vec2(0, 0)), Fixed::ONE);
        assert_eq!(effect.intensity_at(vec2(29, 0)), Fixed::ONE);
        assert_eq!(effect.intensity_at(vec2(31, 0)), Fixed::ZERO);
    }

    #[test]
    fn test_radius_grows_during_first_half() {
        let mut effect = FieldEffect::new(10, spawn(FieldCategory::Explosion, 10, 50, 8), 0);
        assert_eq!(effect.radius, fixed(10));
        effect.update(1);
        assert_eq!(effect.radius, fixed(20));
        effect.update(4);
        assert_eq!(effect.radius, fixed(50));
        effect.update(6);
        assert_eq!(effect.radius, fixed(50));
        effect.update(8);
        assert!(!effect.core.active);
    }

    #[test]
    fn test_zero_duration_is_fully_grown() {
        let effect = FieldEffect::new(10, spawn(FieldCategory::FlakBurst, 5, 40, 0), 0);
        assert_eq!(effect.radius, fixed(40));
        assert_eq!(effect.radius_at(0), fixed(40));
    }

    #[test]
    fn test_sensor_rebuild_threshold() {
        let mut effect = FieldEffect::new(10, spawn(FieldCategory::Fire, 10, 11, 200), 0);
        // 1/100 of a unit per tick: no rebuild until the change exceeds 0.1.
        assert!(!effect.update_radius(5));
        assert!(effect.update_radius(20));
        assert_eq!(effect.sensor_radius(), effect.radius);
    }

    #[test]
    fn test_arming_delay() {
        let mut s = spawn(FieldCategory::Fire, 10, 10, 100);
        s.arming_delay = 5;
        let effect = FieldEffect::new(10, s, 100);
        assert!(!effect.is_armed(104));
        assert!(!effect.is_armed(105));
        assert!(effect.is_armed(106));
    }

    #[test]
    fn test_can_affect_rules() {
        let mut effect = FieldEffect::new(10, spawn(FieldCategory::Explosion, 20, 20, 10), 0);
        let enemy = Unit::new(2, 2, vec2(5, 0), fixed(2), fixed(100), 0);
        let ally = Unit::new(3, 1, vec2(5, 0), fixed(2), fixed(100), 0);
        let owner = Unit::new(1, 2, vec2(0, 0), fixed(2), fixed(100), 0);
        assert!(effect.can_affect(&enemy));
        assert!(!effect.can_affect(&ally));
        assert!(!effect.can_affect(&owner));

        effect.affected.insert(2);
        assert!(!effect.can_affect(&enemy));

        let mut flak = spawn(FieldCategory::FlakBurst, 20, 20, 10);
        flak.elevation_mask = ElevationMask::AIR;
        let flak = FieldEffect::new(11, flak, 0);
        let flyer = Unit::new(4, 2, vec2(5, 0), fixed(2), fixed(100), 0)
            .with_elevation(Elevation::High);
        assert!(!flak.can_affect(&enemy));
        assert!(flak.can_affect(&flyer));
    }

    #[test]
    fn test_ffa_team_hits_everyone() {
        let mut s = spawn(FieldCategory::Fire, 20, 20, 10);
        s.team = 0;
        let effect = FieldEffect::new(10, s, 0);
        let other_ffa = Unit::new(2, 0, vec2(5, 0), fixed(2), fixed(100), 0);
        assert!(effect.can_affect(&other_ffa));
    }

    #[test]
    fn test_instantaneous_damage_once_continuous_every_tick() {
        let mut units = BTreeMap::new();
        units.insert(2, Unit::new(2, 2, vec2(10, 0), fixed(2), fixed(1000), 0));
        let mut buildings = BTreeMap::new();
        let mut walls = BTreeMap::new();
        let mut events = TickEvents::new(0);

        let mut blast = FieldEffect::new(10, spawn(FieldCategory::Explosion, 20, 20, 10), 0);
        for tick in 0..3 {
            blast.apply_damage(&mut units, &mut buildings, &mut walls, tick, &mut events);
        }
        assert_eq!(events.damage_to(2), fixed(75));

        let mut fire = FieldEffect::new(11, spawn(FieldCategory::Fire, 20, 20, 10), 0);
        let mut events = TickEvents::new(0);
        for tick in 0..3 {
            fire.apply_damage(&mut units, &mut buildings, &mut walls, tick, &mut events);
        }
        assert_eq!(events.damage_to(2), fixed(300));
    }
}
