//! Nearest-enemy search and lead aiming.
//!
//! Searches are pure queries over the registry; they never mutate state.
//! Range is measured to the target's edge (centre distance minus its
//! radius). Ties go to the first target found in id order, units before
//! buildings before walls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{is_hostile, ElevationMask, EntityId, TeamId, Targetable};
use crate::math::{isqrt_u128, Fixed, Vec2Fixed};
use crate::registry::EntityRegistry;
use crate::units::Unit;

/// Range at which cloaked targets can be found. Overrides longer weapon ranges.
pub const CLOAK_DETECTION_RANGE: i32 = 96;

/// Targets slower than this (units per tick) are aimed at directly.
pub const MIN_TARGET_SPEED: Fixed = Fixed::from_bits(67_108_864);

/// Furthest ahead, in ticks, an intercept is projected (3 seconds).
pub const MAX_INTERCEPT_TICKS: i64 = 60;

/// Reference to something a weapon can aim at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetRef {
    /// A unit.
    Unit(EntityId),
    /// A building.
    Building(EntityId),
    /// A wall segment.
    Wall(EntityId),
}

impl TargetRef {
    /// Entity id of the target.
    #[must_use]
    pub const fn id(self) -> EntityId {
        match self {
            Self::Unit(id) | Self::Building(id) | Self::Wall(id) => id,
        }
    }

    /// Look the target up in the registry.
    #[must_use]
    pub fn resolve(self, registry: &EntityRegistry) -> Option<&dyn Targetable> {
        match self {
            Self::Unit(id) => registry.units.get(&id).map(|u| u as &dyn Targetable),
            Self::Building(id) => registry.buildings.get(&id).map(|b| b as &dyn Targetable),
            Self::Wall(id) => registry.walls.get(&id).map(|w| w as &dyn Targetable),
        }
    }

    /// Check if the target still exists and is alive.
    #[must_use]
    pub fn is_alive(self, registry: &EntityRegistry) -> bool {
        self.resolve(registry).is_some_and(|t| t.is_active())
    }
}

/// Who is searching, from where, and for what.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetQuery {
    /// Search origin.
    pub position: Vec2Fixed,
    /// Searching team.
    pub team: TeamId,
    /// Elevations the searching weapon can hit.
    pub elevation_mask: ElevationMask,
    /// Search range.
    pub range: Fixed,
    /// Range at which cloaked targets are visible.
    pub cloak_range: Fixed,
    /// Entity never returned (the searcher itself).
    pub exclude: Option<EntityId>,
}

impl TargetQuery {
    /// Query with the default cloak detection range.
    #[must_use]
    pub fn new(
        position: Vec2Fixed,
        team: TeamId,
        elevation_mask: ElevationMask,
        range: Fixed,
    ) -> Self {
        Self {
            position,
            team,
            elevation_mask,
            range,
            cloak_range: Fixed::from_num(CLOAK_DETECTION_RANGE),
            exclude: None,
        }
    }

    /// Builder method to skip the searcher.
    #[must_use]
    pub fn excluding(mut self, id: EntityId) -> Self {
        self.exclude = Some(id);
        self
    }

    /// Builder method to override the cloak detection range.
    #[must_use]
    pub fn with_cloak_range(mut self, range: Fixed) -> Self {
        self.cloak_range = range;
        self
    }

    /// Edge distance to `target` if it passes every filter.
    fn score(&self, target: &dyn Targetable) -> Option<Fixed> {
        if !target.is_active()
            || Some(target.id()) == self.exclude
            || !is_hostile(self.team, target.team())
            || !self.elevation_mask.permits(target.elevation())
        {
            return None;
        }

        let distance = (self.position.distance(target.position()) - target.target_radius())
            .max(Fixed::ZERO);
        let limit = if target.is_cloaked() {
            self.range.min(self.cloak_range)
        } else {
            self.range
        };
        (distance <= limit).then_some(distance)
    }
}

/// Strict-minimum selection: later candidates must be strictly closer.
fn nearest<'a, T: Targetable + 'a, R>(
    query: &TargetQuery,
    candidates: impl IntoIterator<Item = &'a T>,
    wrap: impl Fn(EntityId) -> R,
    best: &mut Option<(Fixed, R)>,
) {
    for candidate in candidates {
        if let Some(distance) = query.score(candidate) {
            if best.as_ref().map_or(true, |(d, _)| distance < *d) {
                *best = Some((distance, wrap(candidate.id())));
            }
        }
    }
}

/// Nearest visible enemy unit.
#[must_use]
pub fn find_nearest_enemy_unit(
    units: &BTreeMap<EntityId, Unit>,
    query: &TargetQuery,
) -> Option<EntityId> {
    let mut best = None;
    nearest(query, units.values(), |id| id, &mut best);
    best.map(|(_, id)| id)
}

/// Nearest visible enemy across units, buildings and walls.
///
/// Buildings and walls only count when the searching weapon can hit ground.
#[must_use]
pub fn find_nearest_enemy_targetable(
    registry: &EntityRegistry,
    query: &TargetQuery,
) -> Option<TargetRef> {
    let mut best = None;
    nearest(query, registry.units.values(), TargetRef::Unit, &mut best);
    if query.elevation_mask.targets_ground() {
        nearest(query, registry.buildings.values(), TargetRef::Building, &mut best);
        nearest(query, registry.walls.values(), TargetRef::Wall, &mut best);
    }
    best.map(|(_, target)| target)
}

/// Where to aim so a projectile of `projectile_speed` meets a moving target.
///
/// Solves `|d + v·t|² = (s·t)²` for the smallest positive `t`, clamped to
/// [`MAX_INTERCEPT_TICKS`]. Slow targets, non-positive speeds and
/// unsolvable cases aim at the target's current position.
#[must_use]
pub fn intercept_point(
    shooter: Vec2Fixed,
    target_position: Vec2Fixed,
    target_velocity: Vec2Fixed,
    projectile_speed: Fixed,
) -> Vec2Fixed {
    if projectile_speed <= Fixed::ZERO || target_velocity.length() < MIN_TARGET_SPEED {
        return target_position;
    }

    // Raw bits carry a 2^32 scale; products are rescaled by >> 32 so every
    // coefficient stays at the same scale as a Fixed.
    let d = target_position - shooter;
    let (dx, dy) = (i128::from(d.x.to_bits()), i128::from(d.y.to_bits()));
    let (vx, vy) = (
        i128::from(target_velocity.x.to_bits()),
        i128::from(target_velocity.y.to_bits()),
    );
    let s = i128::from(projectile_speed.to_bits());

    let a = (vx * vx + vy * vy - s * s) >> 32;
    let b = (2 * (dx * vx + dy * vy)) >> 32;
    let c = (dx * dx + dy * dy) >> 32;

    let Some(t_bits) = smallest_positive_root(a, b, c) else {
        return target_position;
    };
    let t_bits = t_bits.min(i128::from(MAX_INTERCEPT_TICKS) << 32);
    let Ok(t_bits) = i64::try_from(t_bits) else {
        return target_position;
    };
    target_position + target_velocity.scale(Fixed::from_bits(t_bits))
}

/// Smallest positive root of `a·t² + b·t + c`, all at 2^32 scale.
fn smallest_positive_root(a: i128, b: i128, c: i128) -> Option<i128> {
    if a == 0 {
        // Equal speeds: linear in t.
        if b >= 0 {
            return None;
        }
        let t = (c << 32) / -b;
        return (t > 0).then_some(t);
    }

    let disc = b * b - 4 * a * c;
    if disc < 0 {
        return None;
    }
    let root = i128::try_from(isqrt_u128(disc.unsigned_abs())).ok()?;
    let denom = 2 * a;
    let t1 = ((-b - root) << 32) / denom;
    let t2 = ((-b + root) << 32) / denom;
    match (t1 > 0, t2 > 0) {
        (true, true) => Some(t1.min(t2)),
        (true, false) => Some(t1),
        (false, true) => Some(t2),
        (false, false) => None,
    }
}
