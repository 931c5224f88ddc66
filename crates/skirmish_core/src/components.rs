//! Shared simulation value types.
//!
//! Every live object embeds an [`EntityCore`]; anything weapons can shoot at
//! additionally implements [`Targetable`].

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Vec2Fixed};
use crate::physics::BodyHandle;

/// Unique identifier for entities.
pub type EntityId = u64;

/// Team identifier. Team [`FFA_TEAM`] is hostile to everyone.
pub type TeamId = u8;

/// Simulation time in ticks.
pub type Tick = u64;

/// "Free for all" team: hostile to every other entity, including other FFA members.
pub const FFA_TEAM: TeamId = 0;

/// Check if two teams are allied.
///
/// Teams are allied only when they share a team id other than [`FFA_TEAM`].
#[must_use]
pub const fn are_allied(a: TeamId, b: TeamId) -> bool {
    a == b && a != FFA_TEAM
}

/// Check if two teams are hostile to each other.
#[must_use]
pub const fn is_hostile(a: TeamId, b: TeamId) -> bool {
    !are_allied(a, b)
}

/// Altitude class of a target, used to gate which weapons can hit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Elevation {
    /// Ground units, buildings, walls.
    #[default]
    Ground,
    /// Low-altitude aircraft.
    Low,
    /// High-altitude aircraft.
    High,
}

impl Elevation {
    /// Check if this elevation is airborne.
    #[must_use]
    pub const fn is_airborne(self) -> bool {
        !matches!(self, Self::Ground)
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Ground => 0b001,
            Self::Low => 0b010,
            Self::High => 0b100,
        }
    }
}

/// Set of elevations a weapon or effect is able to hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElevationMask(u8);

impl ElevationMask {
    /// Hits nothing.
    pub const NONE: Self = Self(0);
    /// Ground targets only.
    pub const GROUND: Self = Self(0b001);
    /// Low-altitude targets only.
    pub const LOW: Self = Self(0b010);
    /// High-altitude targets only.
    pub const HIGH: Self = Self(0b100);
    /// Ground and low-altitude targets.
    pub const SURFACE_AND_LOW: Self = Self(0b011);
    /// Low and high altitude targets.
    pub const AIR: Self = Self(0b110);
    /// Every elevation.
    pub const ALL: Self = Self(0b111);

    /// Build a mask from a list of elevations.
    #[must_use]
    pub fn from_elevations(elevations: &[Elevation]) -> Self {
        Self(elevations.iter().fold(0, |acc, e| acc | e.bit()))
    }

    /// Check if this mask permits hitting the given elevation.
    #[must_use]
    pub const fn permits(self, elevation: Elevation) -> bool {
        self.0 & elevation.bit() != 0
    }

    /// Check if ground targets (including buildings and walls) can be hit.
    #[must_use]
    pub const fn targets_ground(self) -> bool {
        self.permits(Elevation::Ground)
    }

    /// Union of two masks.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl Default for ElevationMask {
    fn default() -> Self {
        Self::GROUND
    }
}

/// State shared by every live simulation entity.
///
/// Position, velocity and rotation are cached copies of the physics body's
/// transform, refreshed once per tick; the physics world owns the truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCore {
    /// Unique, immutable identifier.
    pub id: EntityId,
    /// Physics body, present once the entity is registered.
    pub body: Option<BodyHandle>,
    /// Cached world position.
    pub position: Vec2Fixed,
    /// Cached velocity in world units per tick.
    pub velocity: Vec2Fixed,
    /// Cached rotation in radians.
    pub rotation: Fixed,
    /// Current health.
    pub health: Fixed,
    /// Maximum health.
    pub max_health: Fixed,
    /// Inactive entities produce no further gameplay effects.
    pub active: bool,
    /// Absolute expiry tick, if the entity is transient.
    pub expires_at: Option<Tick>,
    /// Tick on which the entity was created.
    pub created_at: Tick,
}

impl EntityCore {
    /// Create an active entity at full health.
    #[must_use]
    pub fn new(id: EntityId, position: Vec2Fixed, max_health: Fixed, created_at: Tick) -> Self {
        Self {
            id,
            body: None,
            position,
            velocity: Vec2Fixed::ZERO,
            rotation: Fixed::ZERO,
            health: max_health,
            max_health,
            active: true,
            expires_at: None,
            created_at,
        }
    }

    /// Set the velocity (builder style).
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec2Fixed) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set an absolute expiry tick (builder style).
    #[must_use]
    pub fn expiring_at(mut self, tick: Tick) -> Self {
        self.expires_at = Some(tick);
        self
    }

    /// Apply damage. Returns `true` if this damage destroyed the entity.
    ///
    /// Damage to an already inactive entity is ignored.
    pub fn apply_damage(&mut self, amount: Fixed) -> bool {
        if !self.active || amount <= Fixed::ZERO {
            return false;
        }
        self.health -= amount;
        if self.health <= Fixed::ZERO {
            self.active = false;
            return true;
        }
        false
    }

    /// Mark the entity inactive.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Check if the entity has passed its expiry tick.
    #[must_use]
    pub fn is_expired(&self, now: Tick) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Ticks elapsed since creation.
    #[must_use]
    pub fn age(&self, now: Tick) -> Tick {
        now.saturating_sub(self.created_at)
    }
}

/// Capability shared by everything weapons and searches can aim at.
///
/// Units, buildings and wall segments implement this.
pub trait Targetable {
    /// Shared entity state.
    fn core(&self) -> &EntityCore;

    /// Mutable shared entity state.
    fn core_mut(&mut self) -> &mut EntityCore;

    /// Owning team.
    fn team(&self) -> TeamId;

    /// Altitude class.
    fn elevation(&self) -> Elevation;

    /// Radius used for hit and range math.
    fn target_radius(&self) -> Fixed;

    /// Whether the target is currently cloaked.
    fn is_cloaked(&self) -> bool {
        false
    }

    /// Entity id.
    fn id(&self) -> EntityId {
        self.core().id
    }

    /// Cached world position.
    fn position(&self) -> Vec2Fixed {
        self.core().position
    }

    /// Cached velocity.
    fn velocity(&self) -> Vec2Fixed {
        self.core().velocity
    }

    /// Whether the target is still alive.
    fn is_active(&self) -> bool {
        self.core().active
    }

    /// Current health.
    fn health(&self) -> Fixed {
        self.core().health
    }
}
