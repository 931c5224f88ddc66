//! Ordinance catalog: what each weapon payload does.
//!
//! Values are integer percents and world units in the same table style as
//! the damage matrices, so the catalog stays exact in fixed-point.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::ElevationMask;
use crate::math::{percent, Fixed};

/// Payload category of a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum OrdinanceType {
    /// Small-calibre kinetic rounds.
    #[default]
    Bullet,
    /// Self-propelled explosive.
    Rocket,
    /// Artillery shell, explosive.
    Shell,
    /// Anti-air burst round, explosive.
    Flak,
    /// Hit-scan laser.
    Laser,
    /// Hit-scan piercing slug.
    Railgun,
    /// Hit-scan arc that leaves an electric field.
    Tesla,
}

/// How an ordinance reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Delivery {
    /// A moving projectile resolved by contact arbitration.
    Projectile,
    /// An instant hit-scan beam resolved at construction.
    Beam,
}

/// A modifier on ordinance that changes how contacts resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BulletEffect {
    /// Spawns an explosion on impact.
    Explosive,
    /// Continues through units after hitting them.
    Piercing,
    /// Sets targets alight.
    Incendiary,
    /// Leaves an electric field at the impact point.
    Electric,
}

impl BulletEffect {
    const fn bit(self) -> u8 {
        match self {
            Self::Explosive => 0b0001,
            Self::Piercing => 0b0010,
            Self::Incendiary => 0b0100,
            Self::Electric => 0b1000,
        }
    }
}

/// Set of bullet effects carried by a projectile or beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BulletEffects(u8);

impl BulletEffects {
    /// No effects.
    pub const NONE: Self = Self(0);

    /// Build a set from a list of effects.
    #[must_use]
    pub fn from_effects(effects: &[BulletEffect]) -> Self {
        Self(effects.iter().fold(0, |acc, e| acc | e.bit()))
    }

    /// Add an effect (builder style).
    #[must_use]
    pub const fn with(self, effect: BulletEffect) -> Self {
        Self(self.0 | effect.bit())
    }

    /// Check membership.
    #[must_use]
    pub const fn contains(self, effect: BulletEffect) -> bool {
        self.0 & effect.bit() != 0
    }

    /// Union of two sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Static parameters of an ordinance type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrdinanceSpec {
    /// Damage multiplier in percent of the weapon's base damage.
    pub damage_percent: u32,
    /// Payload size in world units (explosion radius is `size × 15`).
    pub size: Fixed,
    /// Projectile speed multiplier in percent.
    pub speed_percent: u32,
    /// Elevations this ordinance can hit.
    pub elevation_mask: ElevationMask,
    /// Projectile or beam.
    pub delivery: Delivery,
    /// Whether impacts spawn an explosion.
    pub explosive: bool,
    /// Effects every round of this ordinance carries.
    pub default_effects: BulletEffects,
    /// Beam visibility in ticks (unused for projectiles).
    pub beam_duration: u64,
}

impl OrdinanceSpec {
    /// Damage multiplier as a fraction.
    #[must_use]
    pub fn damage_scale(&self) -> Fixed {
        percent(self.damage_percent)
    }

    /// Speed multiplier as a fraction.
    #[must_use]
    pub fn speed_scale(&self) -> Fixed {
        percent(self.speed_percent)
    }
}

impl OrdinanceType {
    /// Built-in catalog entry for this ordinance.
    #[must_use]
    pub fn spec(self) -> OrdinanceSpec {
        use BulletEffect::{Electric, Explosive, Piercing};
        use Delivery::{Beam, Projectile};
        use ElevationMask as M;

        let fx = BulletEffects::NONE;
        let (damage_percent, size, speed_percent, elevation_mask, delivery, explosive, effects) =
            match self {
                Self::Bullet => (100, 1, 100, M::SURFACE_AND_LOW, Projectile, false, fx),
                Self::Rocket => (150, 2, 75, M::ALL, Projectile, true, fx.with(Explosive)),
                Self::Shell => (200, 3, 60, M::GROUND, Projectile, true, fx.with(Explosive)),
                Self::Flak => (80, 2, 120, M::AIR, Projectile, true, fx.with(Explosive)),
                Self::Laser => (100, 1, 100, M::ALL, Beam, false, fx),
                Self::Railgun => (250, 1, 100, M::SURFACE_AND_LOW, Beam, false, fx.with(Piercing)),
                Self::Tesla => (75, 2, 100, M::SURFACE_AND_LOW, Beam, false, fx.with(Electric)),
            };

        OrdinanceSpec {
            damage_percent,
            size: Fixed::from_num(size),
            speed_percent,
            elevation_mask,
            delivery,
            explosive,
            default_effects: effects,
            beam_duration: 6,
        }
    }

    /// Check if this ordinance is delivered as a beam.
    #[must_use]
    pub fn is_beam(self) -> bool {
        self.spec().delivery == Delivery::Beam
    }

    /// Check if impacts of this ordinance explode.
    #[must_use]
    pub fn is_explosive(self) -> bool {
        self.spec().explosive
    }

    /// All ordinance types.
    pub const ALL: [Self; 7] = [
        Self::Bullet,
        Self::Rocket,
        Self::Shell,
        Self::Flak,
        Self::Laser,
        Self::Railgun,
        Self::Tesla,
    ];
}

/// Ordinance parameters in effect for a match: the built-in table plus
/// any data-driven overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdinanceCatalog {
    entries: BTreeMap<OrdinanceType, OrdinanceSpec>,
}

impl OrdinanceCatalog {
    /// Catalog with the built-in values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: OrdinanceType::ALL.iter().map(|&t| (t, t.spec())).collect(),
        }
    }

    /// Look up an ordinance.
    #[must_use]
    pub fn get(&self, ordinance: OrdinanceType) -> OrdinanceSpec {
        self.entries
            .get(&ordinance)
            .copied()
            .unwrap_or_else(|| ordinance.spec())
    }

    /// Replace the entry for one ordinance.
    pub fn set(&mut self, ordinance: OrdinanceType, spec: OrdinanceSpec) {
        self.entries.insert(ordinance, spec);
    }
}

impl Default for OrdinanceCatalog {
    fn default() -> Self {
        Self::new()
    }
}
