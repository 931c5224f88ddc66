//! Data-driven overrides of the built-in ordinance table.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::math::Fixed;
use crate::ordinance::{OrdinanceCatalog, OrdinanceType};

/// Override for one ordinance type. Missing fields keep the built-in value.
///
/// # Example RON
///
/// ```ron
/// [
///     OrdinanceData(ordinance: Rocket, damage_percent: Some(180)),
///     OrdinanceData(ordinance: Shell, size: Some(4), speed_percent: Some(50)),
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdinanceData {
    /// Ordinance being tuned.
    pub ordinance: OrdinanceType,
    /// Damage multiplier in percent.
    #[serde(default)]
    pub damage_percent: Option<u32>,
    /// Payload size in world units.
    #[serde(default)]
    pub size: Option<u32>,
    /// Projectile speed multiplier in percent.
    #[serde(default)]
    pub speed_percent: Option<u32>,
    /// Beam visibility in ticks.
    #[serde(default)]
    pub beam_duration: Option<u64>,
}

impl OrdinanceData {
    /// Parse a list of overrides from a RON string.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GameError::DataParseError`] on malformed input.
    pub fn list_from_ron_str(source: &str) -> Result<Vec<Self>> {
        super::parse_ron(source, super::INLINE_SOURCE)
    }

    /// Apply this override to a catalog.
    pub fn apply(&self, catalog: &mut OrdinanceCatalog) {
        let mut spec = catalog.get(self.ordinance);
        if let Some(damage_percent) = self.damage_percent {
            spec.damage_percent = damage_percent;
        }
        if let Some(size) = self.size {
            spec.size = Fixed::from_num(size);
        }
        if let Some(speed_percent) = self.speed_percent {
            spec.speed_percent = speed_percent;
        }
        if let Some(duration) = self.beam_duration {
            spec.beam_duration = duration;
        }
        debug!(ordinance = ?self.ordinance, "ordinance override applied");
        catalog.set(self.ordinance, spec);
    }
}

/// Catalog with the built-in table plus `overrides`, applied in order.
#[must_use]
pub fn apply_overrides(overrides: &[OrdinanceData]) -> OrdinanceCatalog {
    let mut catalog = OrdinanceCatalog::new();
    for entry in overrides {
        entry.apply(&mut catalog);
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_from_ron() {
        let source = r"[
            OrdinanceData(ordinance: Rocket, damage_percent: Some(180)),
            OrdinanceData(ordinance: Shell, size: Some(4), speed_percent: Some(50)),
        ]";
        let overrides = OrdinanceData::list_from_ron_str(source).unwrap();
        let catalog = apply_overrides(&overrides);

        let rocket = catalog.get(OrdinanceType::Rocket);
        assert_eq!(rocket.damage_percent, 180);
        assert_eq!(rocket.size, OrdinanceType::Rocket.spec().size);

        let shell = catalog.get(OrdinanceType::Shell);
        assert_eq!(shell.size, Fixed::from_num(4));
        assert_eq!(shell.speed_percent, 50);
        assert_eq!(shell.damage_percent, 200);

        assert_eq!(catalog.get(OrdinanceType::Bullet), OrdinanceType::Bullet.spec());
    }

    #[test]
    fn test_later_override_wins() {
        let overrides = vec![
            OrdinanceData {
                ordinance: OrdinanceType::Laser,
                damage_percent: Some(90),
                size: None,
                speed_percent: None,
                beam_duration: None,
            },
            OrdinanceData {
                ordinance: OrdinanceType::Laser,
                damage_percent: Some(120),
                size: None,
                speed_percent: None,
                beam_duration: Some(10),
            },
        ];
        let laser = apply_overrides(&overrides).get(OrdinanceType::Laser);
        assert_eq!(laser.damage_percent, 120);
        assert_eq!(laser.beam_duration, 10);
    }
}
