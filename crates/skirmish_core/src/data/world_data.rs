//! World dimensions and navigation settings.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::Fixed;
use crate::pathfinding::PATH_CELL_SIZE;
use crate::targeting::CLOAK_DETECTION_RANGE;

/// Playable area and tuning that depends on it.
///
/// # Example RON
///
/// ```ron
/// WorldConfig(
///     width: 1024,
///     height: 768,
///     path_cell_size: 16,
///     cloak_detection_range: 96,
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// World width in world units.
    pub width: u32,
    /// World height in world units.
    pub height: u32,
    /// A* grid cell size.
    #[serde(default = "default_cell_size")]
    pub path_cell_size: u32,
    /// Range within which cloaked targets can be acquired.
    #[serde(default = "default_cloak_range")]
    pub cloak_detection_range: u32,
}

const fn default_cell_size() -> u32 {
    PATH_CELL_SIZE as u32
}

const fn default_cloak_range() -> u32 {
    CLOAK_DETECTION_RANGE as u32
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 2048,
            height: 2048,
            path_cell_size: default_cell_size(),
            cloak_detection_range: default_cloak_range(),
        }
    }
}

impl WorldConfig {
    /// Parse from a RON string.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GameError::DataParseError`] on malformed input.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        super::parse_ron(source, super::INLINE_SOURCE)
    }

    /// World width as a fixed-point value.
    #[must_use]
    pub fn width(&self) -> Fixed {
        Fixed::from_num(self.width)
    }

    /// World height as a fixed-point value.
    #[must_use]
    pub fn height(&self) -> Fixed {
        Fixed::from_num(self.height)
    }

    /// Grid cell size, never below one unit.
    #[must_use]
    pub fn cell_size(&self) -> Fixed {
        Fixed::from_num(self.path_cell_size.max(1))
    }

    /// Cloak detection range as a fixed-point value.
    #[must_use]
    pub fn cloak_range(&self) -> Fixed {
        Fixed::from_num(self.cloak_detection_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = WorldConfig::from_ron_str("WorldConfig(width: 640, height: 480)").unwrap();
        assert_eq!(config.width(), Fixed::from_num(640));
        assert_eq!(config.height(), Fixed::from_num(480));
        assert_eq!(config.cell_size(), Fixed::from_num(PATH_CELL_SIZE));
        assert_eq!(config.cloak_range(), Fixed::from_num(CLOAK_DETECTION_RANGE));
    }

    #[test]
    fn test_zero_cell_size_is_clamped() {
        let config = WorldConfig {
            path_cell_size: 0,
            ..WorldConfig::default()
        };
        assert_eq!(config.cell_size(), Fixed::ONE);
    }
}
