//! Scenario loading and configuration.
//!
//! Scenarios define the starting state of a headless run: world size,
//! ordinance tuning, and the units, buildings, obstacles and walls on the
//! map. Coordinates and stats are integers in world units; they become
//! fixed-point values when the simulation is built.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use skirmish_core::components::{Elevation, EntityId, TeamId, Tick};
use skirmish_core::data::{apply_overrides, OrdinanceData, WorldConfig};
use skirmish_core::math::{Fixed, Vec2Fixed};
use skirmish_core::obstacle::Obstacle;
use skirmish_core::ordinance::OrdinanceType;
use skirmish_core::simulation::Simulation;
use skirmish_core::units::{Building, Unit, WallSegment, Weapon};
use skirmish_core::GameError;

/// Ticks simulated when neither the scenario nor the caller says otherwise.
pub const DEFAULT_TICKS: Tick = 600;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Values that cannot describe a playable match.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
    /// The simulation rejected an entity.
    #[error("Simulation error: {0}")]
    Simulation(#[from] GameError),
}

/// A weapon mounted on a unit or building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponSpec {
    /// Payload fired.
    pub ordinance: OrdinanceType,
    /// Base damage.
    pub damage: i32,
    /// Engagement range.
    pub range: i32,
    /// Ticks between shots.
    pub cooldown: u64,
    /// Base projectile speed in units per tick.
    #[serde(default)]
    pub projectile_speed: Option<i32>,
    /// Mount offset from the carrier's centre.
    #[serde(default)]
    pub offset: (i32, i32),
}

impl WeaponSpec {
    fn to_weapon(&self) -> Weapon {
        let weapon = Weapon::new(
            self.ordinance,
            Fixed::from_num(self.damage),
            Fixed::from_num(self.range),
            self.cooldown,
        );
        match self.projectile_speed {
            Some(speed) => weapon.with_projectile_speed(Fixed::from_num(speed)),
            None => weapon,
        }
    }

    fn offset(&self) -> Vec2Fixed {
        Vec2Fixed::from_ints(self.offset.0, self.offset.1)
    }
}

/// A unit placed at match start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Owning team (0 = free-for-all).
    pub team: TeamId,
    /// World position.
    pub position: (i32, i32),
    /// Maximum health.
    pub health: i32,
    /// Body radius.
    #[serde(default = "default_unit_radius")]
    pub radius: i32,
    /// Altitude class.
    #[serde(default)]
    pub elevation: Elevation,
    /// Initial velocity in units per tick.
    #[serde(default)]
    pub velocity: (i32, i32),
    /// Whether the unit starts cloaked.
    #[serde(default)]
    pub cloaked: bool,
    /// Weapon mounts.
    #[serde(default)]
    pub weapons: Vec<WeaponSpec>,
}

const fn default_unit_radius() -> i32 {
    4
}

/// A building placed at match start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingPlacement {
    /// Owning team.
    pub team: TeamId,
    /// Centre of the footprint.
    pub position: (i32, i32),
    /// Footprint width and height.
    pub size: (i32, i32),
    /// Maximum health.
    pub health: i32,
    /// Shield radius, if the building has a shield generator.
    #[serde(default)]
    pub shield: Option<i32>,
    /// Defensive weapon mounts.
    #[serde(default)]
    pub weapons: Vec<WeaponSpec>,
}

/// Outline of an obstacle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleShape {
    /// Round rock.
    Circle {
        /// Radius.
        radius: i32,
    },
    /// Axis-aligned block.
    Rect {
        /// Width.
        width: i32,
        /// Height.
        height: i32,
    },
    /// Regular polygon.
    Polygon {
        /// Number of sides (at least 3).
        sides: u32,
        /// Circumradius.
        radius: i32,
    },
    /// Convex outline, vertices relative to the placement position.
    Irregular {
        /// Vertices.
        points: Vec<(i32, i32)>,
    },
}

/// An obstacle placed at match start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstaclePlacement {
    /// Outline.
    pub shape: ObstacleShape,
    /// World position.
    pub position: (i32, i32),
    /// Whether damage can destroy it.
    #[serde(default)]
    pub destructible: bool,
    /// Harvestable resource stock.
    #[serde(default)]
    pub resources: Option<i32>,
}

/// A wall segment placed at match start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallPlacement {
    /// Owning team.
    pub team: TeamId,
    /// First endpoint.
    pub start: (i32, i32),
    /// Second endpoint.
    pub end: (i32, i32),
    /// Wall thickness.
    #[serde(default = "default_wall_thickness")]
    pub thickness: i32,
    /// Maximum health.
    pub health: i32,
}

const fn default_wall_thickness() -> i32 {
    6
}

/// A complete scenario configuration.
///
/// # Example RON
///
/// ```ron
/// Scenario(
///     name: "Duel",
///     world: (width: 512, height: 512),
///     units: [
///         (team: 1, position: (100, 256), health: 100,
///          weapons: [(ordinance: Bullet, damage: 10, range: 150, cooldown: 10)]),
///         (team: 2, position: (220, 256), health: 100),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// World dimensions and navigation settings.
    #[serde(default)]
    pub world: WorldConfig,
    /// Ticks to simulate unless overridden on the command line.
    #[serde(default)]
    pub ticks: Option<Tick>,
    /// Ordinance overrides applied to the built-in catalog.
    #[serde(default)]
    pub ordinance: Vec<OrdinanceData>,
    /// Starting units.
    #[serde(default)]
    pub units: Vec<UnitPlacement>,
    /// Starting buildings.
    #[serde(default)]
    pub buildings: Vec<BuildingPlacement>,
    /// Map obstacles.
    #[serde(default)]
    pub obstacles: Vec<ObstaclePlacement>,
    /// Wall segments.
    #[serde(default)]
    pub walls: Vec<WallPlacement>,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Ticks to run: the override if given, else the scenario's own, else
    /// [`DEFAULT_TICKS`].
    #[must_use]
    pub fn tick_budget(&self, requested: Option<Tick>) -> Tick {
        requested.or(self.ticks).unwrap_or(DEFAULT_TICKS)
    }

    /// Check values the simulation cannot repair on its own.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.world.width == 0 || self.world.height == 0 {
            return Err(ScenarioError::Invalid("world has zero area".to_string()));
        }
        for (i, unit) in self.units.iter().enumerate() {
            if unit.health <= 0 || unit.radius <= 0 {
                return Err(ScenarioError::Invalid(format!(
                    "unit {i} needs positive health and radius"
                )));
            }
        }
        for (i, building) in self.buildings.iter().enumerate() {
            if building.health <= 0 || building.size.0 <= 0 || building.size.1 <= 0 {
                return Err(ScenarioError::Invalid(format!(
                    "building {i} needs positive health and size"
                )));
            }
        }
        for (i, wall) in self.walls.iter().enumerate() {
            if wall.health <= 0 || wall.start == wall.end {
                return Err(ScenarioError::Invalid(format!(
                    "wall {i} needs positive health and distinct endpoints"
                )));
            }
        }
        for (i, obstacle) in self.obstacles.iter().enumerate() {
            let degenerate = match &obstacle.shape {
                ObstacleShape::Circle { radius } | ObstacleShape::Polygon { radius, .. } => {
                    *radius <= 0
                }
                ObstacleShape::Rect { width, height } => *width <= 0 || *height <= 0,
                ObstacleShape::Irregular { points } => points.is_empty(),
            };
            if degenerate {
                return Err(ScenarioError::Invalid(format!(
                    "obstacle {i} has a degenerate shape"
                )));
            }
        }
        Ok(())
    }

    /// Build a simulation populated with this scenario's entities.
    ///
    /// Entities get ids in file order: units, buildings, walls, obstacles.
    pub fn build(&self) -> Result<Simulation, ScenarioError> {
        self.validate()?;

        let mut sim = Simulation::new()
            .with_config(self.world)
            .with_catalog(apply_overrides(&self.ordinance));

        for placement in &self.units {
            let id = sim.allocate_id();
            let mut unit = Unit::new(
                id,
                placement.team,
                point(placement.position),
                Fixed::from_num(placement.radius),
                Fixed::from_num(placement.health),
                0,
            )
            .with_elevation(placement.elevation)
            .with_velocity(point(placement.velocity));
            if placement.cloaked {
                unit = unit.cloaked();
            }
            for spec in &placement.weapons {
                unit = unit.with_turret(spec.offset(), spec.to_weapon());
            }
            sim.add(unit)?;
        }

        for placement in &self.buildings {
            let id = sim.allocate_id();
            let mut building = Building::new(
                id,
                placement.team,
                point(placement.position),
                Fixed::from_num(placement.size.0),
                Fixed::from_num(placement.size.1),
                Fixed::from_num(placement.health),
                0,
            );
            if let Some(radius) = placement.shield {
                building = building.with_shield(Fixed::from_num(radius));
            }
            for spec in &placement.weapons {
                building = building.with_turret(spec.offset(), spec.to_weapon());
            }
            sim.add(building)?;
        }

        for placement in &self.walls {
            let id = sim.allocate_id();
            sim.add(WallSegment::new(
                id,
                placement.team,
                point(placement.start),
                point(placement.end),
                Fixed::from_num(placement.thickness),
                Fixed::from_num(placement.health),
                0,
            ))?;
        }

        for placement in &self.obstacles {
            let id = sim.allocate_id();
            let mut obstacle = placement.to_obstacle(id);
            if placement.destructible {
                obstacle = obstacle.destructible();
            }
            if let Some(capacity) = placement.resources {
                obstacle = obstacle.harvestable(Fixed::from_num(capacity));
            }
            sim.add(obstacle)?;
        }

        debug!(
            scenario = %self.name,
            entities = sim.registry().len(),
            "scenario built"
        );
        Ok(sim)
    }
}

impl ObstaclePlacement {
    fn to_obstacle(&self, id: EntityId) -> Obstacle {
        let position = point(self.position);
        match &self.shape {
            ObstacleShape::Circle { radius } => {
                Obstacle::circle(id, position, Fixed::from_num(*radius), 0)
            }
            ObstacleShape::Rect { width, height } => Obstacle::rectangle(
                id,
                position,
                Fixed::from_num(*width),
                Fixed::from_num(*height),
                0,
            ),
            ObstacleShape::Polygon { sides, radius } => {
                Obstacle::regular_polygon(id, position, *sides, Fixed::from_num(*radius), 0)
            }
            ObstacleShape::Irregular { points } => {
                let vertices: Vec<Vec2Fixed> = points
                    .iter()
                    .map(|&(x, y)| position + Vec2Fixed::from_ints(x, y))
                    .collect();
                Obstacle::irregular(id, &vertices, 0)
            }
        }
    }
}

/// Integer world coordinates to a fixed-point vector.
#[must_use]
pub fn point((x, y): (i32, i32)) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}
