//! # Skirmish Core
//!
//! Deterministic combat simulation core for a team-based RTS.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO (configuration is parsed from strings handed in by the caller)
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! Rigid-body integration and raycasting belong to a physics collaborator
//! behind the [`physics::PhysicsWorld`] trait; this crate layers the
//! gameplay rules on top of it.
//!
//! ## Crate Structure
//!
//! - [`registry`] - Entity registry and the closed [`registry::Entity`] variant
//! - [`pathfinding`] - Grid A* around obstacles and buildings
//! - [`ballistics`] - Projectiles and hit-scan beams
//! - [`field_effect`] - Growing area effects
//! - [`arbiter`] - Contact arbitration into damage
//! - [`targeting`] / [`turret`] - Target acquisition and lead aiming
//! - [`simulation`] - Core simulation loop
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod arbiter;
pub mod ballistics;
pub mod components;
pub mod data;
pub mod error;
pub mod events;
pub mod field_effect;
pub mod geometry;
pub mod math;
pub mod obstacle;
pub mod ordinance;
pub mod pathfinding;
pub mod physics;
pub mod registry;
pub mod simulation;
pub mod targeting;
pub mod turret;
pub mod units;

pub use error::GameError;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ballistics::{Beam, BeamCast, BeamSpawn, Projectile, ProjectileSpawn};
    pub use crate::components::*;
    pub use crate::data::{OrdinanceData, WorldConfig};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{GameEvent, TickEvents};
    pub use crate::field_effect::{FieldCategory, FieldEffect, FieldSpawn};
    pub use crate::geometry::Shape;
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::obstacle::Obstacle;
    pub use crate::ordinance::{BulletEffect, BulletEffects, OrdinanceCatalog, OrdinanceType};
    pub use crate::pathfinding::{find_path, NavWorld};
    pub use crate::physics::{BodyHandle, BodyTag, KinematicWorld, PhysicsWorld};
    pub use crate::registry::{Entity, EntityKind, EntityRegistry};
    pub use crate::simulation::Simulation;
    pub use crate::targeting::{TargetQuery, TargetRef};
    pub use crate::turret::{FireOrder, Turret, TurretState};
    pub use crate::units::{Building, Unit, WallSegment, Weapon};
}
