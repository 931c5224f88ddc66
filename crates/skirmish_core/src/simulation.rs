//! Core simulation loop.
//!
//! The simulation runs at a fixed tick rate and resolves all combat and
//! movement deterministically on top of a [`PhysicsWorld`].
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - No system randomness
//! - Consistent iteration order (sorted entity ids)
//! - Same inputs always produce same outputs
//!
//! # Example
//!
//! ```
//! use skirmish_core::math::{Fixed, Vec2Fixed};
//! use skirmish_core::simulation::Simulation;
//! use skirmish_core::units::Unit;
//!
//! let mut sim = Simulation::new();
//! let id = sim.allocate_id();
//! sim.add(Unit::new(id, 1, Vec2Fixed::ZERO, Fixed::from_num(4), Fixed::from_num(100), 0))
//!     .unwrap();
//! sim.tick();
//! assert_eq!(sim.get_tick(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::{trace, warn};

use crate::arbiter::arbitrate;
use crate::ballistics::{
    beam_filter, register_beam, Beam, BeamCast, BeamSpawn, Projectile, ProjectileSpawn,
};
use crate::components::{EntityId, TeamId, Tick};
use crate::data::WorldConfig;
use crate::error::{GameError, Result};
use crate::events::{GameEvent, TickEvents};
use crate::geometry::Shape;
use crate::math::{Fixed, Vec2Fixed};
use crate::ordinance::OrdinanceCatalog;
use crate::physics::{BodyHandle, BodyTag, KinematicWorld, PhysicsWorld};
use crate::registry::{Entity, EntityKind, EntityRegistry};
use crate::turret::{FireOrder, TurretMount};
use crate::units::Weapon;

/// Ticks per second for the simulation.
pub const TICK_RATE: u32 = 20;

/// Duration of a single tick in milliseconds.
pub const TICK_DURATION_MS: u32 = 1000 / TICK_RATE;

/// Visual thickness of beams fired by turrets.
pub const BEAM_THICKNESS: Fixed = Fixed::from_bits(2 << 32);

/// The authoritative combat simulation.
#[derive(Debug, Clone)]
pub struct Simulation<P: PhysicsWorld = KinematicWorld> {
    tick: Tick,
    registry: EntityRegistry,
    physics: P,
    config: WorldConfig,
    catalog: OrdinanceCatalog,
}

impl Simulation<KinematicWorld> {
    /// Create an empty simulation on the reference physics world.
    ///
    /// # Example
    ///
    /// ```
    /// use skirmish_core::simulation::Simulation;
    ///
    /// let sim = Simulation::new();
    /// assert_eq!(sim.get_tick(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_physics(KinematicWorld::new())
    }
}

impl Default for Simulation<KinematicWorld> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PhysicsWorld> Simulation<P> {
    /// Create an empty simulation on the given physics world.
    #[must_use]
    pub fn with_physics(physics: P) -> Self {
        Self {
            tick: 0,
            registry: EntityRegistry::new(),
            physics,
            config: WorldConfig::default(),
            catalog: OrdinanceCatalog::new(),
        }
    }

    /// Builder method to set the world configuration.
    #[must_use]
    pub fn with_config(mut self, config: WorldConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder method to set the ordinance catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: OrdinanceCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Get the current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> Tick {
        self.tick
    }

    /// Registered entities.
    #[must_use]
    pub const fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// The physics world.
    #[must_use]
    pub const fn physics(&self) -> &P {
        &self.physics
    }

    /// World configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Ordinance catalog in effect.
    #[must_use]
    pub const fn catalog(&self) -> &OrdinanceCatalog {
        &self.catalog
    }

    /// Reserve a fresh entity id.
    pub fn allocate_id(&mut self) -> EntityId {
        self.registry.allocate_id()
    }

    /// Register an entity and its physics bodies.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DuplicateEntity`] if the id is already in use.
    pub fn add(&mut self, entity: impl Into<Entity>) -> Result<EntityId> {
        self.registry.add(entity, &mut self.physics)
    }

    /// Set an entity's velocity in units per tick.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] for unknown ids.
    pub fn set_velocity(&mut self, id: EntityId, velocity: Vec2Fixed) -> Result<()> {
        let core = self
            .registry
            .core(id)
            .ok_or(GameError::EntityNotFound(id))?;
        let body = core
            .body
            .ok_or_else(|| GameError::InvalidState(format!("entity {id} has no body")))?;
        self.physics.set_velocity(body, velocity);
        self.registry.sync_from_physics(&self.physics);
        Ok(())
    }

    /// Entity owning a physics body.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnregisteredBody`] if no registered entity owns it.
    pub fn owner_of(&self, body: BodyHandle) -> Result<EntityId> {
        let id = match self.physics.tag(body) {
            Some(BodyTag::Entity(id) | BodyTag::Shield(id)) => id,
            None => return Err(GameError::UnregisteredBody(body)),
        };
        if self.registry.contains(id) {
            Ok(id)
        } else {
            Err(GameError::UnregisteredBody(body))
        }
    }

    /// Waypoints for a unit of `radius` around current obstacles and buildings.
    #[must_use]
    pub fn find_path(
        &self,
        start: Vec2Fixed,
        goal: Vec2Fixed,
        radius: Fixed,
        is_airborne: bool,
    ) -> Vec<Vec2Fixed> {
        self.registry
            .nav_world(self.config.width(), self.config.height())
            .with_cell_size(self.config.cell_size())
            .find_path(start, goal, radius, is_airborne)
    }

    /// Fire a projectile.
    ///
    /// # Errors
    ///
    /// Propagates registration errors.
    pub fn fire_projectile(&mut self, spawn: ProjectileSpawn) -> Result<EntityId> {
        let id = self.registry.allocate_id();
        self.registry
            .add(Projectile::new(id, spawn, self.tick), &mut self.physics)
    }

    /// Fire a beam from `origin` along `direction` at the weapon's range.
    ///
    /// The impact is applied immediately.
    ///
    /// # Errors
    ///
    /// Propagates registration errors.
    pub fn fire_beam(
        &mut self,
        owner: EntityId,
        team: TeamId,
        origin: Vec2Fixed,
        direction: Vec2Fixed,
        weapon: &Weapon,
        events: &mut TickEvents,
    ) -> Result<EntityId> {
        let mask = weapon.elevation_mask(&self.catalog);
        let cast = {
            let filter = beam_filter(&self.registry, owner, team, mask);
            BeamCast::cast(&self.physics, origin, direction, weapon.range, &filter)
        };
        let spawn = BeamSpawn {
            owner,
            team,
            damage: weapon.effective_damage(&self.catalog),
            ordinance: weapon.ordinance,
            effects: weapon.effects(&self.catalog),
            elevation_mask: mask,
            thickness: BEAM_THICKNESS,
            duration: self.catalog.get(weapon.ordinance).beam_duration,
        };
        let id = self.registry.allocate_id();
        let beam = Beam::from_cast(id, cast, spawn, self.tick);
        register_beam(
            &mut self.registry,
            &mut self.physics,
            &self.catalog,
            beam,
            self.tick,
            events,
        )
    }

    /// Carry out a turret's fire order.
    ///
    /// Returns `None` when the aim point coincides with the muzzle.
    ///
    /// # Errors
    ///
    /// Propagates registration errors.
    pub fn execute(
        &mut self,
        order: &FireOrder,
        events: &mut TickEvents,
    ) -> Result<Option<EntityId>> {
        let direction = (order.aim - order.origin).normalize();
        if direction.is_zero() {
            trace!(owner = order.owner, "aim point at muzzle, shot skipped");
            return Ok(None);
        }

        let weapon = &order.weapon;
        if weapon.ordinance.is_beam() {
            return self
                .fire_beam(order.owner, order.team, order.origin, direction, weapon, events)
                .map(Some);
        }

        let spec = self.catalog.get(weapon.ordinance);
        let spawn = ProjectileSpawn {
            origin: order.origin,
            velocity: direction.scale(weapon.effective_speed(&self.catalog)),
            damage: weapon.effective_damage(&self.catalog),
            max_range: weapon.range,
            owner: order.owner,
            team: order.team,
            linear_damping: weapon.projectile_damping,
            effects: weapon.effects(&self.catalog),
            ordinance: weapon.ordinance,
            elevation_mask: spec.elevation_mask,
            radius: (spec.size / Fixed::from_num(2)).max(Fixed::ONE / Fixed::from_num(4)),
        };
        self.fire_projectile(spawn).map(Some)
    }

    /// Advance the simulation by one tick.
    ///
    /// # System Order
    ///
    /// 1. Physics step, contacts resolved by the arbiter
    /// 2. Flush entities spawned during arbitration
    /// 3. Sync transforms from physics
    /// 4. Projectiles, beams and field effects
    /// 5. Turrets
    /// 6. Flush entities spawned by turrets
    /// 7. Expire and remove inactive entities
    pub fn tick(&mut self) -> TickEvents {
        let now = self.tick;
        let mut events = TickEvents::new(now);

        // 1. Physics
        {
            let Self {
                registry,
                physics,
                catalog,
                ..
            } = self;
            physics.step(&mut |contact| arbitrate(contact, registry, catalog, now, &mut events));
        }

        // 2. Spawns from arbitration
        self.flush_spawns();

        // 3. Transforms
        self.registry.sync_from_physics(&self.physics);

        // 4. Ordinance and area effects
        self.run_ordinance_system(now, &mut events);

        // 5. Turrets
        let orders = self.run_turret_system(now);
        for order in &orders {
            if let Err(err) = self.execute(order, &mut events) {
                warn!(owner = order.owner, %err, "fire order failed");
            }
        }

        // 6. Spawns from turrets
        self.flush_spawns();

        // 7. Cleanup
        self.registry.expire(now);
        let removed = self.registry.remove_inactive(&mut self.physics);
        if !removed.is_empty() {
            trace!(tick = now, ?removed, "entities removed");
        }

        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        #[cfg(feature = "debug-validation")]
        self.validate();

        events
    }

    /// Advance `ticks` ticks and collect their events.
    pub fn run(&mut self, ticks: u64) -> Vec<TickEvents> {
        (0..ticks).map(|_| self.tick()).collect()
    }

    #[cfg(feature = "debug-validation")]
    fn validate(&self) {
        for effect in self.registry.field_effects.values() {
            debug_assert!(
                effect.initial_radius <= effect.radius && effect.radius <= effect.max_radius,
                "field effect {} radius out of bounds",
                effect.core.id
            );
        }
        for id in self.registry.sorted_ids() {
            debug_assert!(
                self.registry.core(id).is_some_and(|core| core.body.is_some()),
                "entity {id} has no physics body"
            );
        }
    }

    fn flush_spawns(&mut self) {
        if let Err(err) = self.registry.flush_spawns(&mut self.physics) {
            warn!(%err, "failed to register queued spawns");
        }
    }

    fn run_ordinance_system(&mut self, now: Tick, events: &mut TickEvents) {
        for projectile in self.registry.projectiles.values_mut() {
            if projectile.update() {
                events.push(GameEvent::ProjectileSpent {
                    id: projectile.core.id,
                });
            }
        }

        for beam in self.registry.beams.values_mut() {
            beam.update();
        }

        let EntityRegistry {
            units,
            buildings,
            walls,
            field_effects,
            ..
        } = &mut self.registry;
        for effect in field_effects.values_mut() {
            if effect.update(now) {
                if let Some(body) = effect.core.body {
                    self.physics
                        .set_shape(body, Shape::circle(effect.sensor_radius()));
                }
            }
            effect.apply_damage(units, buildings, walls, now, events);
        }
    }

    fn run_turret_system(&mut self, now: Tick) -> Vec<FireOrder> {
        let cloak_range = self.config.cloak_range();
        let mut orders = Vec::new();

        for id in self.registry.ids_of(EntityKind::Unit) {
            let Some(unit) = self.registry.units.get_mut(&id) else {
                continue;
            };
            if !unit.core.active || unit.turrets.is_empty() {
                continue;
            }
            let mount = TurretMount {
                owner: id,
                team: unit.team,
                position: unit.core.position,
            };
            let mut turrets = std::mem::take(&mut unit.turrets);
            for turret in &mut turrets {
                let order = turret.update(mount, &self.registry, &self.catalog, cloak_range, now);
                orders.extend(order);
            }
            if let Some(unit) = self.registry.units.get_mut(&id) {
                unit.turrets = turrets;
            }
        }

        for id in self.registry.ids_of(EntityKind::Building) {
            let Some(building) = self.registry.buildings.get_mut(&id) else {
                continue;
            };
            if !building.core.active || building.turrets.is_empty() {
                continue;
            }
            let mount = TurretMount {
                owner: id,
                team: building.team,
                position: building.core.position,
            };
            let mut turrets = std::mem::take(&mut building.turrets);
            for turret in &mut turrets {
                let order = turret.update(mount, &self.registry, &self.catalog, cloak_range, now);
                orders.extend(order);
            }
            if let Some(building) = self.registry.buildings.get_mut(&id) {
                building.turrets = turrets;
            }
        }

        orders
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Two simulations with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);

        let ids = self.registry.sorted_ids();
        ids.len().hash(&mut hasher);

        for id in ids {
            let (Some(kind), Some(core)) = (self.registry.kind_of(id), self.registry.core(id))
            else {
                continue;
            };
            id.hash(&mut hasher);
            kind.hash(&mut hasher);
            core.position.x.to_bits().hash(&mut hasher);
            core.position.y.to_bits().hash(&mut hasher);
            core.velocity.x.to_bits().hash(&mut hasher);
            core.velocity.y.to_bits().hash(&mut hasher);
            core.health.to_bits().hash(&mut hasher);
            core.active.hash(&mut hasher);
        }

        hasher.finish()
    }
}
