//! The entity registry: every live simulation entity, keyed by id.
//!
//! Entities live in typed, id-ordered collections so iteration is always
//! deterministic. Adding an entity also registers its physics body.
//! Entities created while the physics world is busy (during contact
//! arbitration) go through the spawn queue and are registered on the next
//! flush.

use std::collections::BTreeMap;

use tracing::trace;

use crate::ballistics::{Beam, Projectile};
use crate::components::{EntityCore, EntityId, Targetable, Tick};
use crate::error::{GameError, Result};
use crate::field_effect::FieldEffect;
use crate::math::Fixed;
use crate::obstacle::Obstacle;
use crate::pathfinding::NavWorld;
use crate::physics::{BodyDesc, PhysicsWorld};
use crate::units::{Building, Unit, WallSegment};

/// Kind discriminator for registered entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// [`Unit`].
    Unit,
    /// [`Building`].
    Building,
    /// [`Obstacle`].
    Obstacle,
    /// [`WallSegment`].
    Wall,
    /// [`Projectile`].
    Projectile,
    /// [`Beam`].
    Beam,
    /// [`FieldEffect`].
    FieldEffect,
}

/// Any simulation entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    /// A mobile unit.
    Unit(Unit),
    /// A structure.
    Building(Building),
    /// A world feature.
    Obstacle(Obstacle),
    /// A wall segment.
    Wall(WallSegment),
    /// A moving round.
    Projectile(Projectile),
    /// A hit-scan shot.
    Beam(Beam),
    /// An area effect.
    FieldEffect(FieldEffect),
}

impl Entity {
    /// Kind of this entity.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Unit(_) => EntityKind::Unit,
            Self::Building(_) => EntityKind::Building,
            Self::Obstacle(_) => EntityKind::Obstacle,
            Self::Wall(_) => EntityKind::Wall,
            Self::Projectile(_) => EntityKind::Projectile,
            Self::Beam(_) => EntityKind::Beam,
            Self::FieldEffect(_) => EntityKind::FieldEffect,
        }
    }

    /// Shared entity state.
    #[must_use]
    pub const fn core(&self) -> &EntityCore {
        match self {
            Self::Unit(e) => &e.core,
            Self::Building(e) => &e.core,
            Self::Obstacle(e) => &e.core,
            Self::Wall(e) => &e.core,
            Self::Projectile(e) => &e.core,
            Self::Beam(e) => &e.core,
            Self::FieldEffect(e) => &e.core,
        }
    }

    /// Mutable shared entity state.
    pub fn core_mut(&mut self) -> &mut EntityCore {
        match self {
            Self::Unit(e) => &mut e.core,
            Self::Building(e) => &mut e.core,
            Self::Obstacle(e) => &mut e.core,
            Self::Wall(e) => &mut e.core,
            Self::Projectile(e) => &mut e.core,
            Self::Beam(e) => &mut e.core,
            Self::FieldEffect(e) => &mut e.core,
        }
    }

    /// Entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.core().id
    }

    /// Description of the entity's main physics body.
    #[must_use]
    pub fn body_desc(&self) -> BodyDesc {
        match self {
            Self::Unit(e) => e.body_desc(),
            Self::Building(e) => e.body_desc(),
            Self::Obstacle(e) => e.body_desc(),
            Self::Wall(e) => e.body_desc(),
            Self::Projectile(e) => e.body_desc(),
            Self::Beam(e) => e.body_desc(),
            Self::FieldEffect(e) => e.body_desc(),
        }
    }
}

macro_rules! impl_from_entity {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Entity {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_entity! {
    Unit => Unit,
    Building => Building,
    Obstacle => Obstacle,
    WallSegment => Wall,
    Projectile => Projectile,
    Beam => Beam,
    FieldEffect => FieldEffect,
}

/// Typed collections of all live entities.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    /// Units by id.
    pub units: BTreeMap<EntityId, Unit>,
    /// Buildings by id.
    pub buildings: BTreeMap<EntityId, Building>,
    /// Obstacles by id.
    pub obstacles: BTreeMap<EntityId, Obstacle>,
    /// Wall segments by id.
    pub walls: BTreeMap<EntityId, WallSegment>,
    /// Projectiles by id.
    pub projectiles: BTreeMap<EntityId, Projectile>,
    /// Beams by id.
    pub beams: BTreeMap<EntityId, Beam>,
    /// Field effects by id.
    pub field_effects: BTreeMap<EntityId, FieldEffect>,
    kinds: BTreeMap<EntityId, EntityKind>,
    pending: Vec<Entity>,
    next_id: EntityId,
}

impl EntityRegistry {
    /// Empty registry; ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Reserve a fresh id.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    /// Number of registered entities (queued spawns excluded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Check if an id is registered.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.kinds.contains_key(&id)
    }

    /// Kind of a registered entity.
    #[must_use]
    pub fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        self.kinds.get(&id).copied()
    }

    /// All registered ids in ascending order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        self.kinds.keys().copied().collect()
    }

    /// Ids of one kind in ascending order.
    #[must_use]
    pub fn ids_of(&self, kind: EntityKind) -> Vec<EntityId> {
        self.kinds
            .iter()
            .filter(|(_, &k)| k == kind)
            .map(|(&id, _)| id)
            .collect()
    }

    fn check_unique(&self, id: EntityId) -> Result<()> {
        if self.contains(id) || self.pending.iter().any(|e| e.id() == id) {
            return Err(GameError::DuplicateEntity(id));
        }
        Ok(())
    }

    /// Register an entity and create its physics body (and shield sensor).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DuplicateEntity`] if the id is already in use.
    pub fn add(
        &mut self,
        entity: impl Into<Entity>,
        physics: &mut dyn PhysicsWorld,
    ) -> Result<EntityId> {
        let mut entity = entity.into();
        let id = entity.id();
        self.check_unique(id)?;

        let body = physics.create_body(entity.body_desc());
        entity.core_mut().body = Some(body);
        let kind = entity.kind();

        match entity {
            Entity::Unit(e) => {
                self.units.insert(id, e);
            }
            Entity::Building(mut e) => {
                if let Some(desc) = e.shield_body_desc() {
                    let shield_body = physics.create_body(desc);
                    if let Some(shield) = e.shield.as_mut() {
                        shield.body = Some(shield_body);
                    }
                }
                self.buildings.insert(id, e);
            }
            Entity::Obstacle(e) => {
                self.obstacles.insert(id, e);
            }
            Entity::Wall(e) => {
                self.walls.insert(id, e);
            }
            Entity::Projectile(e) => {
                self.projectiles.insert(id, e);
            }
            Entity::Beam(e) => {
                self.beams.insert(id, e);
            }
            Entity::FieldEffect(e) => {
                self.field_effects.insert(id, e);
            }
        }

        self.kinds.insert(id, kind);
        self.next_id = self.next_id.max(id + 1);
        trace!(id, ?kind, "entity registered");
        Ok(id)
    }

    /// Queue an entity for registration on the next flush.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DuplicateEntity`] if the id is already in use.
    pub fn queue_spawn(&mut self, entity: impl Into<Entity>) -> Result<EntityId> {
        let entity = entity.into();
        let id = entity.id();
        self.check_unique(id)?;
        self.next_id = self.next_id.max(id + 1);
        self.pending.push(entity);
        Ok(id)
    }

    /// Number of queued spawns.
    #[must_use]
    pub fn pending_spawns(&self) -> usize {
        self.pending.len()
    }

    /// Register every queued entity, in queue order.
    ///
    /// # Errors
    ///
    /// Propagates registration errors; entities after the failing one stay queued.
    pub fn flush_spawns(&mut self, physics: &mut dyn PhysicsWorld) -> Result<Vec<EntityId>> {
        let mut queue = std::mem::take(&mut self.pending);
        let mut added = Vec::with_capacity(queue.len());
        while !queue.is_empty() {
            let entity = queue.remove(0);
            match self.add(entity, physics) {
                Ok(id) => added.push(id),
                Err(err) => {
                    self.pending = queue;
                    return Err(err);
                }
            }
        }
        Ok(added)
    }

    /// Shared state of any registered entity.
    #[must_use]
    pub fn core(&self, id: EntityId) -> Option<&EntityCore> {
        match self.kind_of(id)? {
            EntityKind::Unit => self.units.get(&id).map(|e| &e.core),
            EntityKind::Building => self.buildings.get(&id).map(|e| &e.core),
            EntityKind::Obstacle => self.obstacles.get(&id).map(|e| &e.core),
            EntityKind::Wall => self.walls.get(&id).map(|e| &e.core),
            EntityKind::Projectile => self.projectiles.get(&id).map(|e| &e.core),
            EntityKind::Beam => self.beams.get(&id).map(|e| &e.core),
            EntityKind::FieldEffect => self.field_effects.get(&id).map(|e| &e.core),
        }
    }

    /// Units, buildings and walls as targetables.
    #[must_use]
    pub fn targetable(&self, id: EntityId) -> Option<&dyn Targetable> {
        match self.kind_of(id)? {
            EntityKind::Unit => self.units.get(&id).map(|e| e as &dyn Targetable),
            EntityKind::Building => self.buildings.get(&id).map(|e| e as &dyn Targetable),
            EntityKind::Wall => self.walls.get(&id).map(|e| e as &dyn Targetable),
            _ => None,
        }
    }

    /// Mutable access to units, buildings and walls as targetables.
    pub fn targetable_mut(&mut self, id: EntityId) -> Option<&mut dyn Targetable> {
        match self.kind_of(id)? {
            EntityKind::Unit => self.units.get_mut(&id).map(|e| e as &mut dyn Targetable),
            EntityKind::Building => self.buildings.get_mut(&id).map(|e| e as &mut dyn Targetable),
            EntityKind::Wall => self.walls.get_mut(&id).map(|e| e as &mut dyn Targetable),
            _ => None,
        }
    }

    fn cores_mut(&mut self) -> impl Iterator<Item = &mut EntityCore> {
        self.units
            .values_mut()
            .map(|e| &mut e.core)
            .chain(self.buildings.values_mut().map(|e| &mut e.core))
            .chain(self.obstacles.values_mut().map(|e| &mut e.core))
            .chain(self.walls.values_mut().map(|e| &mut e.core))
            .chain(self.projectiles.values_mut().map(|e| &mut e.core))
            .chain(self.beams.values_mut().map(|e| &mut e.core))
            .chain(self.field_effects.values_mut().map(|e| &mut e.core))
    }

    /// Refresh cached transforms from the physics world.
    pub fn sync_from_physics(&mut self, physics: &dyn PhysicsWorld) {
        for core in self.cores_mut() {
            let Some(body) = core.body else {
                continue;
            };
            if let Some(position) = physics.position(body) {
                core.position = position;
            }
            if let Some(velocity) = physics.velocity(body) {
                core.velocity = velocity;
            }
            if let Some(rotation) = physics.rotation(body) {
                core.rotation = rotation;
            }
        }
    }

    /// Deactivate every entity whose expiry tick has passed.
    pub fn expire(&mut self, now: Tick) {
        for core in self.cores_mut() {
            if core.active && core.is_expired(now) {
                core.deactivate();
            }
        }
    }

    /// Remove one entity and its bodies.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] for unknown ids.
    pub fn remove(&mut self, id: EntityId, physics: &mut dyn PhysicsWorld) -> Result<Entity> {
        let kind = self.kinds.remove(&id).ok_or(GameError::EntityNotFound(id))?;
        let entity = match kind {
            EntityKind::Unit => self.units.remove(&id).map(Entity::Unit),
            EntityKind::Building => self.buildings.remove(&id).map(Entity::Building),
            EntityKind::Obstacle => self.obstacles.remove(&id).map(Entity::Obstacle),
            EntityKind::Wall => self.walls.remove(&id).map(Entity::Wall),
            EntityKind::Projectile => self.projectiles.remove(&id).map(Entity::Projectile),
            EntityKind::Beam => self.beams.remove(&id).map(Entity::Beam),
            EntityKind::FieldEffect => self.field_effects.remove(&id).map(Entity::FieldEffect),
        }
        .ok_or(GameError::EntityNotFound(id))?;

        if let Some(body) = entity.core().body {
            physics.remove_body(body);
        }
        if let Entity::Building(building) = &entity {
            if let Some(body) = building.shield.as_ref().and_then(|s| s.body) {
                physics.remove_body(body);
            }
        }
        trace!(id, ?kind, "entity removed");
        Ok(entity)
    }

    /// Remove every inactive entity. Returns the removed ids in ascending order.
    pub fn remove_inactive(&mut self, physics: &mut dyn PhysicsWorld) -> Vec<EntityId> {
        let inactive: Vec<EntityId> = self
            .kinds
            .keys()
            .copied()
            .filter(|&id| self.core(id).is_some_and(|c| !c.active))
            .collect();
        inactive
            .into_iter()
            .filter(|&id| self.remove(id, physics).is_ok())
            .collect()
    }

    /// Navigation view over the current obstacles and buildings.
    #[must_use]
    pub fn nav_world(&self, width: Fixed, height: Fixed) -> NavWorld<'_> {
        NavWorld::new(width, height)
            .with_obstacles(self.obstacles.values())
            .with_buildings(self.buildings.values())
    }
}
