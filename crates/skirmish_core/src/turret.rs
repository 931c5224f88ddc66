//! Independently targeting weapon mounts.

use crate::components::{EntityId, TeamId, Tick};
use crate::math::{Fixed, Vec2Fixed};
use crate::ordinance::OrdinanceCatalog;
use crate::registry::EntityRegistry;
use crate::targeting::{find_nearest_enemy_targetable, intercept_point, TargetQuery, TargetRef};
use crate::units::Weapon;

/// Acquisition offset per turret index, in ticks.
pub const TURRET_STAGGER: u64 = 7;

/// Ticks between acquisition attempts of a single turret.
pub const TURRET_ACQUIRE_INTERVAL: u64 = 30;

/// Targeting state of a turret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurretState {
    /// Idle, waiting for its acquisition tick.
    NoTarget,
    /// Tracking a target.
    HasTarget(TargetRef),
}

/// A shot a turret decided to take this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireOrder {
    /// Entity carrying the turret.
    pub owner: EntityId,
    /// Team of the owner.
    pub team: TeamId,
    /// Turret index on its parent.
    pub turret: u32,
    /// Muzzle position.
    pub origin: Vec2Fixed,
    /// Point aimed at (lead position for moving units).
    pub aim: Vec2Fixed,
    /// Target being engaged.
    pub target: TargetRef,
    /// Snapshot of the weapon at the moment of firing.
    pub weapon: Weapon,
}

/// Where a turret's parent is and who it fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurretMount {
    /// Parent entity.
    pub owner: EntityId,
    /// Parent team.
    pub team: TeamId,
    /// Parent position.
    pub position: Vec2Fixed,
}

/// A weapon mount with its own target and facing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turret {
    /// Position in the parent's turret list.
    pub index: u32,
    /// Offset from the parent's centre.
    pub offset: Vec2Fixed,
    /// Mounted weapon.
    pub weapon: Weapon,
    /// Facing in radians.
    pub rotation: Fixed,
    /// Current target.
    pub target: Option<TargetRef>,
}

impl Turret {
    /// Create an idle turret.
    #[must_use]
    pub fn new(index: u32, offset: Vec2Fixed, weapon: Weapon) -> Self {
        Self {
            index,
            offset,
            weapon,
            rotation: Fixed::ZERO,
            target: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TurretState {
        self.target.map_or(TurretState::NoTarget, TurretState::HasTarget)
    }

    /// Whether this turret searches for targets on `tick`.
    ///
    /// Turrets are staggered by index so they do not all search together.
    #[must_use]
    pub fn should_acquire(&self, tick: Tick) -> bool {
        let offset = u64::from(self.index).wrapping_mul(TURRET_STAGGER);
        tick.wrapping_add(offset) % TURRET_ACQUIRE_INTERVAL == 0
    }

    /// Muzzle position for a parent at `parent`.
    #[must_use]
    pub fn muzzle(&self, parent: Vec2Fixed) -> Vec2Fixed {
        parent + self.offset
    }

    /// Run one tick of the state machine; returns a shot if one is taken.
    pub fn update(
        &mut self,
        mount: TurretMount,
        registry: &EntityRegistry,
        catalog: &OrdinanceCatalog,
        cloak_range: Fixed,
        now: Tick,
    ) -> Option<FireOrder> {
        if self.target.is_some_and(|t| !t.is_alive(registry)) {
            self.target = None;
        }

        let origin = self.muzzle(mount.position);
        if self.target.is_none() && self.should_acquire(now) {
            let query = TargetQuery::new(
                origin,
                mount.team,
                self.weapon.elevation_mask(catalog),
                self.weapon.range,
            )
            .with_cloak_range(cloak_range)
            .excluding(mount.owner);
            self.target = find_nearest_enemy_targetable(registry, &query);
        }

        let target = self.target?;
        if !self.weapon.can_fire(now) {
            return None;
        }
        let resolved = target.resolve(registry)?;

        let aim = match target {
            TargetRef::Unit(_) if !self.weapon.ordinance.is_beam() => intercept_point(
                origin,
                resolved.position(),
                resolved.velocity(),
                self.weapon.effective_speed(catalog),
            ),
            _ => resolved.position(),
        };

        let reach = self.weapon.range + resolved.target_radius();
        if origin.distance(aim) > reach {
            self.target = None;
            return None;
        }

        self.rotation = (aim - origin).angle();
        self.weapon.mark_fired(now);
        Some(FireOrder {
            owner: mount.owner,
            team: mount.team,
            turret: self.index,
            origin,
            aim,
            target,
            weapon: self.weapon.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::FFA_TEAM;
    use crate::ordinance::OrdinanceType;
    use crate::physics::KinematicWorld;
    use crate::units::{Building, Unit};

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn vec2(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::from_ints(x, y)
    }

    fn rifle() -> Weapon {
        Weapon::new(OrdinanceType::Bullet, fixed(10), fixed(100), 10)
    }

    #[test]
    fn test_acquisition_is_staggered() {
        let first = Turret::new(0, Vec2Fixed::ZERO, rifle());
        let second = Turret::new(1, Vec2Fixed::ZERO, rifle());
        assert!(first.should_acquire(0));
        assert!(first.should_acquire(30));
        assert!(!first.should_acquire(23));
        assert!(second.should_acquire(23));
        assert!(!second.should_acquire(0));
    }

    #[test]
    fn test_state_follows_target() {
        let mut turret = Turret::new(0, Vec2Fixed::ZERO, rifle());
        assert_eq!(turret.state(), TurretState::NoTarget);
        turret.target = Some(TargetRef::Unit(4));
        assert_eq!(turret.state(), TurretState::HasTarget(TargetRef::Unit(4)));
    }

    #[test]
    fn test_muzzle_offset() {
        let turret = Turret::new(0, vec2(3, -2), rifle());
        assert_eq!(turret.muzzle(vec2(10, 10)), vec2(13, 8));
    }

    fn mount() -> TurretMount {
        TurretMount {
            owner: 1,
            team: 1,
            position: vec2(0, 0),
        }
    }

    fn arena(targets: Vec<Unit>) -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        let mut world = KinematicWorld::new();
        registry
            .add(Unit::new(1, 1, vec2(0, 0), fixed(4), fixed(100), 0), &mut world)
            .unwrap();
        for unit in targets {
            registry.add(unit, &mut world).unwrap();
        }
        registry
    }

    #[test]
    fn test_acquires_and_leads_moving_target() {
        let registry = arena(vec![
            Unit::new(2, 2, vec2(60, 0), fixed(4), fixed(50), 0).with_velocity(vec2(0, 2)),
            Unit::new(3, 2, vec2(90, 0), fixed(4), fixed(50), 0),
        ]);
        let catalog = OrdinanceCatalog::new();
        let mut turret = Turret::new(0, Vec2Fixed::ZERO, rifle());

        let order = turret
            .update(mount(), &registry, &catalog, fixed(96), 0)
            .expect("turret should fire");
        assert_eq!(order.target, TargetRef::Unit(2));
        assert!(order.aim.y > Fixed::ZERO);
        assert_eq!(turret.rotation, order.aim.angle());
        assert_eq!(turret.weapon.last_fired, Some(0));
        assert_eq!(turret.state(), TurretState::HasTarget(TargetRef::Unit(2)));

        // Cooling down: keeps the target, holds fire.
        assert!(turret.update(mount(), &registry, &catalog, fixed(96), 1).is_none());
        assert_eq!(turret.target, Some(TargetRef::Unit(2)));
        assert!(turret.update(mount(), &registry, &catalog, fixed(96), 10).is_some());
    }

    #[test]
    fn test_acquires_only_on_stagger_tick() {
        let registry = arena(vec![Unit::new(2, 2, vec2(60, 0), fixed(4), fixed(50), 0)]);
        let catalog = OrdinanceCatalog::new();
        let mut turret = Turret::new(1, Vec2Fixed::ZERO, rifle());
        assert!(turret.update(mount(), &registry, &catalog, fixed(96), 0).is_none());
        assert_eq!(turret.state(), TurretState::NoTarget);
        assert!(turret.update(mount(), &registry, &catalog, fixed(96), 23).is_some());
    }

    #[test]
    fn test_dead_target_is_cleared() {
        let mut registry = arena(vec![Unit::new(2, 2, vec2(60, 0), fixed(4), fixed(50), 0)]);
        let catalog = OrdinanceCatalog::new();
        let mut turret = Turret::new(0, Vec2Fixed::ZERO, rifle());
        turret.update(mount(), &registry, &catalog, fixed(96), 0);
        registry.units.get_mut(&2).unwrap().core.deactivate();

        assert!(turret.update(mount(), &registry, &catalog, fixed(96), 10).is_none());
        assert_eq!(turret.state(), TurretState::NoTarget);
    }

    #[test]
    fn test_target_out_of_range_is_dropped() {
        let mut registry = arena(vec![Unit::new(2, 2, vec2(60, 0), fixed(4), fixed(50), 0)]);
        let catalog = OrdinanceCatalog::new();
        let mut turret = Turret::new(0, Vec2Fixed::ZERO, rifle());
        turret.update(mount(), &registry, &catalog, fixed(96), 0);
        registry.units.get_mut(&2).unwrap().core.position = vec2(400, 0);

        assert!(turret.update(mount(), &registry, &catalog, fixed(96), 10).is_none());
        assert_eq!(turret.state(), TurretState::NoTarget);
    }

    #[test]
    fn test_building_target_aims_at_position() {
        let mut registry = arena(Vec::new());
        let mut world = KinematicWorld::new();
        registry
            .add(
                Building::new(5, FFA_TEAM, vec2(0, 80), fixed(20), fixed(20), fixed(400), 0),
                &mut world,
            )
            .unwrap();
        let catalog = OrdinanceCatalog::new();
        let mut turret = Turret::new(0, vec2(0, 2), rifle());

        let order = turret
            .update(mount(), &registry, &catalog, fixed(96), 0)
            .expect("turret should fire");
        assert_eq!(order.target, TargetRef::Building(5));
        assert_eq!(order.origin, vec2(0, 2));
        assert_eq!(order.aim, vec2(0, 80));
    }
}
