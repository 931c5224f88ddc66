//! Static and destructible world features.

use tracing::warn;

use crate::components::{EntityCore, EntityId, Tick};
use crate::geometry::{centroid, Shape};
use crate::math::{Fixed, Vec2Fixed};
use crate::physics::{BodyDesc, BodyKind, BodyTag};

/// Health per unit of bounding radius for destructible obstacles.
pub const HEALTH_PER_RADIUS: i32 = 10;

/// A depletable resource stock carried by an obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourcePool {
    /// Amount left.
    pub remaining: Fixed,
    /// Starting amount.
    pub capacity: Fixed,
}

impl ResourcePool {
    /// A full pool.
    #[must_use]
    pub const fn new(capacity: Fixed) -> Self {
        Self {
            remaining: capacity,
            capacity,
        }
    }

    /// Take up to `amount`; returns what was actually taken.
    pub fn harvest(&mut self, amount: Fixed) -> Fixed {
        let taken = amount.max(Fixed::ZERO).min(self.remaining);
        self.remaining -= taken;
        taken
    }

    /// Check if nothing is left.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.remaining <= Fixed::ZERO
    }
}

/// A world feature that blocks movement and projectiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obstacle {
    /// Shared entity state.
    pub core: EntityCore,
    /// Outline relative to the obstacle centre.
    pub shape: Shape,
    /// Resource stock, for harvestable obstacles.
    pub resources: Option<ResourcePool>,
    /// Whether damage reduces health.
    pub destructible: bool,
}

impl Obstacle {
    fn with_shape(id: EntityId, position: Vec2Fixed, shape: Shape, now: Tick) -> Self {
        let max_health = shape.bounding_radius() * Fixed::from_num(HEALTH_PER_RADIUS);
        Self {
            core: EntityCore::new(id, position, max_health, now),
            shape,
            resources: None,
            destructible: false,
        }
    }

    /// Round obstacle.
    #[must_use]
    pub fn circle(id: EntityId, position: Vec2Fixed, radius: Fixed, now: Tick) -> Self {
        Self::with_shape(id, position, Shape::circle(radius), now)
    }

    /// Axis-aligned rectangular obstacle.
    #[must_use]
    pub fn rectangle(
        id: EntityId,
        position: Vec2Fixed,
        width: Fixed,
        height: Fixed,
        now: Tick,
    ) -> Self {
        Self::with_shape(id, position, Shape::rect(width, height), now)
    }

    /// Regular polygon obstacle.
    #[must_use]
    pub fn regular_polygon(
        id: EntityId,
        position: Vec2Fixed,
        sides: u32,
        radius: Fixed,
        now: Tick,
    ) -> Self {
        Self::with_shape(id, position, Shape::regular_polygon(sides, radius), now)
    }

    /// Convex obstacle from world-space vertices.
    ///
    /// Non-convex outlines fall back to a regular polygon with the same
    /// vertex count and the radius of the farthest vertex from the centroid.
    #[must_use]
    pub fn irregular(id: EntityId, points: &[Vec2Fixed], now: Tick) -> Self {
        if let Some((shape, center)) = Shape::try_convex_polygon(points) {
            return Self::with_shape(id, center, shape, now);
        }

        let center = centroid(points);
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .max()
            .unwrap_or(Fixed::ONE)
            .max(Fixed::ONE);
        let sides = u32::try_from(points.len()).unwrap_or(u32::MAX).max(3);
        warn!(
            id,
            vertices = points.len(),
            "non-convex obstacle outline, using regular polygon"
        );
        Self::with_shape(id, center, Shape::regular_polygon(sides, radius), now)
    }

    /// Builder method to make the obstacle destructible.
    #[must_use]
    pub fn destructible(mut self) -> Self {
        self.destructible = true;
        self
    }

    /// Builder method to give the obstacle a resource stock.
    #[must_use]
    pub fn harvestable(mut self, capacity: Fixed) -> Self {
        self.resources = Some(ResourcePool::new(capacity));
        self
    }

    /// Bounding radius of the outline.
    #[must_use]
    pub fn bounding_radius(&self) -> Fixed {
        self.shape.bounding_radius()
    }

    /// Check if a circle of `radius` at `point` overlaps the obstacle.
    #[must_use]
    pub fn blocks(&self, point: Vec2Fixed, radius: Fixed) -> bool {
        self.shape.distance_to_point(self.core.position, point) <= radius
    }

    /// Apply damage. Non-destructible obstacles ignore it.
    ///
    /// Returns `true` if this damage destroyed the obstacle.
    pub fn apply_damage(&mut self, amount: Fixed) -> bool {
        if !self.destructible {
            return false;
        }
        self.core.apply_damage(amount)
    }

    /// Harvest resources; a depleted obstacle deactivates.
    ///
    /// Returns the amount taken (zero for non-harvestable obstacles).
    pub fn harvest(&mut self, amount: Fixed) -> Fixed {
        if !self.core.active {
            return Fixed::ZERO;
        }
        let Some(pool) = self.resources.as_mut() else {
            return Fixed::ZERO;
        };
        let taken = pool.harvest(amount);
        if pool.is_depleted() {
            self.core.deactivate();
        }
        taken
    }

    /// Physics body for the obstacle.
    #[must_use]
    pub fn body_desc(&self) -> BodyDesc {
        BodyDesc::new(
            BodyTag::Entity(self.core.id),
            BodyKind::Static,
            self.shape.clone(),
            self.core.position,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn vec2(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::from_ints(x, y)
    }

    #[test]
    fn test_indestructible_ignores_damage() {
        let mut rock = Obstacle::circle(1, vec2(0, 0), fixed(10), 0);
        let start = rock.core.health;
        for _ in 0..100 {
            assert!(!rock.apply_damage(fixed(1000)));
        }
        assert_eq!(rock.core.health, start);
        assert!(rock.core.health > Fixed::ZERO);
        assert!(rock.core.active);
    }

    #[test]
    fn test_destructible_health_scales_with_radius() {
        let mut crate_box = Obstacle::circle(1, vec2(0, 0), fixed(5), 0).destructible();
        assert_eq!(crate_box.core.max_health, fixed(50));
        assert!(!crate_box.apply_damage(fixed(30)));
        assert!(crate_box.apply_damage(fixed(30)));
        assert!(!crate_box.core.active);
    }

    #[test]
    fn test_irregular_convex_keeps_outline() {
        let points = [vec2(0, 0), vec2(20, 0), vec2(20, 10), vec2(0, 10)];
        let obstacle = Obstacle::irregular(1, &points, 0);
        assert_eq!(obstacle.core.position, vec2(10, 5));
        assert!(obstacle.blocks(vec2(19, 9), Fixed::ZERO));
        assert!(!obstacle.blocks(vec2(25, 5), fixed(2)));
    }

    #[test]
    fn test_irregular_concave_falls_back_to_regular_polygon() {
        // Arrow head: reflex vertex at (5, 5).
        let points = [vec2(0, 0), vec2(10, 0), vec2(5, 5), vec2(10, 10), vec2(0, 10)];
        let a = Obstacle::irregular(1, &points, 0);
        let b = Obstacle::irregular(1, &points, 0);
        assert_eq!(a, b);

        let center = centroid(&points);
        let far = points.iter().map(|p| p.distance(center)).max().unwrap();
        let Shape::Polygon { vertices } = &a.shape else {
            panic!("expected polygon fallback");
        };
        assert_eq!(vertices.len(), 5);
        assert!((a.bounding_radius() - far).abs() < Fixed::from_num(0.01));
    }

    #[test]
    fn test_harvest_depletes_and_deactivates() {
        let mut tree = Obstacle::circle(1, vec2(0, 0), fixed(4), 0).harvestable(fixed(30));
        assert_eq!(tree.harvest(fixed(20)), fixed(20));
        assert!(tree.core.active);
        assert_eq!(tree.harvest(fixed(20)), fixed(10));
        assert!(!tree.core.active);
        assert_eq!(tree.harvest(fixed(5)), Fixed::ZERO);

        let mut rock = Obstacle::circle(2, vec2(0, 0), fixed(4), 0);
        assert_eq!(rock.harvest(fixed(5)), Fixed::ZERO);
        assert!(rock.core.active);
    }
}
