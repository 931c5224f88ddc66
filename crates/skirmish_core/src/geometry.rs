//! Collision shapes and the geometric queries gameplay needs on them.
//!
//! Shapes are stored in body-local coordinates (relative to the body centre)
//! and are never rotated; rotated boxes such as walls are expressed as
//! convex polygons. Polygons are kept in counter-clockwise order.

use serde::{Deserialize, Serialize};

use crate::math::{angle_between, fixed_cos, fixed_sin, Fixed, Vec2Fixed, PI};

/// Iterations used by the sweep searches (precision of 2^-40 along the sweep).
const SWEEP_ITERATIONS: usize = 40;

/// A collision shape in body-local coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    /// Circle centred on the body.
    Circle {
        /// Circle radius.
        #[serde(with = "crate::math::fixed_serde")]
        radius: Fixed,
    },
    /// Axis-aligned rectangle centred on the body.
    Rect {
        /// Half of the width.
        #[serde(with = "crate::math::fixed_serde")]
        half_width: Fixed,
        /// Half of the height.
        #[serde(with = "crate::math::fixed_serde")]
        half_height: Fixed,
    },
    /// Convex polygon, counter-clockwise.
    Polygon {
        /// Vertices relative to the body centre.
        vertices: Vec<Vec2Fixed>,
    },
}

impl Shape {
    /// Circle shape.
    #[must_use]
    pub const fn circle(radius: Fixed) -> Self {
        Self::Circle { radius }
    }

    /// Axis-aligned rectangle from full width and height.
    #[must_use]
    pub fn rect(width: Fixed, height: Fixed) -> Self {
        let two = Fixed::from_num(2);
        Self::Rect {
            half_width: width / two,
            half_height: height / two,
        }
    }

    /// Regular polygon with `sides` vertices on a circle of `radius`.
    ///
    /// Fewer than 3 sides is clamped to a triangle.
    #[must_use]
    pub fn regular_polygon(sides: u32, radius: Fixed) -> Self {
        let sides = sides.max(3);
        let step = (PI + PI) / Fixed::from_num(sides);
        let vertices = (0..sides)
            .map(|i| {
                let angle = step * Fixed::from_num(i);
                Vec2Fixed::new(fixed_cos(angle) * radius, fixed_sin(angle) * radius)
            })
            .collect();
        Self::Polygon { vertices }
    }

    /// Oriented box around the segment `a`-`b`, relative to the segment midpoint.
    ///
    /// Returns the shape and the midpoint. A zero-length segment degenerates
    /// to a square of side `thickness`.
    #[must_use]
    pub fn segment_box(a: Vec2Fixed, b: Vec2Fixed, thickness: Fixed) -> (Self, Vec2Fixed) {
        let two = Fixed::from_num(2);
        let mid = Vec2Fixed::new((a.x + b.x) / two, (a.y + b.y) / two);
        let half_thickness = thickness / two;
        let dir = (b - a).normalize();
        if dir.is_zero() {
            return (Self::rect(thickness, thickness), mid);
        }

        let half_len = a.distance(b) / two;
        let along = dir.scale(half_len);
        let across = Vec2Fixed::new(-dir.y, dir.x).scale(half_thickness);
        let vertices = vec![
            -along - across,
            along - across,
            along + across,
            -along + across,
        ];
        (Self::Polygon { vertices }, mid)
    }

    /// Validate a convex polygon given in world coordinates.
    ///
    /// On success returns the shape (counter-clockwise, relative to the
    /// vertex centroid) and the centroid. Returns `None` for fewer than
    /// three vertices, zero area, or non-convex/self-intersecting input.
    #[must_use]
    pub fn try_convex_polygon(points: &[Vec2Fixed]) -> Option<(Self, Vec2Fixed)> {
        if points.len() < 3 || !is_convex(points) {
            return None;
        }

        let centroid = centroid(points);
        let mut vertices: Vec<Vec2Fixed> = points.iter().map(|&p| p - centroid).collect();
        if signed_area_doubled(&vertices) < Fixed::ZERO {
            vertices.reverse();
        }
        Some((Self::Polygon { vertices }, centroid))
    }

    /// Radius of the smallest centred circle containing the shape.
    #[must_use]
    pub fn bounding_radius(&self) -> Fixed {
        match self {
            Self::Circle { radius } => *radius,
            Self::Rect {
                half_width,
                half_height,
            } => Vec2Fixed::new(*half_width, *half_height).length(),
            Self::Polygon { vertices } => vertices
                .iter()
                .map(|v| v.length())
                .max()
                .unwrap_or(Fixed::ZERO),
        }
    }

    /// Polygon vertices for rectangles and polygons; `None` for circles.
    #[must_use]
    pub fn vertices(&self) -> Option<Vec<Vec2Fixed>> {
        match self {
            Self::Circle { .. } => None,
            Self::Rect {
                half_width,
                half_height,
            } => Some(vec![
                Vec2Fixed::new(-*half_width, -*half_height),
                Vec2Fixed::new(*half_width, -*half_height),
                Vec2Fixed::new(*half_width, *half_height),
                Vec2Fixed::new(-*half_width, *half_height),
            ]),
            Self::Polygon { vertices } => Some(vertices.clone()),
        }
    }

    /// Check if a world point lies inside the shape placed at `center`.
    #[must_use]
    pub fn contains_point(&self, center: Vec2Fixed, point: Vec2Fixed) -> bool {
        let local = point - center;
        match self {
            Self::Circle { radius } => local.length_squared() <= *radius * *radius,
            Self::Rect {
                half_width,
                half_height,
            } => local.x.abs() <= *half_width && local.y.abs() <= *half_height,
            Self::Polygon { vertices } => polygon_contains(vertices, local),
        }
    }

    /// Distance from a world point to the shape placed at `center` (0 inside).
    #[must_use]
    pub fn distance_to_point(&self, center: Vec2Fixed, point: Vec2Fixed) -> Fixed {
        let local = point - center;
        match self {
            Self::Circle { radius } => (local.length() - *radius).max(Fixed::ZERO),
            Self::Rect {
                half_width,
                half_height,
            } => {
                let dx = (local.x.abs() - *half_width).max(Fixed::ZERO);
                let dy = (local.y.abs() - *half_height).max(Fixed::ZERO);
                Vec2Fixed::new(dx, dy).length()
            }
            Self::Polygon { vertices } => {
                if polygon_contains(vertices, local) {
                    return Fixed::ZERO;
                }
                edges(vertices)
                    .map(|(a, b)| point_segment_distance(local, a, b))
                    .min()
                    .unwrap_or(Fixed::ZERO)
            }
        }
    }

    /// Distance along a ray to the first intersection with the shape at `center`.
    ///
    /// `direction` must be normalized. Returns `Some(0)` when the origin is
    /// inside the shape and `None` when there is no hit within `max_distance`.
    #[must_use]
    pub fn ray_intersection(
        &self,
        center: Vec2Fixed,
        origin: Vec2Fixed,
        direction: Vec2Fixed,
        max_distance: Fixed,
    ) -> Option<Fixed> {
        let local = origin - center;
        let hit = match self {
            Self::Circle { radius } => ray_circle(local, direction, *radius),
            _ => {
                let vertices = self.vertices()?;
                ray_polygon(&vertices, local, direction, max_distance)
            }
        }?;
        (hit <= max_distance).then_some(hit)
    }

    /// First contact of a circle of `radius` swept from `from` to `to`
    /// against this shape at `center`.
    ///
    /// Returns the sweep fraction in `[0, 1]`, or `None` if the swept circle
    /// never touches the shape.
    #[must_use]
    pub fn sweep_circle(
        &self,
        center: Vec2Fixed,
        from: Vec2Fixed,
        to: Vec2Fixed,
        radius: Fixed,
    ) -> Option<Fixed> {
        let distance_at = |t: Fixed| self.distance_to_point(center, from.lerp(to, t));

        if distance_at(Fixed::ZERO) <= radius {
            return Some(Fixed::ZERO);
        }
        if from == to {
            return None;
        }

        // Distance to a convex set along a line is convex: ternary search
        // for the closest approach, then bisect for the first entry.
        let three = Fixed::from_num(3);
        let (mut lo, mut hi) = (Fixed::ZERO, Fixed::ONE);
        for _ in 0..SWEEP_ITERATIONS {
            let m1 = lo + (hi - lo) / three;
            let m2 = hi - (hi - lo) / three;
            if distance_at(m1) <= distance_at(m2) {
                hi = m2;
            } else {
                lo = m1;
            }
        }
        let closest = lo;
        if distance_at(closest) > radius {
            return None;
        }

        let two = Fixed::from_num(2);
        let (mut outside, mut inside) = (Fixed::ZERO, closest);
        for _ in 0..SWEEP_ITERATIONS {
            let mid = (outside + inside) / two;
            if distance_at(mid) <= radius {
                inside = mid;
            } else {
                outside = mid;
            }
        }
        Some(inside)
    }
}

/// Distance from point `p` to segment `a`-`b`.
#[must_use]
pub fn point_segment_distance(p: Vec2Fixed, a: Vec2Fixed, b: Vec2Fixed) -> Fixed {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == Fixed::ZERO {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(Fixed::ZERO, Fixed::ONE);
    p.distance(a.lerp(b, t))
}

/// Check whether a vertex loop is a simple convex polygon with non-zero area.
#[must_use]
pub fn is_convex(points: &[Vec2Fixed]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }

    let mut sign = 0i32;
    let mut turning = Fixed::ZERO;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        let ab = b - a;
        let bc = c - b;
        if ab.is_zero() || bc.is_zero() {
            return false;
        }
        let cross = ab.cross(bc);
        if cross != Fixed::ZERO {
            let s = if cross > Fixed::ZERO { 1 } else { -1 };
            if sign == 0 {
                sign = s;
            } else if s != sign {
                return false;
            }
        }
        turning += angle_between(ab, bc);
    }

    // A star polygon turns the same way at every vertex but winds more than once.
    let full_turn = PI + PI;
    sign != 0 && (turning - full_turn).abs() < Fixed::from_num(0.05)
}

/// Vertex average of a point set (the origin for an empty set).
#[must_use]
pub fn centroid(points: &[Vec2Fixed]) -> Vec2Fixed {
    if points.is_empty() {
        return Vec2Fixed::ZERO;
    }
    let count = Fixed::from_num(points.len());
    let sum = points
        .iter()
        .fold(Vec2Fixed::ZERO, |acc, &p| acc + p);
    Vec2Fixed::new(sum.x / count, sum.y / count)
}

fn signed_area_doubled(vertices: &[Vec2Fixed]) -> Fixed {
    edges(vertices).fold(Fixed::ZERO, |acc, (a, b)| acc + a.cross(b))
}

fn edges(vertices: &[Vec2Fixed]) -> impl Iterator<Item = (Vec2Fixed, Vec2Fixed)> + '_ {
    let n = vertices.len();
    (0..n).map(move |i| (vertices[i], vertices[(i + 1) % n]))
}

fn polygon_contains(vertices: &[Vec2Fixed], point: Vec2Fixed) -> bool {
    edges(vertices).all(|(a, b)| (b - a).cross(point - a) >= Fixed::ZERO)
}

fn ray_circle(local_origin: Vec2Fixed, direction: Vec2Fixed, radius: Fixed) -> Option<Fixed> {
    let b = local_origin.dot(direction);
    let c = local_origin.length_squared() - radius * radius;
    if c <= Fixed::ZERO {
        return Some(Fixed::ZERO);
    }
    let disc = b * b - c;
    if disc < Fixed::ZERO {
        return None;
    }
    let t = -b - crate::math::fixed_sqrt(disc);
    (t >= Fixed::ZERO).then_some(t)
}

/// Cyrus-Beck clipping of a ray against a counter-clockwise convex polygon.
fn ray_polygon(
    vertices: &[Vec2Fixed],
    local_origin: Vec2Fixed,
    direction: Vec2Fixed,
    max_distance: Fixed,
) -> Option<Fixed> {
    let mut t_enter = Fixed::ZERO;
    let mut t_exit = max_distance;

    for (a, b) in edges(vertices) {
        let edge = b - a;
        let outward = Vec2Fixed::new(edge.y, -edge.x);
        let denom = outward.dot(direction);
        let numer = outward.dot(a - local_origin);
        if denom == Fixed::ZERO {
            if numer < Fixed::ZERO {
                return None;
            }
            continue;
        }
        let t = numer / denom;
        if denom < Fixed::ZERO {
            t_enter = t_enter.max(t);
        } else {
            t_exit = t_exit.min(t);
        }
        if t_enter > t_exit {
            return None;
        }
    }
    Some(t_enter)
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

    fn close(a: Fixed, b: Fixed) -> bool {
        (a - b).abs() < Fixed::from_num(0.01)
    }

    #[test]
    fn test_circle_contains_and_distance() {
        let shape = Shape::circle(fixed(5));
        assert!(shape.contains_point(vec2(10, 10), vec2(13, 14)));
        assert!(!shape.contains_point(vec2(10, 10), vec2(16, 10)));
        assert_eq!(shape.distance_to_point(vec2(0, 0), vec2(8, 0)), fixed(3));
        assert_eq!(shape.distance_to_point(vec2(0, 0), vec2(1, 0)), Fixed::ZERO);
    }

    #[test]
    fn test_rect_distance() {
        let shape = Shape::rect(fixed(10), fixed(4));
        assert!(shape.contains_point(vec2(0, 0), vec2(5, 2)));
        assert_eq!(shape.distance_to_point(vec2(0, 0), vec2(8, 0)), fixed(3));
        assert_eq!(shape.distance_to_point(vec2(0, 0), vec2(8, 6)), fixed(5));
    }

    #[test]
    fn test_ray_hits_circle() {
        let shape = Shape::circle(fixed(10));
        let hit = shape.ray_intersection(vec2(50, 0), vec2(0, 0), vec2(1, 0), fixed(100));
        assert_eq!(hit, Some(fixed(40)));

        // Pointing away
        let miss = shape.ray_intersection(vec2(50, 0), vec2(0, 0), vec2(-1, 0), fixed(100));
        assert_eq!(miss, None);

        // Out of range
        let short = shape.ray_intersection(vec2(50, 0), vec2(0, 0), vec2(1, 0), fixed(30));
        assert_eq!(short, None);
    }

    #[test]
    fn test_ray_hits_rect() {
        let shape = Shape::rect(fixed(20), fixed(20));
        let hit = shape.ray_intersection(vec2(50, 5), vec2(0, 0), vec2(1, 0), fixed(100));
        assert_eq!(hit, Some(fixed(40)));

        let inside = shape.ray_intersection(vec2(0, 0), vec2(1, 1), vec2(1, 0), fixed(100));
        assert_eq!(inside, Some(Fixed::ZERO));

        let above = shape.ray_intersection(vec2(50, 30), vec2(0, 0), vec2(1, 0), fixed(100));
        assert_eq!(above, None);
    }

    #[test]
    fn test_regular_polygon_is_convex() {
        let shape = Shape::regular_polygon(6, fixed(10));
        let vertices = shape.vertices().unwrap();
        assert_eq!(vertices.len(), 6);
        assert!(is_convex(&vertices));
        assert!(close(shape.bounding_radius(), fixed(10)));
    }

    #[test]
    fn test_regular_polygon_clamps_sides() {
        let shape = Shape::regular_polygon(1, fixed(4));
        assert_eq!(shape.vertices().unwrap().len(), 3);
    }

    #[test]
    fn test_convexity_validation() {
        let square = [vec2(0, 0), vec2(10, 0), vec2(10, 10), vec2(0, 10)];
        assert!(is_convex(&square));

        // Clockwise is still convex and gets reordered
        let clockwise = [vec2(0, 0), vec2(0, 10), vec2(10, 10), vec2(10, 0)];
        let (shape, centroid) = Shape::try_convex_polygon(&clockwise).unwrap();
        assert_eq!(centroid, vec2(5, 5));
        assert!(shape.contains_point(centroid, vec2(9, 9)));

        let dart = [vec2(0, 0), vec2(10, 0), vec2(3, 3), vec2(0, 10)];
        assert!(!is_convex(&dart));

        let star = [vec2(0, 10), vec2(6, -8), vec2(-9, 3), vec2(9, 3), vec2(-6, -8)];
        assert!(!is_convex(&star));

        let collinear = [vec2(0, 0), vec2(5, 0), vec2(10, 0)];
        assert!(Shape::try_convex_polygon(&collinear).is_none());
    }

    #[test]
    fn test_segment_box() {
        let (shape, mid) = Shape::segment_box(vec2(0, 0), vec2(20, 0), fixed(4));
        assert_eq!(mid, vec2(10, 0));
        assert!(shape.contains_point(mid, vec2(19, 1)));
        assert!(!shape.contains_point(mid, vec2(10, 3)));
    }

    #[test]
    fn test_sweep_circle_first_contact() {
        let shape = Shape::circle(fixed(5));
        // Mover radius 1 starting at x=0 heading to x=20; shape at x=10.
        // First contact when centre reaches x=4.
        let t = shape
            .sweep_circle(vec2(10, 0), vec2(0, 0), vec2(20, 0), fixed(1))
            .unwrap();
        assert!(close(t, Fixed::from_num(0.2)));

        // Passing well above
        let miss = shape.sweep_circle(vec2(10, 20), vec2(0, 0), vec2(20, 0), fixed(1));
        assert!(miss.is_none());
    }

    #[test]
    fn test_point_segment_distance() {
        assert_eq!(
            point_segment_distance(vec2(5, 5), vec2(0, 0), vec2(10, 0)),
            fixed(5)
        );
        assert_eq!(
            point_segment_distance(vec2(-3, 4), vec2(0, 0), vec2(10, 0)),
            fixed(5)
        );
        assert_eq!(
            point_segment_distance(vec2(3, 4), vec2(0, 0), vec2(0, 0)),
            fixed(5)
        );
    }
}
