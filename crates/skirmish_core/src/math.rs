//! Fixed-point math utilities for deterministic simulation.
//!
//! All gameplay math uses fixed-point arithmetic so that every client and
//! the authoritative server compute bit-identical results. Floating-point
//! operations can produce different results on different CPUs.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// π in fixed-point.
pub const PI: Fixed = Fixed::from_bits(13_493_037_705);

/// π/2 in fixed-point.
pub const HALF_PI: Fixed = Fixed::from_bits(6_746_518_852);

/// π/4 in fixed-point.
pub const QUARTER_PI: Fixed = Fixed::from_bits(3_373_259_426);

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from whole world units.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        (self - other).length()
    }

    /// Squared length of the vector.
    #[must_use]
    pub fn length_squared(self) -> Fixed {
        self.dot(self)
    }

    /// Length of the vector.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.length_squared())
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross product).
    #[must_use]
    pub fn cross(self, other: Self) -> Fixed {
        self.x * other.y - self.y * other.x
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Normalize vector using fixed-point math.
    ///
    /// The zero vector normalizes to zero.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Heading of this vector in radians, in `(-π, π]`.
    #[must_use]
    pub fn angle(self) -> Fixed {
        fixed_atan2(self.y, self.x)
    }

    /// Check whether both components are zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == Fixed::ZERO && self.y == Fixed::ZERO
    }
}

/// Computes the square root of a fixed-point number.
///
/// Exact integer square root on the raw bits, so the result is the largest
/// representable value whose square does not exceed `value`.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    // bits / 2^32 = v  =>  sqrt(v) * 2^32 = sqrt(bits * 2^32)
    let scaled = (value.to_bits() as u128) << 32;
    Fixed::from_bits(isqrt_u128(scaled) as i64)
}

/// Integer square root (floor) of a 128-bit value.
#[must_use]
pub fn isqrt_u128(n: u128) -> u128 {
    if n < 2 {
        return n;
    }

    let bits = 128 - n.leading_zeros();
    let mut x = 1u128 << ((bits + 1) / 2);
    loop {
        let y = (x + n / x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Deterministic `atan2` approximation in radians.
///
/// Maximum error is about 0.0015 rad, well inside what aiming and path
/// simplification need. `atan2(0, 0)` is 0.
#[must_use]
pub fn fixed_atan2(y: Fixed, x: Fixed) -> Fixed {
    if x == Fixed::ZERO && y == Fixed::ZERO {
        return Fixed::ZERO;
    }

    let abs_x = x.abs();
    let abs_y = y.abs();

    // atan on [0, 1], then unfold into the right octant
    let (ratio, swapped) = if abs_y <= abs_x {
        (abs_y / abs_x, false)
    } else {
        (abs_x / abs_y, true)
    };

    let mut angle = atan_unit(ratio);
    if swapped {
        angle = HALF_PI - angle;
    }
    if x < Fixed::ZERO {
        angle = PI - angle;
    }
    if y < Fixed::ZERO {
        angle = -angle;
    }
    angle
}

/// `atan(z)` for `z` in `[0, 1]`.
fn atan_unit(z: Fixed) -> Fixed {
    const A: Fixed = Fixed::from_bits(1_050_978_497); // 0.2447
    const B: Fixed = Fixed::from_bits(284_756_332); // 0.0663
    QUARTER_PI * z - z * (z - Fixed::ONE) * (A + B * z)
}

/// Deterministic sine in radians.
///
/// Reduces into `[-π/2, π/2]` and evaluates an odd Taylor polynomial up to
/// the 11th power (error below 1e-7).
#[must_use]
pub fn fixed_sin(angle: Fixed) -> Fixed {
    let two_pi = PI + PI;
    let mut x = angle % two_pi;
    if x > PI {
        x -= two_pi;
    } else if x < -PI {
        x += two_pi;
    }
    if x > HALF_PI {
        x = PI - x;
    } else if x < -HALF_PI {
        x = -PI - x;
    }

    let x2 = x * x;
    let mut term = x;
    let mut sum = x;
    for divisor in [6, 20, 42, 72, 110] {
        term = -term * x2 / Fixed::from_num(divisor);
        sum += term;
    }
    sum
}

/// Deterministic cosine in radians.
#[must_use]
pub fn fixed_cos(angle: Fixed) -> Fixed {
    fixed_sin(angle + HALF_PI)
}

/// Unsigned angle in radians between two direction vectors, in `[0, π]`.
///
/// Returns 0 if either vector is zero.
#[must_use]
pub fn angle_between(a: Vec2Fixed, b: Vec2Fixed) -> Fixed {
    if a.is_zero() || b.is_zero() {
        return Fixed::ZERO;
    }
    fixed_atan2(a.cross(b).abs(), a.dot(b))
}

/// Convert a whole number of percent into a fixed-point fraction.
#[must_use]
pub fn percent(value: u32) -> Fixed {
    Fixed::from_num(value) / Fixed::from_num(100)
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::AddAssign for Vec2Fixed {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Neg for Vec2Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

impl std::ops::Mul<Fixed> for Vec2Fixed {
    type Output = Self;

    fn mul(self, rhs: Fixed) -> Self::Output {
        self.scale(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epsilon() -> Fixed {
        Fixed::ONE / Fixed::from_num(10000)
    }

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::from_ints(3, 0);
        let b = Vec2Fixed::from_ints(0, 4);
        // 3² + 4² = 25
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
        assert_eq!(a.distance(b), Fixed::from_num(5));
    }

    #[test]
    fn test_fixed_sqrt_exact_squares() {
        assert_eq!(fixed_sqrt(Fixed::from_num(144)), Fixed::from_num(12));
        assert_eq!(fixed_sqrt(Fixed::from_num(10000)), Fixed::from_num(100));
        assert_eq!(fixed_sqrt(Fixed::ZERO), Fixed::ZERO);
        assert_eq!(fixed_sqrt(Fixed::from_num(-4)), Fixed::ZERO);
    }

    #[test]
    fn test_fixed_sqrt_fraction() {
        let root = fixed_sqrt(Fixed::from_num(2));
        let diff = root * root - Fixed::from_num(2);
        assert!(diff.abs() < epsilon());
    }

    #[test]
    fn test_isqrt_small_values() {
        assert_eq!(isqrt_u128(0), 0);
        assert_eq!(isqrt_u128(1), 1);
        assert_eq!(isqrt_u128(15), 3);
        assert_eq!(isqrt_u128(16), 4);
        assert_eq!(isqrt_u128(u128::from(u64::MAX)), u128::from(u32::MAX));
    }

    #[test]
    fn test_vec2_dot_and_cross() {
        let a = Vec2Fixed::from_ints(2, 3);
        let b = Vec2Fixed::from_ints(4, -1);
        assert_eq!(a.dot(b), Fixed::from_num(5));
        assert_eq!(a.cross(b), Fixed::from_num(-14));
    }

    #[test]
    fn test_vec2_lerp() {
        let a = Vec2Fixed::ZERO;
        let b = Vec2Fixed::from_ints(10, 20);
        let mid = a.lerp(b, Fixed::from_num(0.5));
        assert_eq!(mid, Vec2Fixed::from_ints(5, 10));
    }

    #[test]
    fn test_vec2_normalize() {
        let norm = Vec2Fixed::from_ints(3, 4).normalize();
        let len_sq = norm.dot(norm);
        assert!((len_sq - Fixed::ONE).abs() < epsilon());

        // Direction is preserved: norm.x * 4 == norm.y * 3
        let ratio_diff = (norm.x * Fixed::from_num(4)) - (norm.y * Fixed::from_num(3));
        assert!(ratio_diff.abs() < epsilon());
    }

    #[test]
    fn test_normalize_zero_vector() {
        assert_eq!(Vec2Fixed::ZERO.normalize(), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_atan2_axes_and_diagonals() {
        let tolerance = Fixed::from_num(0.002);
        let one = Fixed::ONE;
        let cases = [
            (Fixed::ZERO, one, Fixed::ZERO),
            (one, Fixed::ZERO, HALF_PI),
            (Fixed::ZERO, -one, PI),
            (-one, Fixed::ZERO, -HALF_PI),
            (one, one, QUARTER_PI),
            (-one, -one, -(PI - QUARTER_PI)),
        ];
        for (y, x, expected) in cases {
            let got = fixed_atan2(y, x);
            assert!(
                (got - expected).abs() < tolerance,
                "atan2({y}, {x}) = {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn test_angle_between() {
        let right = Vec2Fixed::from_ints(1, 0);
        let up = Vec2Fixed::from_ints(0, 1);
        let tolerance = Fixed::from_num(0.002);
        assert!((angle_between(right, up) - HALF_PI).abs() < tolerance);
        assert!(angle_between(right, right.scale(Fixed::from_num(3))) < tolerance);
        assert!((angle_between(right, -right) - PI).abs() < tolerance);
    }

    #[test]
    fn test_sin_cos() {
        let tolerance = Fixed::from_num(0.0001);
        assert!(fixed_sin(Fixed::ZERO).abs() < tolerance);
        assert!((fixed_sin(HALF_PI) - Fixed::ONE).abs() < tolerance);
        assert!((fixed_cos(PI) + Fixed::ONE).abs() < tolerance);
        assert!((fixed_sin(-HALF_PI) + Fixed::ONE).abs() < tolerance);
        // Outside the principal range
        assert!((fixed_sin(PI + PI + HALF_PI) - Fixed::ONE).abs() < tolerance);
        assert!((fixed_cos(Fixed::from_num(-7)) - Fixed::from_num(0.753_902)).abs() < tolerance);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(50), Fixed::from_num(0.5));
        assert_eq!(percent(100), Fixed::ONE);
    }
}
