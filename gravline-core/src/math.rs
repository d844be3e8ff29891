//! Fixed-point vector math
//!
//! 3D vectors of [`Fixed`] components, widened dot/cross products and an
//! integer square root for normalization. No floating point.

use core::ops::{Add, Neg, Sub};

use crate::fixed::Fixed;

/// 3D vector of fixed-point components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vec3 {
    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
}

impl Vec3 {
    /// Zero vector
    pub const ZERO: Self = Self::new(Fixed::ZERO, Fixed::ZERO, Fixed::ZERO);

    /// Create from fixed-point components
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// Create from whole-integer components
    pub const fn from_ints(x: i32, y: i32, z: i32) -> Self {
        Self::new(Fixed::from_int(x), Fixed::from_int(y), Fixed::from_int(z))
    }

    /// Scale every component by a fixed-point factor
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(
            self.x.saturating_mul(factor),
            self.y.saturating_mul(factor),
            self.z.saturating_mul(factor),
        )
    }

    /// Dot product
    ///
    /// Products are summed at full Q32.32 precision before rescaling,
    /// so only the final result is rounded.
    pub fn dot(self, other: Self) -> Fixed {
        let sum = wide(self.x) * wide(other.x)
            + wide(self.y) * wide(other.y)
            + wide(self.z) * wide(other.z);
        rescale(sum)
    }

    /// Cross product
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            rescale(wide(self.y) * wide(other.z) - wide(self.z) * wide(other.y)),
            rescale(wide(self.z) * wide(other.x) - wide(self.x) * wide(other.z)),
            rescale(wide(self.x) * wide(other.y) - wide(self.y) * wide(other.x)),
        )
    }

    /// Squared length in Q32.32
    ///
    /// Kept unsigned and wide: three squared i32 components overflow i64.
    pub fn length_squared_wide(self) -> u64 {
        let sq = |c: Fixed| {
            let a = c.raw().unsigned_abs() as u64;
            a * a
        };
        sq(self.x) + sq(self.y) + sq(self.z)
    }

    /// Length, saturating at [`Fixed::MAX`]
    pub fn length(self) -> Fixed {
        let len = isqrt(self.length_squared_wide());
        Fixed::from_raw(i32::try_from(len).unwrap_or(i32::MAX))
    }

    /// Unit vector in the same direction
    ///
    /// The zero vector normalizes to the zero vector.
    pub fn normalize(self) -> Self {
        let len = isqrt(self.length_squared_wide()) as i64;
        if len == 0 {
            return Self::ZERO;
        }
        let unit = |c: Fixed| {
            let scaled = ((c.raw() as i64) << Fixed::FRAC_BITS) / len;
            Fixed::from_raw(scaled.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
        };
        Self::new(unit(self.x), unit(self.y), unit(self.z))
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

#[inline]
fn wide(c: Fixed) -> i64 {
    c.raw() as i64
}

/// Q32.32 accumulator back to Q16.16, clamped
#[inline]
fn rescale(sum: i64) -> Fixed {
    let shifted = sum >> Fixed::FRAC_BITS;
    Fixed::from_raw(shifted.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}

/// Integer square root (floor), digit-by-digit
///
/// Taking the root of a Q32.32 value yields a Q16.16 value.
pub fn isqrt(n: u64) -> u64 {
    let mut remainder = n;
    let mut root = 0u64;
    // Highest power of four not exceeding n
    let mut bit = 1u64 << 62;
    while bit > remainder {
        bit >>= 2;
    }
    while bit != 0 {
        if remainder >= root + bit {
            remainder -= root + bit;
            root = (root >> 1) + bit;
        } else {
            root >>= 1;
        }
        bit >>= 2;
    }
    root
}

/// A projected point in device pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScreenPoint {
    pub x: i16,
    pub y: i16,
}

impl ScreenPoint {
    /// Create a screen point
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}
