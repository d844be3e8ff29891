//! Fixed-point arithmetic for the render path
//!
//! Uses Q16.16 fixed-point format for every length, velocity and
//! pre-rounding screen coordinate. This avoids hardware floating-point
//! requirements on Cortex-M0+.
//!
//! Multiplication and division always go through an i64 intermediate.
//!
//! # Division by zero
//!
//! - [`Fixed::checked_div`] returns `None`.
//! - [`Fixed::saturating_div`] returns [`Fixed::MAX`] or [`Fixed::MIN`] by the
//!   sign of the numerator, and [`Fixed::ZERO`] for `0 / 0`.
//! - The `/` operator, [`Fixed::div_int`] and [`Fixed::mul_div`] debug-assert a
//!   non-zero divisor and saturate in release builds.

use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Q16.16 fixed-point number
///
/// Range: approximately -32768.0 to +32767.99998
/// Resolution: approximately 0.000015
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fixed(i32);

impl Fixed {
    /// Zero value
    pub const ZERO: Self = Self(0);

    /// One (1.0)
    pub const ONE: Self = Self(1 << 16);

    /// One half (0.5)
    pub const HALF: Self = Self(1 << 15);

    /// Largest representable value
    pub const MAX: Self = Self(i32::MAX);

    /// Smallest representable value
    pub const MIN: Self = Self(i32::MIN);

    /// Smallest positive step (one raw unit)
    pub const EPSILON: Self = Self(1);

    /// Fractional bits (16)
    pub const FRAC_BITS: u32 = 16;

    /// Create from a whole integer
    ///
    /// Integers outside ±32767 do not fit and wrap.
    ///
    /// # Example
    /// ```
    /// use gravline_core::fixed::Fixed;
    /// let two = Fixed::from_int(2);
    /// assert_eq!(two.to_int(), 2);
    /// ```
    #[inline]
    pub const fn from_int(n: i32) -> Self {
        Self(n << Self::FRAC_BITS)
    }

    /// Create from a float, truncating toward zero
    ///
    /// For constants and tooling only; nothing in the render path
    /// touches floating point.
    #[inline]
    pub fn from_float(f: f32) -> Self {
        Self((f * (1u32 << Self::FRAC_BITS) as f32) as i32)
    }

    /// Create from raw i32 representation
    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Create from a ratio of integers (`num / den`)
    ///
    /// Saturates if `den` is zero.
    #[inline]
    pub fn from_ratio(num: i32, den: i32) -> Self {
        Self::from_int(1).mul_div(num, den)
    }

    /// Get the raw i32 representation
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Convert to whole integer, truncating toward zero
    #[inline]
    pub const fn to_int(self) -> i32 {
        self.0 / (1 << Self::FRAC_BITS)
    }

    /// Drop the fractional part, truncating toward zero
    #[inline]
    pub const fn trunc(self) -> Self {
        Self(self.to_int() << Self::FRAC_BITS)
    }

    /// Round to the nearest integer, ties away from zero
    #[inline]
    pub const fn round_to_int(self) -> i32 {
        let raw = self.0 as i64;
        let half = 1i64 << (Self::FRAC_BITS - 1);
        let rounded = if raw >= 0 {
            (raw + half) >> Self::FRAC_BITS
        } else {
            -((-raw + half) >> Self::FRAC_BITS)
        };
        rounded as i32
    }

    /// Checked addition
    #[inline]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction
    #[inline]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Saturating addition (clamps on overflow)
    #[inline]
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction (clamps on underflow)
    #[inline]
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    #[inline]
    const fn wide_mul(self, other: Self) -> i64 {
        ((self.0 as i64) * (other.0 as i64)) >> Self::FRAC_BITS
    }

    /// Multiply, returning `None` if the product does not fit
    #[inline]
    pub fn checked_mul(self, other: Self) -> Option<Self> {
        i32::try_from(self.wide_mul(other)).ok().map(Self)
    }

    /// Multiply, clamping to the representable range
    #[inline]
    pub fn saturating_mul(self, other: Self) -> Self {
        Self(saturate(self.wide_mul(other)))
    }

    /// Divide, returning `None` on a zero divisor or overflow
    #[inline]
    pub fn checked_div(self, other: Self) -> Option<Self> {
        if other.0 == 0 {
            return None;
        }
        let result = ((self.0 as i64) << Self::FRAC_BITS) / (other.0 as i64);
        i32::try_from(result).ok().map(Self)
    }

    /// Divide, clamping to the representable range
    ///
    /// A zero divisor yields `MAX`/`MIN` by the numerator's sign, or `ZERO`
    /// for `0 / 0`.
    #[inline]
    pub fn saturating_div(self, other: Self) -> Self {
        if other.0 == 0 {
            return Self::overflow_sentinel(self.0 as i64);
        }
        let result = ((self.0 as i64) << Self::FRAC_BITS) / (other.0 as i64);
        Self(saturate(result))
    }

    /// Multiply by an integer
    #[inline]
    pub fn mul_int(self, n: i32) -> Self {
        Self(self.0.saturating_mul(n))
    }

    /// Divide by an integer
    #[inline]
    pub fn div_int(self, divisor: i32) -> Self {
        debug_assert!(divisor != 0, "fixed-point division by zero");
        if divisor == 0 {
            return Self::overflow_sentinel(self.0 as i64);
        }
        Self(saturate(self.0 as i64 / divisor as i64))
    }

    /// Compute `self * num / den` with a single widened intermediate
    ///
    /// Scales by a rational without the precision loss of a second
    /// fixed-point multiply.
    #[inline]
    pub fn mul_div(self, num: i32, den: i32) -> Self {
        debug_assert!(den != 0, "fixed-point division by zero");
        let wide = (self.0 as i64) * (num as i64);
        if den == 0 {
            return Self::overflow_sentinel(wide);
        }
        Self(saturate(wide / den as i64))
    }

    /// Linear interpolation: `self + (other - self) * t`
    #[inline]
    pub fn lerp(self, other: Self, t: Self) -> Self {
        let delta = other.0 as i64 - self.0 as i64;
        let step = (delta * t.0 as i64) >> Self::FRAC_BITS;
        Self(saturate(self.0 as i64 + step))
    }

    /// Clamp value to a range
    #[inline]
    pub fn clamp(self, min: Self, max: Self) -> Self {
        Self(self.0.clamp(min.0, max.0))
    }

    /// Smaller of two values
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// Larger of two values
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    /// Absolute value
    ///
    /// `MIN` has no positive counterpart and saturates to `MAX`.
    #[inline]
    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Sign of the value: -1, 0 or 1
    #[inline]
    pub const fn sign(self) -> i32 {
        self.0.signum()
    }

    /// Check if value is negative
    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Check if value is zero
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    const fn overflow_sentinel(numerator: i64) -> Self {
        if numerator > 0 {
            Self::MAX
        } else if numerator < 0 {
            Self::MIN
        } else {
            Self::ZERO
        }
    }
}

#[inline]
const fn saturate(wide: i64) -> i32 {
    if wide > i32::MAX as i64 {
        i32::MAX
    } else if wide < i32::MIN as i64 {
        i32::MIN
    } else {
        wide as i32
    }
}

impl Add for Fixed {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self(self.0.wrapping_add(other.0))
    }
}

impl AddAssign for Fixed {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Fixed {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self(self.0.wrapping_sub(other.0))
    }
}

impl SubAssign for Fixed {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Mul for Fixed {
    type Output = Self;

    /// Truncating multiply; wraps if the product does not fit
    #[inline]
    fn mul(self, other: Self) -> Self {
        Self(self.wide_mul(other) as i32)
    }
}

impl Div for Fixed {
    type Output = Self;

    #[inline]
    fn div(self, other: Self) -> Self {
        debug_assert!(other.0 != 0, "fixed-point division by zero");
        self.saturating_div(other)
    }
}

impl Neg for Fixed {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl From<i16> for Fixed {
    fn from(n: i16) -> Self {
        Self::from_int(n as i32)
    }
}
