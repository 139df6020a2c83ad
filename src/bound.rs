//! Difference bounds: `x_i - x_j < c` or `x_i - x_j <= c`.
//!
//! A [`Bound`] packs the magnitude and the strictness flag into one `i32`
//! (`raw = c << 1 | weak`). With this encoding the natural integer order is
//! exactly the tightness order: `< c` is tighter than `<= c`, which is
//! tighter than `< c + 1`.

use std::fmt;

/// Strictness of a bound.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Strictness {
    /// `<`
    Strict,
    /// `<=`
    Weak,
}

/// A single difference bound.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Bound(i32);

impl Bound {
    /// Largest magnitude a finite bound may carry.
    pub const MAX_VALUE: i32 = (i32::MAX >> 1) - 1;

    /// No constraint (`<= inf`).
    pub const INFINITY: Self = Self(i32::MAX);

    /// `<= 0`, the diagonal value of a consistent matrix.
    pub const ZERO: Self = Self::le(0);

    /// `< 0`, the tightest inconsistent diagonal value.
    pub const LT_ZERO: Self = Self::lt(0);

    /// # Panics
    ///
    /// In debug builds, if `|value|` exceeds [`Bound::MAX_VALUE`].
    pub const fn new(value: i32, strictness: Strictness) -> Self {
        debug_assert!(Self::is_representable(value), "Bound value out of range");
        let weak = match strictness {
            Strictness::Strict => 0,
            Strictness::Weak => 1,
        };
        Self((value << 1) | weak)
    }

    /// `<= value`
    pub const fn le(value: i32) -> Self {
        Self::new(value, Strictness::Weak)
    }

    /// `< value`
    pub const fn lt(value: i32) -> Self {
        Self::new(value, Strictness::Strict)
    }

    /// Checks that `value` fits the encoding.
    pub const fn is_representable(value: i32) -> bool {
        value >= -Self::MAX_VALUE && value <= Self::MAX_VALUE
    }

    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    pub const fn value(self) -> i32 {
        self.0 >> 1
    }

    pub const fn strictness(self) -> Strictness {
        if self.0 & 1 == 0 {
            Strictness::Strict
        } else {
            Strictness::Weak
        }
    }

    pub const fn is_strict(self) -> bool {
        self.0 & 1 == 0
    }

    pub const fn is_infinity(self) -> bool {
        self.0 == Self::INFINITY.0
    }

    /// Composes two bounds along a path: magnitudes add, and the result is
    /// strict iff either side is.
    pub fn add(self, other: Bound) -> Bound {
        if self.is_infinity() || other.is_infinity() {
            return Bound::INFINITY;
        }
        let sum = self.0 as i64 + other.0 as i64 - ((self.0 | other.0) & 1) as i64;
        // Saturate: a finite sum never reaches infinity.
        Bound(sum.clamp(i32::MIN as i64, Self::INFINITY.0 as i64 - 2) as i32)
    }

    /// Bound on `x_j - x_i` describing the values of `x_i - x_j` that do
    /// *not* satisfy `self`.
    ///
    /// ```text
    /// not (x_i - x_j <= c)  <=>  x_j - x_i < -c
    /// not (x_i - x_j <  c)  <=>  x_j - x_i <= -c
    /// ```
    pub fn complement(self) -> Bound {
        assert!(!self.is_infinity(), "Infinity has no complement");
        Bound(1 - self.0)
    }
}

impl fmt::Debug for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinity() {
            write!(f, "<=inf")
        } else if self.is_strict() {
            write!(f, "<{}", self.value())
        } else {
            write!(f, "<={}", self.value())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_tightness() {
        assert!(Bound::lt(3) < Bound::le(3));
        assert!(Bound::le(3) < Bound::lt(4));
        assert!(Bound::le(-5) < Bound::lt(0));
        assert!(Bound::le(Bound::MAX_VALUE) < Bound::INFINITY);
        assert_eq!(Bound::ZERO.value(), 0);
        assert!(!Bound::ZERO.is_strict());
        assert!(Bound::INFINITY.is_infinity());
        assert!(!Bound::INFINITY.is_strict());
    }

    #[test]
    fn test_extreme_values() {
        assert_eq!(Bound::le(Bound::MAX_VALUE).value(), Bound::MAX_VALUE);
        assert_eq!(Bound::lt(-Bound::MAX_VALUE).value(), -Bound::MAX_VALUE);
        assert!(Bound::lt(-Bound::MAX_VALUE) < Bound::le(Bound::MAX_VALUE));
        assert!(Bound::is_representable(Bound::MAX_VALUE));
        assert!(!Bound::is_representable(1 << 30));
        assert!(!Bound::is_representable(i32::MIN));
    }

    #[test]
    fn test_add() {
        assert_eq!(Bound::le(2).add(Bound::le(3)), Bound::le(5));
        assert_eq!(Bound::lt(2).add(Bound::le(3)), Bound::lt(5));
        assert_eq!(Bound::le(2).add(Bound::lt(-3)), Bound::lt(-1));
        assert_eq!(Bound::lt(2).add(Bound::lt(3)), Bound::lt(5));
        assert_eq!(Bound::le(7).add(Bound::INFINITY), Bound::INFINITY);
    }

    #[test]
    fn test_complement() {
        assert_eq!(Bound::le(3).complement(), Bound::lt(-3));
        assert_eq!(Bound::lt(3).complement(), Bound::le(-3));
        assert_eq!(Bound::lt(-8).complement(), Bound::le(8));
        assert_eq!(Bound::le(5).complement().complement(), Bound::le(5));
    }

    #[test]
    #[should_panic(expected = "Infinity has no complement")]
    fn test_complement_infinity_panics() {
        Bound::INFINITY.complement();
    }

    #[test]
    fn test_display() {
        assert_eq!(Bound::le(4).to_string(), "<=4");
        assert_eq!(Bound::lt(-2).to_string(), "<-2");
        assert_eq!(Bound::INFINITY.to_string(), "<=inf");
    }
}
