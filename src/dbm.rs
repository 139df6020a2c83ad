//! Difference bound matrices.
//!
//! A [`Dbm`] of dimension `n` describes one convex zone over clocks
//! `x_0 .. x_{n-1}`, where `x_0` is the reference clock fixed at zero.
//! Entry `(i, j)` bounds the difference `x_i - x_j`.

use std::fmt;

use crate::bound::Bound;
use crate::error::{CddError, Result};

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Dbm {
    dim: usize,
    data: Vec<Bound>,
}

impl Dbm {
    /// Creates the unconstrained zone of the given dimension.
    ///
    /// Clocks may take negative values; only the diagonal is constrained.
    pub fn new(dim: usize) -> Self {
        assert!(dim >= 1, "A matrix needs at least the reference clock");
        let mut data = vec![Bound::INFINITY; dim * dim];
        for i in 0..dim {
            data[i * dim + i] = Bound::ZERO;
        }
        Self { dim, data }
    }

    /// Creates the zone where every clock is non-negative.
    pub fn init(dim: usize) -> Self {
        let mut dbm = Self::new(dim);
        for j in 1..dim {
            dbm.set(0, j, Bound::ZERO);
        }
        dbm
    }

    /// Top-left `dim x dim` block: the zone projected onto the first `dim`
    /// clocks. Projecting a closed matrix gives a closed matrix.
    pub fn projected(&self, dim: usize) -> Dbm {
        assert!(dim >= 1 && dim <= self.dim, "Cannot project {} clocks onto {}", self.dim, dim);
        let mut dbm = Dbm::new(dim);
        for i in 0..dim {
            for j in 0..dim {
                dbm.set(i, j, self.get(i, j));
            }
        }
        dbm
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn get(&self, i: usize, j: usize) -> Bound {
        self.data[i * self.dim + j]
    }

    pub fn set(&mut self, i: usize, j: usize, bound: Bound) {
        self.data[i * self.dim + j] = bound;
    }

    fn mark_empty(&mut self) {
        self.data[0] = Bound::LT_ZERO;
    }

    /// Checks for a negative diagonal entry.
    ///
    /// Only conclusive on closed matrices; see [`Dbm::is_valid`].
    pub fn is_empty(&self) -> bool {
        (0..self.dim).any(|i| self.get(i, i) < Bound::ZERO)
    }

    /// Returns `true` iff the zone is non-empty, closing a copy if needed.
    pub fn is_valid(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.clone().close()
    }

    /// Checks that every entry is already the tightest path bound.
    pub fn is_closed(&self) -> bool {
        let n = self.dim;
        for k in 0..n {
            for i in 0..n {
                let dik = self.get(i, k);
                if dik.is_infinity() {
                    continue;
                }
                for j in 0..n {
                    if dik.add(self.get(k, j)) < self.get(i, j) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Tightens every entry to its shortest-path value (Floyd–Warshall).
    ///
    /// Returns `false` and leaves the matrix marked empty if a negative
    /// cycle is found.
    pub fn close(&mut self) -> bool {
        let n = self.dim;
        for k in 0..n {
            for i in 0..n {
                let dik = self.get(i, k);
                if dik.is_infinity() {
                    continue;
                }
                for j in 0..n {
                    let through = dik.add(self.get(k, j));
                    if through < self.get(i, j) {
                        self.set(i, j, through);
                    }
                }
                if self.get(i, i) < Bound::ZERO {
                    self.mark_empty();
                    return false;
                }
            }
        }
        true
    }

    /// Adds `x_i - x_j ≺ bound` to a closed, non-empty matrix and restores
    /// closure in `O(n²)`.
    ///
    /// Returns `false` (and marks the matrix empty) if the zone becomes empty.
    pub fn constrain(&mut self, i: usize, j: usize, bound: Bound) -> bool {
        debug_assert_ne!(i, j);
        if self.is_empty() {
            return false;
        }
        if bound >= self.get(i, j) {
            return true;
        }
        if bound.add(self.get(j, i)) < Bound::ZERO {
            self.mark_empty();
            return false;
        }
        self.set(i, j, bound);

        let n = self.dim;
        for k in 0..n {
            let dki = self.get(k, i);
            if dki.is_infinity() {
                continue;
            }
            let via = dki.add(bound);
            for l in 0..n {
                let through = via.add(self.get(j, l));
                if through < self.get(k, l) {
                    self.set(k, l, through);
                }
            }
        }
        true
    }

    fn check_dim(&self, other: &Dbm) -> Result<()> {
        if self.dim != other.dim {
            return Err(CddError::DimensionMismatch {
                expected: self.dim,
                found: other.dim,
            });
        }
        Ok(())
    }

    /// In-place conjunction followed by closure.
    ///
    /// Returns whether the intersection is non-empty.
    pub fn intersect(&mut self, other: &Dbm) -> Result<bool> {
        self.check_dim(other)?;
        for (a, &b) in self.data.iter_mut().zip(other.data.iter()) {
            if b < *a {
                *a = b;
            }
        }
        Ok(self.close())
    }

    /// Compares the closures of both matrices entrywise.
    ///
    /// Two empty matrices are equal regardless of their entries.
    pub fn canonical_eq(&self, other: &Dbm) -> Result<bool> {
        self.check_dim(other)?;
        let mut a = self.clone();
        let mut b = other.clone();
        match (a.close(), b.close()) {
            (true, true) => Ok(a == b),
            (false, false) => Ok(true),
            _ => Ok(false),
        }
    }

    /// Checks whether the zone of `self` contains the zone of `other`.
    ///
    /// Both matrices must be closed.
    pub fn includes(&self, other: &Dbm) -> Result<bool> {
        self.check_dim(other)?;
        if other.is_empty() {
            return Ok(true);
        }
        if self.is_empty() {
            return Ok(false);
        }
        Ok(other.data.iter().zip(self.data.iter()).all(|(o, s)| o <= s))
    }

    /// Checks whether the intersection with `l ≺' x_i - x_j ≺ upper` is
    /// non-empty, where the lower side is given as the previous cut point
    /// (`x_i - x_j` must *not* satisfy `lower`).
    ///
    /// The matrix must be closed and non-empty.
    pub(crate) fn admits(&self, i: usize, j: usize, lower: Option<Bound>, upper: Bound) -> bool {
        if !upper.is_infinity() && upper.add(self.get(j, i)) < Bound::ZERO {
            return false;
        }
        if let Some(lower) = lower {
            if lower.complement().add(self.get(i, j)) < Bound::ZERO {
                return false;
            }
        }
        true
    }

    /// Copy of `self` restricted to the cut interval `(lower, upper]` on
    /// `x_i - x_j`. Callers check [`Dbm::admits`] first.
    pub(crate) fn restricted(&self, i: usize, j: usize, lower: Option<Bound>, upper: Bound) -> Dbm {
        let mut dbm = self.clone();
        if !upper.is_infinity() {
            dbm.constrain(i, j, upper);
        }
        if let Some(lower) = lower {
            dbm.constrain(j, i, lower.complement());
        }
        debug_assert!(!dbm.is_empty());
        dbm
    }
}

impl fmt::Debug for Dbm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dbm(dim = {}) ", self.dim)?;
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Dbm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "[empty]");
        }
        for i in 0..self.dim {
            write!(f, "[")?;
            for j in 0..self.dim {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:>7}", self.get(i, j).to_string())?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    /// 1 <= x1 <= 4, 0 <= x2 <= 3, x1 - x2 <= 2
    fn example() -> Dbm {
        let mut dbm = Dbm::init(3);
        dbm.set(1, 0, Bound::le(4));
        dbm.set(0, 1, Bound::le(-1));
        dbm.set(2, 0, Bound::le(3));
        dbm.set(1, 2, Bound::le(2));
        dbm
    }

    #[test]
    fn test_new_is_closed() {
        assert!(Dbm::new(3).is_closed());
        assert!(Dbm::init(3).is_closed());
        assert!(Dbm::new(1).is_valid());
    }

    #[test]
    fn test_close_tightens() {
        let mut dbm = example();
        assert!(!dbm.is_closed());
        assert!(dbm.close());
        assert!(dbm.is_closed());
        // x2 - x1 <= x2 - x0 + x0 - x1 = 3 - 1
        assert_eq!(dbm.get(2, 1), Bound::le(2));
        // x0 - x2 <= x0 - x1 + x1 - x2 = -1 + 2
        assert_eq!(dbm.get(0, 2), Bound::le(0));
        // idempotent
        let copy = dbm.clone();
        assert!(dbm.close());
        assert_eq!(dbm, copy);
    }

    #[test]
    fn test_close_detects_negative_cycle() {
        let mut dbm = Dbm::init(2);
        dbm.set(1, 0, Bound::le(2));
        dbm.set(0, 1, Bound::lt(-2));
        assert!(!dbm.close());
        assert!(dbm.is_empty());
        assert!(!dbm.is_valid());
    }

    #[test]
    fn test_constrain_matches_close() {
        let mut incremental = example();
        incremental.close();
        assert!(incremental.constrain(2, 1, Bound::lt(0)));

        let mut full = example();
        full.set(2, 1, Bound::lt(0));
        full.close();

        assert_eq!(incremental, full);
    }

    #[test]
    fn test_constrain_to_empty() {
        let mut dbm = example();
        dbm.close();
        assert!(!dbm.constrain(2, 0, Bound::lt(-1)));
        assert!(dbm.is_empty());
        assert!(!dbm.constrain(1, 0, Bound::le(3)));
    }

    #[test]
    fn test_intersect() {
        let mut a = example();
        a.close();
        let mut b = Dbm::init(3);
        b.set(0, 2, Bound::le(-1));
        b.close();
        assert_eq!(a.intersect(&b), Ok(true));
        assert_eq!(a.get(0, 2), Bound::le(-1));
        assert!(a.is_closed());

        let mut c = Dbm::init(3);
        c.set(1, 0, Bound::lt(1));
        assert_eq!(a.intersect(&c), Ok(false));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut a = Dbm::init(3);
        let b = Dbm::init(2);
        assert_eq!(
            a.intersect(&b),
            Err(CddError::DimensionMismatch { expected: 3, found: 2 })
        );
        assert!(a.canonical_eq(&b).is_err());
    }

    #[test]
    fn test_canonical_eq() {
        let mut closed = example();
        closed.close();
        assert_eq!(example().canonical_eq(&closed), Ok(true));
        assert_eq!(Dbm::init(3).canonical_eq(&closed), Ok(false));
    }

    #[test]
    fn test_includes() {
        let mut zone = example();
        zone.close();
        assert_eq!(Dbm::init(3).includes(&zone), Ok(true));
        assert_eq!(zone.includes(&Dbm::init(3)), Ok(false));
    }

    #[test]
    fn test_admits_and_restricted() {
        let mut zone = example();
        zone.close();
        // x1 - x0 in (4, inf) is outside the zone
        assert!(!zone.admits(1, 0, Some(Bound::le(4)), Bound::INFINITY));
        // x1 - x0 in (-inf, 1) is outside too
        assert!(!zone.admits(1, 0, None, Bound::lt(1)));
        assert!(zone.admits(1, 0, Some(Bound::lt(2)), Bound::le(2)));
        let sub = zone.restricted(1, 0, Some(Bound::lt(2)), Bound::le(2));
        assert_eq!(sub.get(1, 0), Bound::le(2));
        assert_eq!(sub.get(0, 1), Bound::le(-2));
        assert!(sub.is_closed());
    }

    #[test]
    fn test_projected() {
        let mut zone = example();
        zone.close();
        let x1 = zone.projected(2);
        assert_eq!(x1.dim(), 2);
        assert_eq!(x1.get(1, 0), Bound::le(4));
        assert_eq!(x1.get(0, 1), Bound::le(-1));
        assert!(x1.is_closed());
        assert_eq!(zone.projected(3), zone);
        assert_eq!(zone.projected(1), Dbm::new(1));
    }

    #[test]
    fn test_display() {
        let text = Dbm::init(2).to_string();
        assert!(text.contains("<=0"));
        assert!(text.contains("<=inf"));
    }
}
