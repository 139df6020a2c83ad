//! Zone extraction, zone containment and the non-negative restriction.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::cdd::{Cdd, Op};
use crate::dbm::Dbm;
use crate::error::{CddError, Result};
use crate::reference::Ref;

/// One zone taken out of a federation.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Closed, non-empty matrix of the requested dimension: the zone
    /// projected onto its first clocks.
    pub dbm: Dbm,
    /// Diagram of the whole zone, over all clocks of the manager.
    pub zone: Ref,
    /// The federation without the zone, reduced.
    pub remainder: Ref,
}

impl Cdd {
    /// Picks one zone of the federation `f`.
    ///
    /// Walks down from the root, following the first edge that keeps the
    /// accumulated constraints satisfiable and backtracking out of dead
    /// ends. On a reduced diagram the first path found is always complete.
    ///
    /// The returned matrix has `dim` clocks, which must be between one and
    /// the manager's clock count. For a closed, non-empty matrix `m`,
    /// extracting from [`Cdd::from_dbm`]`(&m)` with `m.dim()` gives `m` back.
    ///
    /// ```
    /// use cdd_rs::cdd::Cdd;
    ///
    /// let cdd = Cdd::default();
    /// cdd.add_clocks(2);
    /// let f = cdd.interval(1, 0, 2, 7).unwrap();
    ///
    /// let ex = cdd.extract_dbm(f, 2).unwrap();
    /// assert_eq!(ex.zone, f);
    /// assert!(cdd.is_zero(ex.remainder));
    /// assert!(cdd.extract_dbm(cdd.zero(), 2).is_err());
    /// assert!(cdd.extract_dbm(f, 3).is_err());
    /// ```
    pub fn extract_dbm(&self, f: Ref, dim: usize) -> Result<Extraction> {
        debug!("extract_dbm(f = {}, dim = {})", f, dim);

        if dim == 0 || dim > self.clocks().max(1) {
            return Err(CddError::DimensionMismatch {
                expected: self.clocks(),
                found: dim,
            });
        }

        let mut dead = HashSet::new();
        let full = self
            .extract_rec(f, self.universe(), &mut dead)
            .ok_or(CddError::EmptyFederation)?;

        assert!(full.is_valid(), "Extracted an empty zone from {}", f);
        assert!(full.is_closed(), "Extracted a non-closed zone from {}", f);

        let zone = self.from_dbm(&full)?;
        let remainder = self.apply_reduce(Op::And, f, -zone);
        let dbm = full.projected(dim);
        debug!("extract_dbm: zone = {}, remainder = {}", zone, remainder);

        Ok(Extraction {
            dbm,
            zone,
            remainder,
        })
    }

    fn extract_rec(&self, f: Ref, ctx: Dbm, dead: &mut HashSet<(Ref, Dbm)>) -> Option<Dbm> {
        if self.is_zero(f) {
            return None;
        }
        if self.is_one(f) {
            return Some(ctx);
        }
        if dead.contains(&(f, ctx.clone())) {
            return None;
        }

        let pair = self.pair(f);
        let (i, j) = (pair.i(), pair.j());
        let mut lower = None;
        for e in self.elems(f) {
            if !self.is_zero(e.child) && ctx.admits(i, j, lower, e.bound) {
                let sub = ctx.restricted(i, j, lower, e.bound);
                if let Some(dbm) = self.extract_rec(e.child, sub, dead) {
                    return Some(dbm);
                }
            }
            lower = Some(e.bound);
        }

        dead.insert((f, ctx));
        None
    }

    /// Checks whether the zone of `dbm` lies inside the federation of `f`.
    ///
    /// The matrix may cover fewer clocks than the manager; the remaining
    /// clocks are unconstrained. An empty zone is contained in anything.
    pub fn contains(&self, f: Ref, dbm: &Dbm) -> Result<bool> {
        debug!("contains(f = {}, dim = {})", f, dbm.dim());

        let dim = dbm.dim();
        let ctx_dim = self.clocks().max(1);
        if dim > ctx_dim {
            return Err(CddError::DimensionMismatch {
                expected: self.clocks(),
                found: dim,
            });
        }

        let mut zone = dbm.clone();
        if !zone.close() {
            return Ok(true);
        }

        let mut ctx = self.universe();
        for i in 0..dim {
            for j in 0..dim {
                ctx.set(i, j, zone.get(i, j));
            }
        }

        let mut memo = HashMap::new();
        Ok(self.contains_rec(f, &ctx, &mut memo))
    }

    /// Every path from `f` that stays feasible under `ctx` must end in one.
    fn contains_rec(&self, f: Ref, ctx: &Dbm, memo: &mut HashMap<(Ref, Dbm), bool>) -> bool {
        if self.is_one(f) {
            return true;
        }
        if self.is_zero(f) {
            return false;
        }

        let key = (f, ctx.clone());
        if let Some(&res) = memo.get(&key) {
            return res;
        }

        let pair = self.pair(f);
        let (i, j) = (pair.i(), pair.j());
        let mut lower = None;
        let mut res = true;
        for e in self.elems(f) {
            if ctx.admits(i, j, lower, e.bound) {
                let sub = ctx.restricted(i, j, lower, e.bound);
                if !self.contains_rec(e.child, &sub, memo) {
                    res = false;
                    break;
                }
            }
            lower = Some(e.bound);
        }

        memo.insert(key, res);
        res
    }

    /// Restricts `f` to valuations where every clock is non-negative.
    ///
    /// With only the reference clock, `f` is returned unchanged.
    pub fn remove_negative(&self, f: Ref) -> Ref {
        debug!("remove_negative(f = {})", f);

        let clocks = self.clocks();
        if clocks <= 1 {
            return f;
        }

        let mut non_negative = self.one();
        for i in 1..clocks {
            let clock = self.lower_bound_unchecked(i);
            non_negative = self.apply_reduce(Op::And, non_negative, clock);
        }
        self.apply_reduce(Op::And, f, non_negative)
    }

    /// `x_i - x_0 >= 0` for a clock known to exist.
    fn lower_bound_unchecked(&self, i: usize) -> Ref {
        match self.lower_bound(i, 0, 0) {
            Ok(f) => f,
            Err(e) => panic!("Clock {} should be valid: {}", i, e),
        }
    }
}
