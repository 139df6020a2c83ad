//! Enumeration of the zones of a federation.
//!
//! Every path from the root to [`Cdd::one`] whose constraints are jointly
//! satisfiable contributes one zone. The zones of an unreduced diagram are
//! disjoint but may be numerous; reduce first to get fewer of them.
//!
//! ```
//! use cdd_rs::cdd::Cdd;
//!
//! let cdd = Cdd::default();
//! cdd.add_clocks(2);
//! let a = cdd.interval(1, 0, 0, 2).unwrap();
//! let b = cdd.interval(1, 0, 5, 7).unwrap();
//! let f = cdd.apply_reduce(cdd_rs::cdd::Op::Or, a, b);
//!
//! let zones: Vec<_> = cdd.zones(f).collect();
//! assert_eq!(zones.len(), 2);
//! assert_eq!(cdd.path_count(f), 2u32.into());
//! ```
//!
//! Note: the number of zones can be exponential in the size of the diagram.

use std::collections::HashMap;

use num_bigint::BigUint;

use crate::bound::Bound;
use crate::cdd::Cdd;
use crate::dbm::Dbm;
use crate::node::Elem;
use crate::reference::Ref;

impl Cdd {
    /// Returns an iterator over the zones of `f`, as closed matrices over
    /// all clocks.
    pub fn zones(&self, f: Ref) -> Zones<'_> {
        Zones::new(self, f)
    }

    /// Number of root-to-one paths, feasible or not.
    pub fn path_count(&self, f: Ref) -> BigUint {
        let mut cache = HashMap::new();
        self.path_count_rec(f, &mut cache).0
    }

    /// Paths of `f` to one and to zero.
    fn path_count_rec(&self, f: Ref, cache: &mut HashMap<Ref, (BigUint, BigUint)>) -> (BigUint, BigUint) {
        if self.is_one(f) {
            return (BigUint::from(1u32), BigUint::ZERO);
        }
        if self.is_zero(f) {
            return (BigUint::ZERO, BigUint::from(1u32));
        }
        if f.is_negated() {
            let (to_one, to_zero) = self.path_count_rec(-f, cache);
            return (to_zero, to_one);
        }
        if let Some(res) = cache.get(&f) {
            return res.clone();
        }

        let mut res = (BigUint::ZERO, BigUint::ZERO);
        for e in self.elems(f) {
            let (to_one, to_zero) = self.path_count_rec(e.child, cache);
            res.0 += to_one;
            res.1 += to_zero;
        }
        cache.insert(f, res.clone());
        res
    }
}

/// Frame on the exploration stack.
#[derive(Debug)]
struct StackFrame {
    node: Ref,
    /// Constraints collected above this node.
    ctx: Dbm,
    elems: Vec<Elem>,
    /// Next edge to explore.
    next: usize,
}

/// Iterator over the zones of a diagram.
///
/// Created by [`Cdd::zones()`]. Depth-first, pruning every edge that is
/// infeasible under the constraints collected so far.
pub struct Zones<'a> {
    cdd: &'a Cdd,
    stack: Vec<StackFrame>,
    /// Set when the root itself is a terminal.
    pending: Option<Dbm>,
}

impl<'a> Zones<'a> {
    pub fn new(cdd: &'a Cdd, f: Ref) -> Self {
        let ctx = cdd.universe();
        let mut zones = Zones {
            cdd,
            stack: Vec::new(),
            pending: None,
        };
        if cdd.is_one(f) {
            zones.pending = Some(ctx);
        } else if !cdd.is_zero(f) {
            zones.push(f, ctx);
        }
        zones
    }

    fn push(&mut self, node: Ref, ctx: Dbm) {
        let elems = self.cdd.elems(node);
        self.stack.push(StackFrame {
            node,
            ctx,
            elems,
            next: 0,
        });
    }
}

impl Iterator for Zones<'_> {
    type Item = Dbm;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(dbm) = self.pending.take() {
            return Some(dbm);
        }

        loop {
            let frame = self.stack.last_mut()?;
            if frame.next == frame.elems.len() {
                self.stack.pop();
                continue;
            }

            let k = frame.next;
            frame.next += 1;

            let e = frame.elems[k];
            if self.cdd.is_zero(e.child) {
                continue;
            }

            let pair = self.cdd.pair(frame.node);
            let (i, j) = (pair.i(), pair.j());
            let lower: Option<Bound> = k.checked_sub(1).map(|p| frame.elems[p].bound);
            if !frame.ctx.admits(i, j, lower, e.bound) {
                continue;
            }

            let sub = frame.ctx.restricted(i, j, lower, e.bound);
            if self.cdd.is_one(e.child) {
                return Some(sub);
            }
            self.push(e.child, sub);
        }
    }
}
