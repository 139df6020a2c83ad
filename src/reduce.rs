//! Reduction of diagrams.
//!
//! A node is reduced together with the closed matrix of the constraints
//! collected on the way down from the root (the *context*). Edges whose
//! interval does not intersect the context are absorbed by their feasible
//! neighbour, edges leading to the same reduced child are merged, and nodes
//! left with a single edge disappear. Since the context is convex, the
//! feasible edges of a node always form one contiguous run.
//!
//! [`Cdd::apply_reduce`] runs the same procedure interleaved with the
//! product construction of [`Cdd::apply`]. Both roads describe the same
//! federation, and they end in the same node unless `apply` merged two
//! feasible edges leading to the same decision node:
//!
//! ```
//! use cdd_rs::cdd::{Cdd, Op};
//!
//! let cdd = Cdd::default();
//! cdd.add_clocks(3);
//! let f = cdd.interval(1, 0, 0, 4).unwrap();
//! let g = cdd.interval(2, 1, -1, 1).unwrap();
//!
//! let slow = cdd.reduce(cdd.apply(Op::Or, f, g));
//! let fast = cdd.apply_reduce(Op::Or, f, g);
//! assert_eq!(slow, fast);
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;

use crate::bound::Bound;
use crate::cdd::{Cdd, Op, OpKey};
use crate::dbm::Dbm;
use crate::node::Elem;
use crate::reference::Ref;
use crate::types::ClockPair;

type ReduceMemo = HashMap<(Ref, Dbm), Ref>;
type ApplyMemo = HashMap<(Ref, Ref, Dbm), Ref>;

impl Cdd {
    /// The unconstrained context over all clocks.
    pub(crate) fn universe(&self) -> Dbm {
        Dbm::new(self.clocks().max(1))
    }

    /// Rebuilds a node on `level` from `(upper, item)` pieces that partition
    /// the line, keeping only the pieces feasible under `ctx`.
    ///
    /// `child` turns an item into the reduced child for the restricted
    /// context of its piece.
    fn reduce_pieces<T>(
        &self,
        level: u32,
        ctx: &Dbm,
        pieces: impl IntoIterator<Item = (Bound, T)>,
        mut child: impl FnMut(T, &Dbm) -> Ref,
    ) -> Ref {
        let pair = ClockPair::from_level(level);
        let (i, j) = (pair.i(), pair.j());

        let mut elems: Vec<Elem> = Vec::new();
        let mut lower = None;
        for (upper, item) in pieces {
            if ctx.admits(i, j, lower, upper) {
                let sub = ctx.restricted(i, j, lower, upper);
                elems.push(Elem::new(child(item, &sub), upper));
            } else if !elems.is_empty() {
                // Past the feasible run.
                break;
            }
            lower = Some(upper);
        }

        let Some(last) = elems.last_mut() else {
            panic!("Context admits no interval of {}", pair);
        };
        last.bound = Bound::INFINITY;

        self.mk_node(level, elems)
    }

    /// Reduced form of `f`: same federation, no infeasible paths.
    ///
    /// The result is a fixed point (`reduce(reduce(f)) == reduce(f)`), it is
    /// [`Cdd::zero`] exactly when the federation is empty, and every path
    /// from its root to [`Cdd::one`] describes a non-empty zone.
    ///
    /// Reduced diagrams are not unique: two diagrams of the same federation
    /// may reduce to different nodes when their decisions split the zones
    /// differently. Compare federations with [`Cdd::is_equivalent`].
    pub fn reduce(&self, f: Ref) -> Ref {
        debug!("reduce(f = {})", f);

        if self.is_terminal(f) {
            return f;
        }

        let key = OpKey::Reduce(f);
        if let Some(res) = self.cache_get(&key) {
            debug!("cache: reduce({}) -> {}", f, res);
            return res;
        }

        let mut memo = ReduceMemo::new();
        let res = self.reduce_rec(f, &self.universe(), &mut memo);

        debug!("computed: reduce({}) -> {} ({} visits)", f, res, memo.len());
        self.cache_insert(key, res);
        res
    }

    pub(crate) fn reduce_rec(&self, f: Ref, ctx: &Dbm, memo: &mut ReduceMemo) -> Ref {
        if self.is_terminal(f) {
            return f;
        }
        if f.is_negated() {
            return -self.reduce_rec(-f, ctx, memo);
        }

        let key = (f, ctx.clone());
        if let Some(&res) = memo.get(&key) {
            return res;
        }

        let level = self.level(f);
        let pieces = self.elems(f).into_iter().map(|e| (e.bound, e.child));
        let res = self.reduce_pieces(level, ctx, pieces, |child, sub| {
            self.reduce_rec(child, sub, memo)
        });

        memo.insert(key, res);
        res
    }

    /// Level-by-level variant of [`Cdd::reduce`].
    ///
    /// A breadth-first pass from the root collects every (node, context)
    /// pair that a reduction visits, one level at a time; the pairs are then
    /// rebuilt from the deepest level up. Nothing is memoized across calls,
    /// and the result is the same node as [`Cdd::reduce`] returns.
    pub fn bf_reduce(&self, f: Ref) -> Ref {
        debug!("bf_reduce(f = {})", f);

        if self.is_terminal(f) {
            return f;
        }

        let root = (f.regular(), self.universe());
        let mut seen = HashSet::from([root.clone()]);
        let mut pending = BTreeMap::from([(self.level(f), vec![root.clone()])]);
        let mut layers = Vec::new();

        while let Some((level, states)) = pending.pop_first() {
            let pair = ClockPair::from_level(level);
            let (i, j) = (pair.i(), pair.j());
            for (node, ctx) in states.iter() {
                let mut lower = None;
                for e in self.elems(*node) {
                    if !self.is_terminal(e.child) && ctx.admits(i, j, lower, e.bound) {
                        let state = (e.child.regular(), ctx.restricted(i, j, lower, e.bound));
                        if seen.insert(state.clone()) {
                            pending.entry(self.level(state.0)).or_default().push(state);
                        }
                    }
                    lower = Some(e.bound);
                }
            }
            layers.push((level, states));
        }

        let mut reduced = ReduceMemo::with_capacity(seen.len());
        for (level, states) in layers.into_iter().rev() {
            for (node, ctx) in states {
                let pieces = self.elems(node).into_iter().map(|e| (e.bound, e.child));
                let res = self.reduce_pieces(level, &ctx, pieces, |child, sub| {
                    if self.is_terminal(child) {
                        return child;
                    }
                    let res = reduced[&(child.regular(), sub.clone())];
                    if child.is_negated() {
                        -res
                    } else {
                        res
                    }
                });
                reduced.insert((node, ctx), res);
            }
        }

        let res = reduced[&root];
        debug!("computed: bf_reduce({}) -> {} ({} states)", f, res, seen.len());
        if f.is_negated() {
            -res
        } else {
            res
        }
    }

    /// Combines two diagrams and reduces on the fly.
    ///
    /// Describes the same federation as `reduce(apply(op, f, g))` without
    /// building the product first, and is already reduced.
    pub fn apply_reduce(&self, op: Op, f: Ref, g: Ref) -> Ref {
        debug!("apply_reduce(op = {}, f = {}, g = {})", op, f, g);

        if let Some(res) = self.terminal_case(op, f, g) {
            debug!("apply_reduce: terminal case -> {}", res);
            return self.reduce(res);
        }

        let (f, g) = if f <= g { (f, g) } else { (g, f) };
        let key = OpKey::ApplyReduce(op, f, g);
        if let Some(res) = self.cache_get(&key) {
            debug!("cache: apply_reduce(op = {}, f = {}, g = {}) -> {}", op, f, g, res);
            return res;
        }

        let mut memo = ApplyMemo::new();
        let mut reduce_memo = ReduceMemo::new();
        let res = self.apply_reduce_rec(op, f, g, &self.universe(), &mut memo, &mut reduce_memo);

        debug!(
            "computed: apply_reduce(op = {}, f = {}, g = {}) -> {}",
            op, f, g, res
        );
        self.cache_insert(key, res);
        res
    }

    fn apply_reduce_rec(
        &self,
        op: Op,
        f: Ref,
        g: Ref,
        ctx: &Dbm,
        memo: &mut ApplyMemo,
        reduce_memo: &mut ReduceMemo,
    ) -> Ref {
        if let Some(res) = self.terminal_case(op, f, g) {
            return self.reduce_rec(res, ctx, reduce_memo);
        }

        let (f, g) = if f <= g { (f, g) } else { (g, f) };
        let key = (f, g, ctx.clone());
        if let Some(&res) = memo.get(&key) {
            return res;
        }

        let (level, pieces) = self.refine(f, g);
        let pieces = pieces.into_iter().map(|(upper, fc, gc)| (upper, (fc, gc)));
        let res = self.reduce_pieces(level, ctx, pieces, |(fc, gc), sub| {
            self.apply_reduce_rec(op, fc, gc, sub, memo, reduce_memo)
        });

        memo.insert(key, res);
        res
    }

    /// Checks whether two diagrams describe the same federation.
    pub fn is_equivalent(&self, f: Ref, g: Ref) -> bool {
        self.is_zero(self.apply_reduce(Op::Xor, f, g))
    }

    /// Checks whether the federation of `f` is empty.
    pub fn is_empty(&self, f: Ref) -> bool {
        self.is_zero(self.reduce(f))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::cdd::CddConfig;

    fn manager(clocks: usize) -> Cdd {
        let cdd = Cdd::new(CddConfig::default().with_node_capacity(1 << 14));
        cdd.add_clocks(clocks);
        cdd
    }

    #[test]
    fn test_reduce_terminals() {
        let cdd = manager(2);
        assert_eq!(cdd.reduce(cdd.one()), cdd.one());
        assert_eq!(cdd.reduce(cdd.zero()), cdd.zero());
    }

    #[test]
    fn test_reduce_merges_pieces_equal_in_context() {
        let cdd = manager(3);
        // 5 <= x1 < 10 and 0 <= x2 < 1, so x2 - x1 < -4 throughout.
        let boxed = cdd.apply_and(cdd.interval(1, 0, 5, 10).unwrap(), cdd.interval(2, 0, 0, 1).unwrap());
        assert_eq!(cdd.reduce(boxed), boxed);

        // Different diagonal cuts below and above x1 = 7, both implied.
        let low = cdd.apply_and(cdd.upper_bound(1, 0, 7).unwrap(), cdd.upper_bound(2, 1, 3).unwrap());
        let high = cdd.apply_and(cdd.lower_bound(1, 0, 7).unwrap(), cdd.upper_bound(2, 1, 4).unwrap());
        let h = cdd.apply_and(boxed, cdd.apply_or(low, high));
        assert_eq!(cdd.elems(h).len(), 4);
        assert_ne!(h, boxed);
        assert_eq!(cdd.reduce(h), boxed);
        assert_eq!(cdd.bf_reduce(h), boxed);

        let f = cdd.interval(1, 0, 0, 5).unwrap();
        let u = cdd.apply_or(f, cdd.interval(1, 0, 5, 8).unwrap());
        assert_eq!(u, cdd.interval(1, 0, 0, 8).unwrap());
        assert_eq!(cdd.reduce(u), u);
    }

    #[test]
    fn test_reduce_detects_infeasible_paths() {
        let cdd = manager(3);
        // x1 < 2, x2 >= 5 and x2 - x1 < 1 cannot hold together.
        let a = cdd.interval(1, 0, 0, 2).unwrap();
        let b = cdd.lower_bound(2, 0, 5).unwrap();
        let c = cdd.upper_bound(2, 1, 1).unwrap();
        let f = cdd.apply_and(cdd.apply_and(a, b), c);
        assert!(!cdd.is_zero(f));
        assert_eq!(cdd.reduce(f), cdd.zero());
        assert!(cdd.is_empty(f));
    }

    #[test]
    fn test_reduce_drops_implied_cuts() {
        let cdd = manager(3);
        let a = cdd.interval(1, 0, 0, 2).unwrap();
        let b = cdd.interval(2, 0, 0, 2).unwrap();
        let ab = cdd.apply_and(a, b);
        // Implied by the two intervals above.
        let c = cdd.upper_bound(2, 1, 5).unwrap();
        let abc = cdd.apply_and(ab, c);
        assert_ne!(abc, ab);
        assert_eq!(cdd.reduce(abc), cdd.reduce(ab));
    }

    #[test]
    fn test_reduce_is_idempotent() {
        let cdd = manager(3);
        let parts = [
            cdd.interval(1, 0, 0, 4).unwrap(),
            cdd.interval(2, 1, -2, 3).unwrap(),
            cdd.lower_bound(2, 0, 7).unwrap(),
            -cdd.interval(1, 0, 2, 3).unwrap(),
        ];
        let mut f = cdd.zero();
        for (k, &p) in parts.iter().enumerate() {
            f = if k % 2 == 0 {
                cdd.apply_or(f, p)
            } else {
                cdd.apply_xor(f, p)
            };
            let r = cdd.reduce(f);
            assert_eq!(cdd.reduce(r), r);
            assert_eq!(cdd.reduce(-r), -r);
            assert!(cdd.is_equivalent(f, r));
        }
    }

    #[test]
    fn test_apply_reduce_matches_reduce_of_apply_on_terminal_merges() {
        let cdd = manager(3);
        let fs = [
            cdd.interval(1, 0, 0, 4).unwrap(),
            cdd.interval(2, 0, 1, 6).unwrap(),
            cdd.upper_bound(2, 1, 0).unwrap(),
            cdd.lower_bound(1, 0, 3).unwrap(),
        ];
        let f = cdd.apply_or(fs[0], fs[1]);
        let g = cdd.apply_and(fs[2], -fs[3]);
        for op in [Op::And, Op::Or, Op::Xor] {
            for (a, b) in [(f, g), (g, f), (f, -g), (-f, fs[3])] {
                // Every edge merged by `apply` here leads to a terminal.
                let slow = cdd.reduce(cdd.apply(op, a, b));
                let fast = cdd.apply_reduce(op, a, b);
                assert_eq!(slow, fast, "{} on {} and {}", op, a, b);
                assert_eq!(cdd.reduce(fast), fast);
                assert_eq!(cdd.bf_reduce(cdd.apply(op, a, b)), slow);
            }
        }
    }

    #[test]
    fn test_equivalent_constructions() {
        let cdd = manager(3);
        let le = |i, j, c| cdd.constraint(i, j, Bound::le(c)).unwrap();
        let all = |fs: &[Ref]| fs.iter().fold(cdd.one(), |acc, &f| cdd.apply_and(acc, f));

        let x1_low = cdd.lower_bound(1, 0, 0).unwrap();
        let x2_low = cdd.lower_bound(2, 0, 0).unwrap();
        let diag = le(2, 1, 0);

        // {0 <= x1 <= 1, 0 <= x2 <= 1} or {1 < x1 <= 2, 0 <= x2 <= x1}
        let square = all(&[x1_low, le(1, 0, 1), x2_low, le(2, 0, 1)]);
        let right = all(&[-le(1, 0, 1), le(1, 0, 2)]);
        let a = cdd.apply_or(square, all(&[right, x2_low, le(2, 0, 2), diag]));

        // Same federation with the triangle cut again at x2 = 1.
        let split = cdd.apply_or(
            all(&[x2_low, le(2, 0, 1)]),
            all(&[-le(2, 0, 1), le(2, 0, 2), diag]),
        );
        let b = cdd.apply_or(square, all(&[right, split]));

        let (ra, rb) = (cdd.reduce(a), cdd.reduce(b));
        assert_eq!(cdd.reduce(ra), ra);
        assert_eq!(cdd.reduce(rb), rb);
        assert!(cdd.is_equivalent(a, b));
        assert!(cdd.is_equivalent(ra, rb));
        assert_eq!(cdd.reduce(cdd.apply_xor(ra, rb)), cdd.zero());
        for zone in cdd.zones(ra) {
            assert_eq!(cdd.contains(rb, &zone), Ok(true));
        }
        for zone in cdd.zones(rb) {
            assert_eq!(cdd.contains(ra, &zone), Ok(true));
        }
        assert!(!cdd.is_equivalent(a, square));
    }

    #[test]
    fn test_bf_reduce_matches_reduce() {
        let cdd = manager(3);
        assert_eq!(cdd.bf_reduce(cdd.one()), cdd.one());
        assert_eq!(cdd.bf_reduce(cdd.zero()), cdd.zero());

        let a = cdd.interval(1, 0, 0, 2).unwrap();
        let b = cdd.lower_bound(2, 0, 5).unwrap();
        let c = cdd.upper_bound(2, 1, 1).unwrap();
        let empty = cdd.apply_and(cdd.apply_and(a, b), c);
        assert_eq!(cdd.bf_reduce(empty), cdd.zero());

        let f = cdd.apply_or(empty, cdd.apply_and(cdd.interval(2, 1, -2, 3).unwrap(), -a));
        let g = cdd.apply_xor(f, cdd.lower_bound(1, 0, 7).unwrap());
        for h in [f, g, -g, cdd.apply_and(f, g)] {
            assert_eq!(cdd.bf_reduce(h), cdd.reduce(h));
        }
    }

    #[test]
    fn test_is_equivalent() {
        let cdd = manager(2);
        let f = cdd.interval(1, 0, 0, 4).unwrap();
        let low = cdd.lower_bound(1, 0, 0).unwrap();
        let high = cdd.upper_bound(1, 0, 4).unwrap();
        let g = cdd.apply_and(low, high);
        assert!(cdd.is_equivalent(f, g));
        assert!(!cdd.is_equivalent(f, low));
        // De Morgan.
        let lhs = -cdd.apply_or(low, high);
        let rhs = cdd.apply_and(-low, -high);
        assert!(cdd.is_equivalent(lhs, rhs));
        assert!(cdd.is_empty(rhs));
    }
}
