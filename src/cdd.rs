//! The CDD manager.
//!
//! A [`Cdd`] owns the node table and the operation cache. Diagrams are plain
//! [`Ref`] handles into the manager; they stay valid until the manager is
//! dropped (or until a [`Cdd::collect_garbage`] that does not list them as
//! roots).
//!
//! # Examples
//!
//! ```
//! use cdd_rs::cdd::Cdd;
//!
//! let cdd = Cdd::default();
//! cdd.add_clocks(3);
//!
//! // 1 <= x1 < 5 and x2 - x1 >= 0
//! let a = cdd.interval(1, 0, 1, 5).unwrap();
//! let b = cdd.lower_bound(2, 1, 0).unwrap();
//! let f = cdd.apply_and(a, b);
//!
//! assert!(!cdd.is_zero(cdd.reduce(f)));
//! assert!(cdd.is_zero(cdd.reduce(cdd.apply_and(f, -a))));
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::fmt::{Debug, Display, Formatter};

use log::{debug, info};

use crate::bound::Bound;
use crate::cache::Cache;
use crate::dbm::Dbm;
use crate::error::{CddError, Result};
use crate::node::{Elem, Node};
use crate::reference::Ref;
use crate::table::Table;
use crate::types::{ClockPair, TERMINAL_LEVEL};
use crate::utils::{pairing2, pairing3, MyHash};

/// Boolean connective for [`Cdd::apply`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Op {
    And,
    Or,
    Xor,
}

impl Op {
    fn tag(self) -> u64 {
        match self {
            Op::And => 0,
            Op::Or => 1,
            Op::Xor => 2,
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

/// Key of the operation cache.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OpKey {
    Apply(Op, Ref, Ref),
    ApplyReduce(Op, Ref, Ref),
    Reduce(Ref),
}

impl Default for OpKey {
    fn default() -> Self {
        OpKey::Reduce(Ref::default())
    }
}

impl MyHash for OpKey {
    fn hash(&self) -> u64 {
        let raw = |r: &Ref| r.get() as u32 as u64;
        match self {
            OpKey::Apply(op, f, g) => (pairing2(0, op.tag()), raw(f), raw(g)).hash(),
            OpKey::ApplyReduce(op, f, g) => (pairing2(1, op.tag()), raw(f), raw(g)).hash(),
            OpKey::Reduce(f) => (pairing3(2, 0, 0), raw(f)).hash(),
        }
    }
}

/// Sizing of a [`Cdd`] manager.
///
/// ```
/// use cdd_rs::cdd::CddConfig;
///
/// let config = CddConfig::default()
///     .with_node_capacity(100_000)
///     .with_cache_capacity(10_000)
///     .with_cache_ratio(4);
/// assert_eq!(config.effective_cache_capacity(), 25_000);
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CddConfig {
    /// Maximum number of decision nodes alive at once.
    pub node_capacity: usize,
    /// Minimum number of operation-cache entries.
    pub cache_capacity: usize,
    /// When non-zero, the cache holds at least `node_capacity / cache_ratio`
    /// entries.
    pub cache_ratio: usize,
}

impl Default for CddConfig {
    fn default() -> Self {
        Self {
            node_capacity: 1 << 20,
            cache_capacity: 1 << 16,
            cache_ratio: 0,
        }
    }
}

impl CddConfig {
    pub fn with_node_capacity(mut self, node_capacity: usize) -> Self {
        self.node_capacity = node_capacity;
        self
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn with_cache_ratio(mut self, cache_ratio: usize) -> Self {
        self.cache_ratio = cache_ratio;
        self
    }

    pub fn effective_cache_capacity(&self) -> usize {
        if self.cache_ratio > 0 {
            self.cache_capacity.max(self.node_capacity / self.cache_ratio)
        } else {
            self.cache_capacity
        }
    }
}

type Storage = Table<Node>;

pub struct Cdd {
    storage: RefCell<Storage>,
    cache: RefCell<Cache<OpKey, Ref>>,
    clocks: Cell<usize>,
    config: CddConfig,
    pub(crate) one: Ref,
    pub(crate) zero: Ref,
}

impl Cdd {
    /// Creates a manager with no clocks.
    ///
    /// # Panics
    ///
    /// Panics if `config.node_capacity` is zero or does not fit into a [`Ref`].
    pub fn new(config: CddConfig) -> Self {
        info!(
            "Creating CDD manager: node_capacity = {}, cache_capacity = {}",
            config.node_capacity,
            config.effective_cache_capacity()
        );

        // One extra slot for the terminal node.
        let mut storage = Storage::new(config.node_capacity.saturating_add(1));

        let one = storage.alloc();
        assert_eq!(one, 1); // Make sure the terminal node is (1).
        let one = Ref::positive(one as u32);
        let zero = -one;

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::with_capacity(config.effective_cache_capacity())),
            clocks: Cell::new(0),
            config,
            one,
            zero,
        }
    }

    /// Adds `n` clocks to the active dimension.
    ///
    /// The reference clock counts, so the first call usually passes the
    /// number of real clocks plus one. Cached results assume a fixed
    /// dimension and are dropped.
    pub fn add_clocks(&self, n: usize) {
        let clocks = self.clocks.get() + n;
        assert!(
            clocks <= u16::MAX as usize,
            "Too many clocks: {} (max {})",
            clocks,
            u16::MAX
        );
        info!("add_clocks(n = {}): {} -> {}", n, self.clocks.get(), clocks);
        self.clocks.set(clocks);
        self.cache.borrow_mut().clear();
    }

    /// Number of clocks, including the reference clock.
    pub fn clocks(&self) -> usize {
        self.clocks.get()
    }

    pub fn config(&self) -> &CddConfig {
        &self.config
    }

    /// Tears the manager down, logging its final statistics.
    ///
    /// Every handle obtained from this manager becomes meaningless.
    pub fn done(self) {
        let storage = self.storage.borrow();
        let cache = self.cache.borrow();
        info!(
            "CDD manager done: clocks = {}, nodes = {} (peak {}), cache hits = {}, misses = {}, faults = {}",
            self.clocks.get(),
            storage.real_size(),
            storage.size(),
            cache.hits(),
            cache.misses(),
            cache.faults()
        );
    }
}

impl Default for Cdd {
    fn default() -> Self {
        Cdd::new(CddConfig::default())
    }
}

impl Debug for Cdd {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Cdd")
            .field("clocks", &self.clocks.get())
            .field("capacity", &storage.capacity())
            .field("size", &storage.size())
            .field("real_size", &storage.real_size())
            .finish()
    }
}

/// Rejects constants that do not fit the bound encoding.
fn check_value(value: i32) -> Result<i32> {
    if Bound::is_representable(value) {
        Ok(value)
    } else {
        Err(CddError::ValueOutOfRange {
            value,
            max: Bound::MAX_VALUE,
        })
    }
}

impl Cdd {
    pub fn cache(&self) -> std::cell::Ref<'_, Cache<OpKey, Ref>> {
        self.cache.borrow()
    }

    pub(crate) fn cache_get(&self, key: &OpKey) -> Option<Ref> {
        self.cache.borrow().get(key)
    }

    pub(crate) fn cache_insert(&self, key: OpKey, value: Ref) {
        self.cache.borrow_mut().insert(key, value);
    }

    /// Number of live decision nodes.
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().real_size() - 1
    }

    /// The universal federation.
    pub fn one(&self) -> Ref {
        self.one
    }

    /// The empty federation.
    pub fn zero(&self) -> Ref {
        self.zero
    }

    pub fn is_zero(&self, f: Ref) -> bool {
        f == self.zero
    }
    pub fn is_one(&self, f: Ref) -> bool {
        f == self.one
    }
    pub fn is_terminal(&self, f: Ref) -> bool {
        f.index() == self.one.index()
    }

    /// Decision level of the node, [`TERMINAL_LEVEL`] for terminals.
    pub fn level(&self, f: Ref) -> u32 {
        self.storage.borrow().value(f.index()).level
    }

    /// Clock pair tested by a decision node.
    pub fn pair(&self, f: Ref) -> ClockPair {
        assert!(!self.is_terminal(f), "Terminal node has no clock pair");
        ClockPair::from_level(self.level(f))
    }

    /// Outgoing edges of a decision node with the complement of `f` pushed
    /// down to the children.
    pub fn elems(&self, f: Ref) -> Vec<Elem> {
        let storage = self.storage.borrow();
        let node = storage.value(f.index());
        node.elems
            .iter()
            .map(|e| Elem::new(f.apply_sign(e.child), e.bound))
            .collect()
    }

    /// Interval list of `f` as seen from a node on `level`: the edges of `f`
    /// if it tests that level, otherwise a single unconstrained edge to `f`.
    pub(crate) fn cofactors(&self, f: Ref, level: u32) -> Vec<Elem> {
        if self.level(f) == level {
            self.elems(f)
        } else {
            debug_assert!(self.level(f) > level);
            vec![Elem::new(f, Bound::INFINITY)]
        }
    }

    /// Hash-conses a node with the given edges, as is.
    ///
    /// The complement flag is normalized so that the last child of a stored
    /// node is never negated.
    pub(crate) fn put_node(&self, level: u32, elems: Vec<Elem>) -> Ref {
        debug_assert_ne!(level, TERMINAL_LEVEL);
        debug_assert!(elems.len() >= 2, "Decision node needs at least two edges");
        debug_assert!(elems.windows(2).all(|w| w[0].bound < w[1].bound));
        debug_assert!(elems.last().is_some_and(|e| e.bound.is_infinity()));

        // Handle canonicity
        if elems.last().is_some_and(|e| e.child.is_negated()) {
            let elems = elems.into_iter().map(|e| Elem::new(-e.child, e.bound)).collect();
            return -self.put_node(level, elems);
        }

        let i = self.storage.borrow_mut().put(Node { level, elems });
        Ref::positive(i as u32)
    }

    /// Builds a node after merging neighbouring edges that lead to the same
    /// child; a node left with a single edge is replaced by its child.
    pub(crate) fn mk_node(&self, level: u32, elems: Vec<Elem>) -> Ref {
        let mut merged: Vec<Elem> = Vec::with_capacity(elems.len());
        for e in elems {
            match merged.last_mut() {
                Some(last) if last.child == e.child => last.bound = e.bound,
                _ => merged.push(e),
            }
        }

        match merged.as_slice() {
            [] => panic!("Decision node without edges"),
            [single] => {
                debug_assert!(single.bound.is_infinity());
                single.child
            }
            _ => self.put_node(level, merged),
        }
    }

    fn check_clock(&self, clock: usize) -> Result<()> {
        let clocks = self.clocks.get();
        if clock >= clocks {
            return Err(CddError::ClockOutOfRange { clock, clocks });
        }
        Ok(())
    }

    /// Single-node diagram for `x_i - x_j ≺ upper_ij` and `x_j - x_i ≺ upper_ji`.
    fn range(&self, i: usize, j: usize, upper_ij: Bound, upper_ji: Bound) -> Result<Ref> {
        self.check_clock(i)?;
        self.check_clock(j)?;
        if i == j {
            return Err(CddError::SameClock(i));
        }

        let (i, j, upper, lower) = if i > j {
            (i, j, upper_ij, upper_ji)
        } else {
            (j, i, upper_ji, upper_ij)
        };

        if !upper.is_infinity() && !lower.is_infinity() && upper.add(lower) < Bound::ZERO {
            debug!("range: x{} - x{} has an empty range", i, j);
            return Ok(self.zero);
        }

        let level = ClockPair::new(i as u32, j as u32).level();
        let mut elems = Vec::with_capacity(3);
        if !lower.is_infinity() {
            elems.push(Elem::new(self.zero, lower.complement()));
        }
        elems.push(Elem::new(self.one, upper));
        if !upper.is_infinity() {
            elems.push(Elem::new(self.zero, Bound::INFINITY));
        }
        Ok(self.mk_node(level, elems))
    }

    /// `low <= x_i - x_j < up`.
    pub fn interval(&self, i: usize, j: usize, low: i32, up: i32) -> Result<Ref> {
        debug!("interval(i = {}, j = {}, low = {}, up = {})", i, j, low, up);
        let (low, up) = (check_value(low)?, check_value(up)?);
        self.range(i, j, Bound::lt(up), Bound::le(-low))
    }

    /// `x_i - x_j >= low`.
    pub fn lower_bound(&self, i: usize, j: usize, low: i32) -> Result<Ref> {
        debug!("lower_bound(i = {}, j = {}, low = {})", i, j, low);
        let low = check_value(low)?;
        self.range(i, j, Bound::INFINITY, Bound::le(-low))
    }

    /// `x_i - x_j < up`.
    pub fn upper_bound(&self, i: usize, j: usize, up: i32) -> Result<Ref> {
        debug!("upper_bound(i = {}, j = {}, up = {})", i, j, up);
        let up = check_value(up)?;
        self.range(i, j, Bound::lt(up), Bound::INFINITY)
    }

    /// `x_i - x_j ≺ bound` for an arbitrary bound.
    pub fn constraint(&self, i: usize, j: usize, bound: Bound) -> Result<Ref> {
        debug!("constraint(i = {}, j = {}, bound = {})", i, j, bound);
        self.range(i, j, bound, Bound::INFINITY)
    }

    /// Builds the reduced diagram of the zone described by `dbm`.
    ///
    /// The matrix may cover fewer clocks than the manager; the remaining
    /// clocks are left unconstrained. An empty zone gives [`Cdd::zero`].
    pub fn from_dbm(&self, dbm: &Dbm) -> Result<Ref> {
        debug!("from_dbm(dim = {})", dbm.dim());

        let dim = dbm.dim();
        if dim > self.clocks.get().max(1) {
            return Err(CddError::DimensionMismatch {
                expected: self.clocks.get(),
                found: dim,
            });
        }

        let mut m = dbm.clone();
        if !m.close() {
            debug!("from_dbm: empty zone");
            return Ok(self.zero);
        }

        // Top-down: keep only the cuts not implied by the ones above.
        let mut implied = Dbm::new(dim);
        let mut cuts = Vec::new();
        for i in 1..dim {
            for j in 0..i {
                let upper = m.get(i, j);
                let lower = m.get(j, i);
                let need_lower = !lower.is_infinity() && implied.get(j, i) != lower;
                let need_upper = !upper.is_infinity() && implied.get(i, j) != upper;
                if need_lower || need_upper {
                    let level = ClockPair::new(i as u32, j as u32).level();
                    cuts.push((level, need_lower.then_some(lower), need_upper.then_some(upper)));
                    implied.constrain(i, j, upper);
                    implied.constrain(j, i, lower);
                }
            }
        }

        // Bottom-up construction along the single path to one.
        let mut current = self.one;
        for &(level, lower, upper) in cuts.iter().rev() {
            let mut elems = Vec::with_capacity(3);
            if let Some(lower) = lower {
                elems.push(Elem::new(self.zero, lower.complement()));
            }
            match upper {
                Some(upper) => {
                    elems.push(Elem::new(current, upper));
                    elems.push(Elem::new(self.zero, Bound::INFINITY));
                }
                None => elems.push(Elem::new(current, Bound::INFINITY)),
            }
            current = self.mk_node(level, elems);
        }

        debug!("from_dbm -> {} ({} cuts)", current, cuts.len());
        Ok(current)
    }
}

impl Cdd {
    /// Complement of the federation. Constant time.
    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    /// Results that need no recursion.
    pub(crate) fn terminal_case(&self, op: Op, f: Ref, g: Ref) -> Option<Ref> {
        match op {
            Op::And => {
                if self.is_zero(f) || self.is_zero(g) || f == -g {
                    return Some(self.zero);
                }
                if self.is_one(f) || f == g {
                    return Some(g);
                }
                if self.is_one(g) {
                    return Some(f);
                }
            }
            Op::Or => {
                if self.is_one(f) || self.is_one(g) || f == -g {
                    return Some(self.one);
                }
                if self.is_zero(f) || f == g {
                    return Some(g);
                }
                if self.is_zero(g) {
                    return Some(f);
                }
            }
            Op::Xor => {
                if f == g {
                    return Some(self.zero);
                }
                if f == -g {
                    return Some(self.one);
                }
                if self.is_zero(f) {
                    return Some(g);
                }
                if self.is_zero(g) {
                    return Some(f);
                }
                if self.is_one(f) {
                    return Some(-g);
                }
                if self.is_one(g) {
                    return Some(-f);
                }
            }
        }
        None
    }

    /// Common refinement of the cut lists of `f` and `g` on their top level,
    /// as `(upper, f_child, g_child)` pieces.
    pub(crate) fn refine(&self, f: Ref, g: Ref) -> (u32, Vec<(Bound, Ref, Ref)>) {
        let level = self.level(f).min(self.level(g));
        debug_assert_ne!(level, TERMINAL_LEVEL);

        let fs = self.cofactors(f, level);
        let gs = self.cofactors(g, level);

        let mut pieces = Vec::with_capacity(fs.len() + gs.len());
        let (mut a, mut b) = (0, 0);
        loop {
            let (fe, ge) = (fs[a], gs[b]);
            let upper = fe.bound.min(ge.bound);
            pieces.push((upper, fe.child, ge.child));
            if upper.is_infinity() {
                break;
            }
            if fe.bound == upper {
                a += 1;
            }
            if ge.bound == upper {
                b += 1;
            }
        }
        (level, pieces)
    }

    /// Combines two diagrams.
    ///
    /// Both operands are split on the union of their cut points, then
    /// neighbouring edges with the same result are merged and decisions left
    /// with a single edge disappear. Infeasible paths are kept; use
    /// [`Cdd::apply_reduce`] to get a reduced diagram directly.
    pub fn apply(&self, op: Op, f: Ref, g: Ref) -> Ref {
        debug!("apply(op = {}, f = {}, g = {})", op, f, g);

        if let Some(res) = self.terminal_case(op, f, g) {
            debug!("apply: terminal case -> {}", res);
            return res;
        }

        let (f, g) = if f <= g { (f, g) } else { (g, f) };
        let key = OpKey::Apply(op, f, g);
        if let Some(res) = self.cache_get(&key) {
            debug!("cache: apply(op = {}, f = {}, g = {}) -> {}", op, f, g, res);
            return res;
        }

        let (level, pieces) = self.refine(f, g);
        let elems = pieces
            .into_iter()
            .map(|(upper, fc, gc)| Elem::new(self.apply(op, fc, gc), upper))
            .collect();
        let res = self.mk_node(level, elems);

        debug!("computed: apply(op = {}, f = {}, g = {}) -> {}", op, f, g, res);
        self.cache_insert(key, res);
        res
    }

    pub fn apply_and(&self, f: Ref, g: Ref) -> Ref {
        self.apply(Op::And, f, g)
    }

    pub fn apply_or(&self, f: Ref, g: Ref) -> Ref {
        self.apply(Op::Or, f, g)
    }

    pub fn apply_xor(&self, f: Ref, g: Ref) -> Ref {
        self.apply(Op::Xor, f, g)
    }

    /// `f and not g`.
    pub fn apply_diff(&self, f: Ref, g: Ref) -> Ref {
        self.apply(Op::And, f, -g)
    }
}

impl Cdd {
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<usize> {
        let mut visited = HashSet::new();
        visited.insert(self.one.index());
        let mut queue = VecDeque::from_iter(nodes);

        while let Some(node) = queue.pop_front() {
            let i = node.index();
            if visited.insert(i) {
                let storage = self.storage.borrow();
                queue.extend(storage.value(i).elems.iter().map(|e| e.child));
            }
        }

        visited
    }

    /// Number of nodes reachable from `f`, the terminal included.
    pub fn size(&self, f: Ref) -> usize {
        self.descendants([f]).len()
    }

    /// Drops every node not reachable from `roots` and clears the cache.
    ///
    /// Handles to dropped nodes must not be used afterwards.
    pub fn collect_garbage(&self, roots: &[Ref]) -> usize {
        info!("Collecting garbage from {} roots...", roots.len());

        self.cache.borrow_mut().clear();

        let alive = self.descendants(roots.iter().copied());
        let dropped = self.storage.borrow_mut().retain(|i| alive.contains(&i));

        info!("Dropped {} nodes, {} alive", dropped, self.num_nodes());
        dropped
    }

    pub fn to_bracket_string(&self, f: Ref) -> String {
        if self.is_zero(f) {
            return "(0)".to_string();
        } else if self.is_one(f) {
            return "(1)".to_string();
        }

        let pair = self.pair(f);
        let edges = self
            .elems(f)
            .into_iter()
            .map(|e| format!("{}: {}", e.bound, self.to_bracket_string(e.child)))
            .collect::<Vec<_>>();

        format!("{}:({}, [{}])", f, pair, edges.join(", "))
    }
}
