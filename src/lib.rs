//! # cdd-rs: Clock Difference Diagrams in Rust
//!
//! **`cdd-rs`** is a manager-centric library for **Clock Difference Diagrams (CDDs)**,
//! the decision-diagram representation of *federations*: finite unions of clock
//! zones, as used in the verification of timed automata.
//!
//! ## What is a CDD?
//!
//! A zone is a convex set of clock valuations described by bounds on clock
//! differences `x_i - x_j ≺ c` (a [`Dbm`][crate::dbm::Dbm]). Unions of zones are
//! not convex, and storing them as lists of matrices quickly gets out of hand.
//! A CDD stores them as a DAG instead: each decision node tests one clock
//! difference and branches on a partition of the real line into intervals.
//! Nodes are hash-consed and complemented edges make negation free.
//!
//! ## Key Features
//!
//! - **Manager-Centric Architecture**: All operations go through the [`Cdd`][crate::cdd::Cdd] manager,
//!   which owns the node table and the operation cache.
//! - **Lightweight handles**: diagrams are [`Ref`][crate::reference::Ref] values; the sign is the complement flag.
//! - **Reduction**: [`Cdd::reduce`][crate::cdd::Cdd::reduce] removes infeasible paths and redundant
//!   decisions; [`Cdd::apply_reduce`][crate::cdd::Cdd::apply_reduce] fuses it with the boolean operations.
//! - **Zones in and out**: build diagrams from matrices, check zone containment, extract zones back.
//!
//! ## Basic Usage
//!
//! ```rust
//! use cdd_rs::cdd::{Cdd, Op};
//! use cdd_rs::dbm::Dbm;
//! use cdd_rs::bound::Bound;
//!
//! // 1. Initialize the manager with the reference clock and two clocks
//! let cdd = Cdd::default();
//! cdd.add_clocks(3);
//!
//! // 2. A zone: 0 <= x1 <= 5, x2 - x1 < 2
//! let mut dbm = Dbm::init(3);
//! dbm.set(1, 0, Bound::le(5));
//! dbm.set(2, 1, Bound::lt(2));
//! dbm.close();
//! let zone = cdd.from_dbm(&dbm).unwrap();
//!
//! // 3. Punch a hole into it: not (2 <= x1 < 3)
//! let hole = cdd.interval(1, 0, 2, 3).unwrap();
//! let fed = cdd.apply_reduce(Op::And, zone, -hole);
//!
//! // 4. Check properties
//! assert!(!cdd.is_zero(fed));
//! assert_eq!(cdd.contains(fed, &dbm), Ok(false));
//! assert_eq!(cdd.zones(fed).count(), 2);
//! ```
//!
//! ## Core Components
//!
//! - **[`cdd`]**: the [`Cdd`][crate::cdd::Cdd] manager, construction and boolean operations.
//! - **[`reduce`]**: reduction and the fused `apply_reduce`.
//! - **[`extract`]**: zone extraction, containment and the non-negative restriction.
//! - **[`dbm`]**: difference bound matrices.
//! - **[`dot`]**: Graphviz output.

pub mod bound;
pub mod cache;
pub mod cdd;
pub mod dbm;
pub mod dot;
pub mod error;
pub mod extract;
pub mod gen;
pub mod node;
pub mod paths;
pub mod reduce;
pub mod reference;
pub mod table;
pub mod types;
pub mod utils;
