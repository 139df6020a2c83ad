//! Operation cache for diagram combination.
//!
//! The cache memoizes results of `apply`, `apply_reduce` and `reduce` keyed
//! by operator and operand references. It is a pure accelerator: a miss
//! only costs recomputation, never changes a result.
//!
//! Memory is bounded: the cache is a fixed array of 4-way sets with
//! least-recently-used replacement inside each set, and clearing is O(1)
//! through a generation counter (needed whenever node slots are recycled or
//! the clock dimension changes).

mod set_associative;

pub use set_associative::SetAssociativeCache;

/// Default cache implementation.
pub type Cache<K, V> = SetAssociativeCache<K, V>;
