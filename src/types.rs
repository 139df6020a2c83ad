//! Clock pairs and the global decision order.
//!
//! Every decision node tests the difference `x_i - x_j` of one clock pair
//! with `i > j`. Pairs are laid out in a fixed total order:
//!
//! ```text
//! level(i, j) = i * (i - 1) / 2 + j
//!
//! (1,0) (2,0) (2,1) (3,0) (3,1) (3,2) ...
//!   0     1     2     3     4     5
//! ```
//!
//! Adding clocks only appends levels, so the order of existing pairs never
//! changes for the lifetime of a manager.

use std::fmt;

/// Level value reserved for the terminal node; sorts after every pair.
pub const TERMINAL_LEVEL: u32 = u32::MAX;

/// An ordered clock pair `(i, j)` with `i > j`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ClockPair {
    i: u32,
    j: u32,
}

impl ClockPair {
    /// # Panics
    ///
    /// Panics unless `i > j`.
    pub fn new(i: u32, j: u32) -> Self {
        assert!(i > j, "Clock pair must satisfy i > j, got ({}, {})", i, j);
        Self { i, j }
    }

    pub fn i(self) -> usize {
        self.i as usize
    }

    pub fn j(self) -> usize {
        self.j as usize
    }

    pub fn level(self) -> u32 {
        self.i * (self.i - 1) / 2 + self.j
    }

    pub fn from_level(level: u32) -> Self {
        assert_ne!(level, TERMINAL_LEVEL, "Terminal level has no clock pair");
        // Largest `i` with `i * (i - 1) / 2 <= level`.
        let mut i = ((2.0 * level as f64).sqrt() as u32).max(1);
        while i * (i - 1) / 2 > level {
            i -= 1;
        }
        while (i + 1) * i / 2 <= level {
            i += 1;
        }
        Self {
            i,
            j: level - i * (i - 1) / 2,
        }
    }
}

impl fmt::Display for ClockPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}-x{}", self.i, self.j)
    }
}

/// Number of decision levels over `clocks` clocks (reference included).
pub fn num_levels(clocks: usize) -> usize {
    clocks * clocks.saturating_sub(1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order() {
        assert_eq!(ClockPair::new(1, 0).level(), 0);
        assert_eq!(ClockPair::new(2, 0).level(), 1);
        assert_eq!(ClockPair::new(2, 1).level(), 2);
        assert_eq!(ClockPair::new(3, 0).level(), 3);
        assert_eq!(ClockPair::new(3, 2).level(), 5);
    }

    #[test]
    fn test_from_level_inverts_level() {
        for i in 1..40 {
            for j in 0..i {
                let pair = ClockPair::new(i, j);
                assert_eq!(ClockPair::from_level(pair.level()), pair);
            }
        }
    }

    #[test]
    fn test_num_levels() {
        assert_eq!(num_levels(0), 0);
        assert_eq!(num_levels(1), 0);
        assert_eq!(num_levels(2), 1);
        assert_eq!(num_levels(4), 6);
    }

    #[test]
    #[should_panic(expected = "Clock pair must satisfy i > j")]
    fn test_reversed_pair_panics() {
        ClockPair::new(0, 1);
    }
}
