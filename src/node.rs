use crate::bound::Bound;
use crate::reference::Ref;
use crate::types::TERMINAL_LEVEL;
use crate::utils::{mix64, pairing2, pairing3, MyHash};

/// One outgoing edge of a decision node.
///
/// The edge covers the values of `x_i - x_j` that satisfy `bound` but do not
/// satisfy the bound of the previous edge.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Elem {
    pub child: Ref,
    pub bound: Bound,
}

impl Elem {
    pub fn new(child: Ref, bound: Bound) -> Self {
        Self { child, bound }
    }
}

/// A decision node: a clock pair (by level) and its cut list.
///
/// Bounds are strictly increasing and the last one is [`Bound::INFINITY`],
/// so the edges partition the real line.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Node {
    pub level: u32,
    pub elems: Vec<Elem>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            level: TERMINAL_LEVEL,
            elems: Vec::new(),
        }
    }
}

impl Node {
    pub fn is_terminal(&self) -> bool {
        self.level == TERMINAL_LEVEL
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        let seed = pairing2(self.level as u64, self.elems.len() as u64);
        let folded = self.elems.iter().fold(seed, |acc, e| {
            pairing3(mix64(acc), e.child.get() as u32 as u64, e.bound.raw() as u32 as u64)
        });
        mix64(folded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_depends_on_elems() {
        let one = Ref::positive(1);
        let a = Node {
            level: 0,
            elems: vec![Elem::new(-one, Bound::lt(0)), Elem::new(one, Bound::INFINITY)],
        };
        let b = Node {
            level: 0,
            elems: vec![Elem::new(-one, Bound::le(0)), Elem::new(one, Bound::INFINITY)],
        };
        assert_eq!(a.hash(), a.clone().hash());
        assert_ne!(a.hash(), b.hash());
        assert!(Node::default().is_terminal());
    }
}
