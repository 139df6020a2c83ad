use std::fmt::{Display, Formatter};
use std::ops::Neg;

/// A handle to a diagram node, possibly complemented.
///
/// The magnitude is the node's slot in the node table and the sign is the
/// complement flag, so negation of a whole federation is `-f`.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(i32);

impl Ref {
    pub const fn positive(index: u32) -> Self {
        assert!(index <= i32::MAX as u32, "Node index does not fit into a reference");
        Self(index as i32)
    }

    pub const fn is_negated(self) -> bool {
        self.0 < 0
    }

    /// Returns the non-complemented version of this reference.
    pub const fn regular(self) -> Self {
        Self(self.0.abs())
    }

    /// Return the internal representation of the reference.
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Return the index of the referenced node.
    pub const fn index(self) -> usize {
        self.0.unsigned_abs() as usize
    }

    /// Applies the complement flag of `self` to `other`.
    pub fn apply_sign(self, other: Ref) -> Ref {
        if self.is_negated() {
            -other
        } else {
            other
        }
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation() {
        let r = Ref::positive(5);
        assert!(!r.is_negated());
        assert!((-r).is_negated());
        assert_eq!(-(-r), r);
        assert_eq!((-r).index(), 5);
        assert_eq!((-r).regular(), r);
        assert_eq!((-r).apply_sign(r), -r);
    }

    #[test]
    fn test_display() {
        assert_eq!(Ref::positive(3).to_string(), "@3");
        assert_eq!((-Ref::positive(3)).to_string(), "~@3");
    }
}
