/// [Szudzik pairing function][szudzik-pairing], wrapping on overflow.
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// Node descriptions fold many values through this function, so the result
/// is only used modulo the table size and overflow simply wraps.
///
/// [szudzik-pairing]: http://szudzik.com/ElegantPairing.pdf
pub fn pairing_szudzik(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// Pairing function for two `u64` values.
pub fn pairing2(a: u64, b: u64) -> u64 {
    pairing_szudzik(a, b)
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

/// Final avalanche step (from `splitmix64`), so that low bits used for
/// bucket selection depend on every input bit.
pub fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^= x >> 31;
    x
}

pub trait MyHash {
    /// Structural hash used for bucket and cache-set selection.
    fn hash(&self) -> u64;
}

impl MyHash for (u64, u64) {
    fn hash(&self) -> u64 {
        mix64(pairing2(self.0, self.1))
    }
}

impl MyHash for (u64, u64, u64) {
    fn hash(&self) -> u64 {
        mix64(pairing3(self.0, self.1, self.2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_szudzik_enumerates_squares() {
        // Pairs with max(a, b) < n fill exactly 0..n^2.
        let n = 16;
        let mut seen = vec![false; (n * n) as usize];
        for a in 0..n {
            for b in 0..n {
                let p = pairing_szudzik(a, b) as usize;
                assert!(!seen[p], "collision at ({}, {})", a, b);
                seen[p] = true;
            }
        }
        assert!(seen.iter().all(|&x| x));
        assert_eq!(pairing_szudzik(3, 5), 28);
        assert_eq!(pairing_szudzik(5, 3), 33);
    }

    #[test]
    fn test_pairing_wraps() {
        // Must not panic in debug builds.
        let big = u64::MAX - 3;
        let _ = pairing3(big, big, big);
    }

    #[test]
    fn test_hash_is_order_sensitive() {
        assert_ne!((1u64, 2u64).hash(), (2u64, 1u64).hash());
    }
}
