//! Random zones for tests, benchmarks and the demo harness.

use rand::Rng;

use crate::bound::Bound;
use crate::dbm::Dbm;

/// Generates a closed, non-empty zone of dimension `dim` over non-negative
/// clocks, with constants roughly within `0..=range`.
///
/// A random integer valuation is picked first and every generated
/// constraint is loosened around it, so the zone is never empty. Returns the
/// zone and whether it is non-trivial, i.e. tighter than [`Dbm::init`].
///
/// ```
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
/// use cdd_rs::gen::random_dbm;
///
/// let mut rng = ChaCha8Rng::seed_from_u64(42);
/// let (dbm, _) = random_dbm(&mut rng, 4, 100);
/// assert!(dbm.is_valid());
/// assert!(dbm.is_closed());
/// ```
pub fn random_dbm(rng: &mut impl Rng, dim: usize, range: i32) -> (Dbm, bool) {
    assert!(dim >= 1, "A matrix needs at least the reference clock");
    assert!(
        (1..=Bound::MAX_VALUE / 4).contains(&range),
        "Range must be in 1..={}, got {}",
        Bound::MAX_VALUE / 4,
        range
    );

    let valuation: Vec<i32> = (0..dim)
        .map(|i| if i == 0 { 0 } else { rng.gen_range(0..=range) })
        .collect();

    let mut dbm = Dbm::init(dim);
    for i in 0..dim {
        for j in 0..dim {
            if i == j || !rng.gen_bool(0.5) {
                continue;
            }
            let diff = valuation[i] - valuation[j];
            let slack = rng.gen_range(0..=range / 2);
            let bound = if slack == 0 || rng.gen_bool(0.5) {
                Bound::le(diff + slack)
            } else {
                Bound::lt(diff + slack)
            };
            if bound < dbm.get(i, j) {
                dbm.set(i, j, bound);
            }
        }
    }

    let valid = dbm.close();
    debug_assert!(valid, "The chosen valuation satisfies every constraint");

    let non_trivial = dbm != Dbm::init(dim);
    (dbm, non_trivial)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_generated_zones_are_valid() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut non_trivial = 0;
        for dim in 1..=5 {
            for _ in 0..50 {
                let (dbm, good) = random_dbm(&mut rng, dim, 1000);
                assert_eq!(dbm.dim(), dim);
                assert!(dbm.is_valid());
                assert!(dbm.is_closed());
                assert!(Dbm::init(dim).includes(&dbm).unwrap());
                if dim == 1 {
                    assert!(!good);
                }
                non_trivial += good as usize;
            }
        }
        assert!(non_trivial > 100);
    }

    #[test]
    fn test_generator_is_deterministic() {
        let a = random_dbm(&mut ChaCha8Rng::seed_from_u64(7), 4, 50);
        let b = random_dbm(&mut ChaCha8Rng::seed_from_u64(7), 4, 50);
        assert_eq!(a, b);
    }
}
