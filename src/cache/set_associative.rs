//! 4-way set-associative cache with LRU replacement.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Set 0:  [Entry₀] [Entry₁] [Entry₂] [Entry₃]  LRU: 3→1→0→2   │
//! │  Set 1:  [Entry₀] [Entry₁] [Entry₂] [Entry₃]  LRU: 0→2→1→3   │
//! │  ...                                                         │
//! │  generation: 42  (entries with gen ≠ 42 are considered empty) │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::cell::Cell;

use crate::utils::MyHash;

/// Number of ways (slots) per cache set.
const WAYS: usize = 4;

/// Compact LRU state for 4 ways, encoded in 8 bits.
///
/// A permutation of `[0, 1, 2, 3]` from MRU (bits `[1:0]`) to LRU
/// (bits `[7:6]`), two bits per position.
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
struct Lru(u8);

impl Lru {
    /// Order `[0, 1, 2, 3]` from MRU to LRU.
    const INITIAL: Self = Self(0b_11_10_01_00);

    const fn new() -> Self {
        Self::INITIAL
    }

    /// Returns the way index at position `pos` (0 = MRU, 3 = LRU).
    #[inline]
    const fn way_at(&self, pos: usize) -> usize {
        ((self.0 >> (pos * 2)) & 0b11) as usize
    }

    /// The replacement victim.
    #[inline]
    const fn lru_way(&self) -> usize {
        self.way_at(WAYS - 1)
    }

    /// Moves `way` to the MRU position, shifting the ways before it down by one.
    #[inline]
    fn promote(&mut self, way: usize) {
        debug_assert!(way < WAYS);

        let pos = (0..WAYS).find(|&p| self.way_at(p) == way).unwrap_or(0);
        if pos == 0 {
            return;
        }

        // Positions 0..pos, shifted down one slot.
        let head_mask = ((1u16 << (pos * 2)) - 1) as u8;
        let head_shifted = (self.0 & head_mask) << 2;
        // Positions pos+1..WAYS stay in place.
        let tail_mask = (0xFFu16 << ((pos + 1) * 2)) as u8;
        let tail = self.0 & tail_mask;

        self.0 = (way as u8) | head_shifted | tail;
    }
}

#[derive(Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
    generation: u64,
}

impl<K: Default, V: Default> Default for Entry<K, V> {
    fn default() -> Self {
        Self {
            key: K::default(),
            value: V::default(),
            generation: 0, // Invalid generation (cache starts at 1)
        }
    }
}

struct CacheSet<K, V> {
    entries: [Entry<K, V>; WAYS],
    lru: Cell<Lru>,
}

impl<K: Default, V: Default> Default for CacheSet<K, V> {
    fn default() -> Self {
        Self {
            entries: std::array::from_fn(|_| Entry::default()),
            lru: Cell::new(Lru::new()),
        }
    }
}

/// A 4-way set-associative cache with O(1) clearing and LRU replacement.
pub struct SetAssociativeCache<K, V> {
    sets: Vec<CacheSet<K, V>>,
    bitmask: u64,
    generation: u64,
    hits: Cell<usize>,
    misses: Cell<usize>,
    faults: Cell<usize>,
}

impl<K, V> SetAssociativeCache<K, V>
where
    K: Default,
    V: Default,
{
    /// Creates a new cache with `2^bits` sets (total entries = sets × 4).
    ///
    /// # Panics
    ///
    /// Panics if `bits > 31`.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Cache bits must be in range 0..=31, got {}", bits);

        let num_sets = 1usize << bits;
        let sets = std::iter::repeat_with(CacheSet::default).take(num_sets).collect();

        Self {
            sets,
            bitmask: (num_sets - 1) as u64,
            generation: 1,
            hits: Cell::new(0),
            misses: Cell::new(0),
            faults: Cell::new(0),
        }
    }

    /// Creates a cache holding at least `entries` entries.
    pub fn with_capacity(entries: usize) -> Self {
        let sets = entries.div_ceil(WAYS).max(1).next_power_of_two();
        Self::new(sets.trailing_zeros() as usize)
    }
}

impl<K, V> SetAssociativeCache<K, V> {
    /// Returns the number of sets in the cache.
    pub fn num_sets(&self) -> usize {
        self.sets.len()
    }

    /// Returns the total entry capacity (sets × ways).
    pub fn capacity(&self) -> usize {
        self.sets.len() * WAYS
    }

    /// Returns the number of cache hits since creation.
    pub fn hits(&self) -> usize {
        self.hits.get()
    }

    /// Returns the number of cache misses since creation.
    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    /// Returns the number of misses that found the set full of other keys.
    pub fn faults(&self) -> usize {
        self.faults.get()
    }

    /// Invalidates every entry in O(1).
    pub fn clear(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            // Generation 0 marks never-written entries; after wrap-around
            // stale entries could alias it, so wipe them for real.
            self.generation = 1;
            for set in &mut self.sets {
                for entry in &mut set.entries {
                    entry.generation = 0;
                }
            }
        }
    }
}

impl<K, V> SetAssociativeCache<K, V>
where
    K: MyHash + Eq,
    V: Copy,
{
    #[inline]
    fn set_index(&self, key: &K) -> usize {
        (key.hash() & self.bitmask) as usize
    }

    /// Looks up a key, promoting it to MRU on a hit.
    pub fn get(&self, key: &K) -> Option<V> {
        let set = &self.sets[self.set_index(key)];

        let mut had_valid_entry = false;
        for (way, entry) in set.entries.iter().enumerate() {
            if entry.generation != self.generation {
                continue;
            }
            had_valid_entry = true;

            if entry.key == *key {
                self.hits.set(self.hits.get() + 1);
                let mut lru = set.lru.get();
                lru.promote(way);
                set.lru.set(lru);
                return Some(entry.value);
            }
        }

        self.misses.set(self.misses.get() + 1);
        if had_valid_entry {
            self.faults.set(self.faults.get() + 1);
        }
        None
    }

    /// Inserts a key-value pair, replacing the LRU entry of a full set.
    pub fn insert(&mut self, key: K, value: V) {
        let set_idx = self.set_index(&key);
        let generation = self.generation;
        let set = &mut self.sets[set_idx];

        let mut empty_slot = None;
        for way in 0..WAYS {
            let entry = &mut set.entries[way];
            if entry.generation != generation {
                empty_slot = empty_slot.or(Some(way));
                continue;
            }
            if entry.key == key {
                entry.value = value;
                let mut lru = set.lru.get();
                lru.promote(way);
                set.lru.set(lru);
                return;
            }
        }

        let target = empty_slot.unwrap_or_else(|| set.lru.get().lru_way());
        set.entries[target] = Entry { key, value, generation };

        let mut lru = set.lru.get();
        lru.promote(target);
        set.lru.set(lru);
    }
}
