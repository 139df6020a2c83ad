use std::ops::Index;

use crate::utils::MyHash;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    next: usize,
    occupied: bool,
}

impl<T> Entry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            next: 0,
            occupied: false,
        }
    }
}

/// Capacity-bounded hash-consing table.
///
/// Slot `0` is a sentry and never holds a value, so `0` doubles as the
/// "end of chain" marker in buckets. Freed slots are recycled through a
/// free list.
pub struct Table<T> {
    data: Vec<Entry<T>>,
    capacity: usize,

    buckets: Vec<usize>,
    bitmask: u64,

    /// Slots released by [`Table::drop`], reused before growing.
    free: Vec<usize>,
    /// Number of occupied cells.
    real_size: usize,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table able to hold `capacity` values.
    pub fn new(capacity: usize) -> Self {
        assert!(
            (1..i32::MAX as usize).contains(&capacity),
            "Table capacity should be in the range 1..2^31-1"
        );

        let mut data = Vec::with_capacity(capacity.min(1 << 16) + 1);
        let mut sentry = Entry::new(T::default());
        sentry.occupied = true;
        data.push(sentry);

        let buckets_size = capacity.next_power_of_two().min(1 << 18);
        let buckets = vec![0; buckets_size];
        let bitmask = (buckets_size - 1) as u64;

        Self {
            data,
            capacity,
            buckets,
            bitmask,
            free: Vec::new(),
            real_size: 0,
        }
    }

    /// Allocate a new cell in the table and return its index.
    ///
    /// # Panics
    ///
    /// Panics if all `capacity` cells are occupied.
    pub(crate) fn alloc(&mut self) -> usize {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.data.len();
                if index > self.capacity {
                    panic!("Node store is full ({} nodes)", self.capacity);
                }
                self.data.push(Entry::new(T::default()));
                index
            }
        };

        self.data[index].occupied = true;
        self.real_size += 1;

        index
    }

    /// Drop the value at the given index.
    ///
    /// The slot must not be linked into a bucket chain anymore.
    pub(crate) fn drop(&mut self, index: usize) {
        assert_ne!(index, 0, "Index is 0");
        assert!(self.data[index].occupied, "Index {} is not occupied", index);

        let entry = &mut self.data[index];
        entry.occupied = false;
        entry.next = 0;
        entry.value = T::default();
        self.free.push(index);
        self.real_size -= 1;
    }

    /// Add a new value to the table (outside of any bucket) and return its index.
    pub(crate) fn add(&mut self, value: T) -> usize {
        let index = self.alloc();

        self.data[index].value = value;
        self.data[index].next = 0;

        index
    }
}

impl<T> Table<T> {
    /// Get the capacity of the table.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    /// Get the number of slots ever handed out.
    pub fn size(&self) -> usize {
        self.data.len() - 1
    }
    /// Get the number of occupied cells.
    pub fn real_size(&self) -> usize {
        self.real_size
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.data[index].value
    }

    /// Check if the cell at the given index is occupied.
    pub fn is_occupied(&self, index: usize) -> bool {
        assert_ne!(index, 0, "Index is 0");
        self.data.get(index).is_some_and(|e| e.occupied)
    }
    /// Get the index of the next cell in the bucket chain.
    pub fn next(&self, index: usize) -> usize {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq + Default,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Put a value into the table and return its index, reusing the existing
    /// cell if an equal value is already present.
    pub fn put(&mut self, value: T) -> usize {
        let bucket_index = self.bucket_index(&value);
        let mut index = self.buckets[bucket_index];

        if index == 0 {
            // Create new node and put it into the bucket.
            let i = self.add(value);
            self.buckets[bucket_index] = i;
            return i;
        }

        loop {
            assert!(index > 0);

            if &value == self.value(index) {
                // The node already exists.
                return index;
            }

            let next = self.next(index);

            if next == 0 {
                // Create new node and append it to the bucket.
                let i = self.add(value);
                self.data[index].next = i;
                return i;
            } else {
                // Go to the next node in the bucket.
                index = next;
            }
        }
    }

    /// Drop every hashed value for which `keep` returns `false`, relinking
    /// the bucket chains around the dropped cells.
    ///
    /// Cells created with [`Table::add`] are never visited.
    /// Returns the number of dropped cells.
    pub fn retain(&mut self, mut keep: impl FnMut(usize) -> bool) -> usize {
        let mut dropped = 0;
        for b in 0..self.buckets.len() {
            let mut index = self.buckets[b];
            let mut tail = 0;
            while index != 0 {
                let next = self.data[index].next;
                if keep(index) {
                    if tail == 0 {
                        self.buckets[b] = index;
                    } else {
                        self.data[tail].next = index;
                    }
                    tail = index;
                } else {
                    self.drop(index);
                    dropped += 1;
                }
                index = next;
            }
            if tail == 0 {
                self.buckets[b] = 0;
            } else {
                self.data[tail].next = 0;
            }
        }
        dropped
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}
