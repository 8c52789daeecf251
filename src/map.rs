//! A generic open-addressed hash map.
//!
//! `original_source/progc/src/map.h` gets genericity over entry layout from
//! a `MAP_DECLARE_FUNCTIONS_STATIC` macro plus a `MapMeta` bundle of five
//! function pointers (hash / key-equal / get-occupied / mark-occupied /
//! get-key). Here that bundle becomes a generic `Map<E>` parameterized by
//! ordinary closures passed into each call, using Rust's generics instead
//! of macro-generated per-type families.
//!
//! The probing/growth algorithm itself (power-of-two capacity, linear
//! probing, doubling until the new capacity clears the load factor) is kept
//! exactly as `mapFindEntry`/`mapInsert`/`mapGrow` implement it.

/// An open-addressed table of entries of type `E`. `E` must know how to
/// report whether a given slot is occupied (`is_occupied`); everything else
/// (hashing, equality, construction) is supplied per call so one `Map<E>`
/// type can back every computation's keyed aggregate.
pub struct Map<E> {
    entries: Vec<E>,
    capacity: u32,
    size: u32,
    load_factor: f32,
    size_threshold: u32,
}

impl<E: Clone + Default> Map<E> {
    /// Creates a map with `initial_capacity` slots (must be a power of two)
    /// and the given load factor in `(0, 1)`.
    pub fn new(initial_capacity: u32, load_factor: f32) -> Self {
        assert!(
            initial_capacity > 0 && (initial_capacity & (initial_capacity - 1)) == 0,
            "initial capacity must be a power of two"
        );
        assert!(
            load_factor > 0.0 && load_factor < 1.0,
            "load factor must be strictly between 0 and 1"
        );

        Map {
            entries: vec![E::default(); initial_capacity as usize],
            capacity: initial_capacity,
            size: 0,
            load_factor,
            size_threshold: (initial_capacity as f32 * load_factor) as u32,
        }
    }

    pub fn len(&self) -> u32 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Direct access to one backing slot, for the final full-table sweep
    /// every computation does to transfer its aggregate map into a sort
    /// tree (`for (i = 0; i < capacity; i++) ...` over `map->entries` in
    /// the original). Callers filter by occupancy themselves.
    pub fn entry_at(&self, index: u32) -> Option<&E> {
        self.entries.get(index as usize)
    }

    /// Iterates every backing slot in bucket order, occupied or not —
    /// the safe equivalent of the same full-table sweep.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entries.iter()
    }

    /// Wipes every entry back to unoccupied. `None` keeps the current
    /// capacity (just zeroes it, the cheap path used between partitions in
    /// D1/T so a single route map can be reused across every partition
    /// without ever holding more than one partition's worth of routes),
    /// `Some(n)` reallocates to `n` (still required to be a power of two).
    pub fn clear(&mut self, new_capacity: Option<u32>) {
        let capacity = new_capacity.unwrap_or(self.capacity);
        assert!(
            capacity > 0 && (capacity & (capacity - 1)) == 0,
            "capacity must be a power of two"
        );
        self.entries = vec![E::default(); capacity as usize];
        self.capacity = capacity;
        self.size = 0;
        self.size_threshold = (capacity as f32 * self.load_factor) as u32;
    }

    /// Finds the slot `key` belongs in: the first slot, starting from its
    /// hash bucket and probing linearly, that is either empty or already
    /// holds a key equal to `key` (`mapFindEntry`).
    fn find_slot<K>(
        &self,
        key: &K,
        hash: impl Fn(&K, u32) -> u32,
        is_occupied: impl Fn(&E) -> bool,
        key_equal: impl Fn(&E, &K) -> bool,
    ) -> u32 {
        let mask = self.capacity - 1;
        let mut i = hash(key, self.capacity) & mask;
        while is_occupied(&self.entries[i as usize]) && !key_equal(&self.entries[i as usize], key) {
            i = (i + 1) & mask;
        }
        i
    }

    /// Returns the entry for `key`, if a matching occupied slot exists.
    pub fn lookup<K>(
        &self,
        key: &K,
        hash: impl Fn(&K, u32) -> u32,
        is_occupied: impl Fn(&E) -> bool,
        key_equal: impl Fn(&E, &K) -> bool,
    ) -> Option<&E> {
        let slot = self.find_slot(key, hash, &is_occupied, key_equal);
        let entry = &self.entries[slot as usize];
        is_occupied(entry).then_some(entry)
    }

    /// Same as [`Map::lookup`] but mutable, for in-place aggregate updates.
    pub fn lookup_mut<K>(
        &mut self,
        key: &K,
        hash: impl Fn(&K, u32) -> u32,
        is_occupied: impl Fn(&E) -> bool,
        key_equal: impl Fn(&E, &K) -> bool,
    ) -> Option<&mut E> {
        let slot = self.find_slot(key, &hash, &is_occupied, &key_equal);
        if is_occupied(&self.entries[slot as usize]) {
            Some(&mut self.entries[slot as usize])
        } else {
            None
        }
    }

    /// Inserts a new entry for `key`, growing the table first if this
    /// insertion would exceed the load-factor threshold (`mapInsert`).
    ///
    /// # Panics
    ///
    /// Panics if a slot for `key` is already occupied — callers must check
    /// via [`Map::lookup_mut`] first, matching the original's
    /// `assert(!occupied)` contract (insert is "create", not "upsert").
    pub fn insert<K>(
        &mut self,
        key: &K,
        hash: impl Fn(&K, u32) -> u32,
        is_occupied: impl Fn(&E) -> bool,
        key_equal: impl Fn(&E, &K) -> bool,
        mark_occupied: impl FnOnce(&mut E, &K),
        get_key_for_rehash: impl Fn(&E) -> K,
    ) -> &mut E {
        if self.size + 1 >= self.size_threshold {
            self.grow(&hash, &is_occupied, &get_key_for_rehash);
        }

        let slot = self.find_slot(key, &hash, &is_occupied, &key_equal);
        assert!(
            !is_occupied(&self.entries[slot as usize]),
            "insert called with a key that already has an occupied slot"
        );

        mark_occupied(&mut self.entries[slot as usize], key);
        self.size += 1;
        &mut self.entries[slot as usize]
    }

    /// Doubles capacity (possibly more than once, if the load factor would
    /// still be exceeded) and rehashes every occupied entry into the new
    /// table (`mapGrow`).
    fn grow<K>(
        &mut self,
        hash: &impl Fn(&K, u32) -> u32,
        is_occupied: &impl Fn(&E) -> bool,
        get_key_for_rehash: &impl Fn(&E) -> K,
    ) {
        let mut next_capacity = self.capacity * 2;
        while (next_capacity as f32 * self.load_factor) as u32 <= self.size + 1 {
            next_capacity *= 2;
        }

        let prev_entries = std::mem::replace(&mut self.entries, vec![E::default(); next_capacity as usize]);
        self.capacity = next_capacity;
        self.size_threshold = (next_capacity as f32 * self.load_factor) as u32;

        let mask = self.capacity - 1;
        for entry in prev_entries.into_iter().filter(|e| is_occupied(e)) {
            let key = get_key_for_rehash(&entry);
            let mut i = hash(&key, self.capacity) & mask;
            while is_occupied(&self.entries[i as usize]) {
                i = (i + 1) & mask;
            }
            self.entries[i as usize] = entry;
        }
    }
}

/// FNV-1a, the hash used across every computation's keyed aggregate —
/// chosen over the original's unspecified hash function because it is a
/// simple, well-known, dependency-free string/byte hash well suited to
/// short town/driver names.
pub fn fnv1a(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
