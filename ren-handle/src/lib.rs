//! Generational index pool and dense handle map for scene-object identity.
//!
//! `GenIndex` packs a 24-bit slot index and an 8-bit generation into a
//! single `u32`, the way `blade-graphics` packs its `slotmap::new_key_type!`
//! resource keys; [`new_key_type!`] here plays the same role, producing a
//! distinct `Copy` key type per resource kind so a `MeshHandle` can never be
//! confused with a `NodeHandle`.
//!
//! Grounded on `examples/original_source/lib/core/GenIndexPool.hpp`.

use std::marker::PhantomData;

const INDEX_BITS: u32 = 24;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;

/// Generation value meaning "this slot has been permanently retired"; it is
/// the value a generation wraps to after `u8::MAX` reuse cycles.
pub const TOMBSTONE: u8 = 0;
/// First live generation a freshly grown slot is given.
pub const INIT: u8 = 1;

/// A 24-bit slot index paired with an 8-bit generation.
///
/// `key` refers to a live value iff the pool's slot `key.index()` is active
/// and its stored generation equals `key.generation()`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct GenIndex(u32);

impl GenIndex {
    pub fn new(index: u32, generation: u8) -> Self {
        assert!(index <= INDEX_MASK, "ren-handle: slot index overflows 24 bits");
        GenIndex((u32::from(generation) << INDEX_BITS) | index)
    }

    pub fn index(self) -> u32 {
        self.0 & INDEX_MASK
    }

    pub fn generation(self) -> u8 {
        (self.0 >> INDEX_BITS) as u8
    }
}

/// A type-safe key derived from [`GenIndex`]. Implemented for every type
/// produced by [`new_key_type!`].
pub trait Key: Copy + Eq + std::hash::Hash {
    fn from_gen_index(index: GenIndex) -> Self;
    fn gen_index(self) -> GenIndex;
}

/// Defines a distinct, `Copy`, generational key type backed by [`GenIndex`].
///
/// ```
/// ren_handle::new_key_type! {
///     pub struct MeshHandle;
/// }
/// ```
#[macro_export]
macro_rules! new_key_type {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis struct $name($crate::GenIndex);

        impl $crate::Key for $name {
            fn from_gen_index(index: $crate::GenIndex) -> Self {
                $name(index)
            }
            fn gen_index(self) -> $crate::GenIndex {
                self.0
            }
        }
    };
}

#[derive(Clone, Copy)]
enum Slot {
    Active(u8),
    Free(u8),
    Tombstoned,
}

/// Allocator for [`GenIndex`]-backed keys, with ABA-safety across
/// generate/erase cycles and permanent retirement on generation wrap.
pub struct GenIndexPool<K: Key> {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    num_active: usize,
    _marker: PhantomData<K>,
}

impl<K: Key> Default for GenIndexPool<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key> GenIndexPool<K> {
    pub fn new() -> Self {
        GenIndexPool {
            slots: Vec::new(),
            free_list: Vec::new(),
            num_active: 0,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.num_active
    }

    pub fn is_empty(&self) -> bool {
        self.num_active == 0
    }

    /// Total number of slots ever allocated, including retired and free
    /// ones; an upper bound for dense storage sized to match this pool.
    pub fn raw_len(&self) -> usize {
        self.slots.len()
    }

    pub fn contains(&self, key: K) -> bool {
        let gi = key.gen_index();
        match self.slots.get(gi.index() as usize) {
            Some(Slot::Active(g)) => *g == gi.generation(),
            _ => false,
        }
    }

    /// Allocates a key whose slot is marked active and whose generation is
    /// the slot's current generation.
    pub fn generate(&mut self) -> K {
        let index = if let Some(index) = self.free_list.pop() {
            let generation = match self.slots[index as usize] {
                Slot::Free(g) => g,
                _ => unreachable!("free list referenced a non-free slot"),
            };
            self.slots[index as usize] = Slot::Active(generation);
            index
        } else {
            self.slots.push(Slot::Active(INIT));
            (self.slots.len() - 1) as u32
        };
        self.num_active += 1;
        let generation = match self.slots[index as usize] {
            Slot::Active(g) => g,
            _ => unreachable!(),
        };
        K::from_gen_index(GenIndex::new(index, generation))
    }

    /// Increments the slot's generation and either returns it to the free
    /// list or, if the generation just wrapped to [`TOMBSTONE`], retires it
    /// permanently.
    pub fn erase(&mut self, key: K) -> bool {
        if !self.contains(key) {
            return false;
        }
        let index = key.gen_index().index() as usize;
        let next_generation = key.gen_index().generation().wrapping_add(1);
        self.slots[index] = if next_generation == TOMBSTONE {
            Slot::Tombstoned
        } else {
            self.free_list.push(index as u32);
            Slot::Free(next_generation)
        };
        self.num_active -= 1;
        true
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.num_active = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| match slot {
            Slot::Active(g) => Some(K::from_gen_index(GenIndex::new(index as u32, *g))),
            _ => None,
        })
    }
}

/// Dense value storage keyed by a [`GenIndexPool`]. Indexes are stable for
/// the lifetime of a key; erasing never shuffles other entries.
pub struct HandleMap<K: Key, V> {
    pool: GenIndexPool<K>,
    values: Vec<Option<V>>,
}

impl<K: Key, V> Default for HandleMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, V> HandleMap<K, V> {
    pub fn new() -> Self {
        HandleMap {
            pool: GenIndexPool::new(),
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn insert(&mut self, value: V) -> K {
        let key = self.pool.generate();
        let index = key.gen_index().index() as usize;
        if self.values.len() <= index {
            self.values.resize_with(index + 1, || None);
        }
        self.values[index] = Some(value);
        key
    }

    pub fn get(&self, key: K) -> Option<&V> {
        if !self.pool.contains(key) {
            return None;
        }
        self.values[key.gen_index().index() as usize].as_ref()
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        if !self.pool.contains(key) {
            return None;
        }
        self.values[key.gen_index().index() as usize].as_mut()
    }

    pub fn contains_key(&self, key: K) -> bool {
        self.pool.contains(key)
    }

    pub fn erase(&mut self, key: K) -> Option<V> {
        if !self.pool.contains(key) {
            return None;
        }
        let index = key.gen_index().index() as usize;
        let erased = self.pool.erase(key);
        debug_assert!(erased);
        self.values[index].take()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.pool.iter().map(move |key| {
            let value = self.values[key.gen_index().index() as usize]
                .as_ref()
                .expect("pool and dense storage out of sync");
            (key, value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    new_key_type! {
        struct TestKey;
    }

    #[test]
    fn generate_then_contains() {
        let mut pool: GenIndexPool<TestKey> = GenIndexPool::new();
        let k = pool.generate();
        assert!(pool.contains(k));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn erase_invalidates_key() {
        let mut pool: GenIndexPool<TestKey> = GenIndexPool::new();
        let k = pool.generate();
        assert!(pool.erase(k));
        assert!(!pool.contains(k));
        assert!(!pool.erase(k));
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut pool: GenIndexPool<TestKey> = GenIndexPool::new();
        let k1 = pool.generate();
        pool.erase(k1);
        let k2 = pool.generate();
        assert_eq!(k1.gen_index().index(), k2.gen_index().index());
        assert_ne!(k1.gen_index().generation(), k2.gen_index().generation());
        assert!(!pool.contains(k1));
        assert!(pool.contains(k2));
    }

    #[test]
    fn generation_wrap_retires_slot() {
        let mut pool: GenIndexPool<TestKey> = GenIndexPool::new();
        let mut key = pool.generate();
        let slot_index = key.gen_index().index();
        // Cycle through every generation value until it wraps to TOMBSTONE.
        loop {
            pool.erase(key);
            if key.gen_index().generation().wrapping_add(1) == TOMBSTONE {
                break;
            }
            key = pool.generate();
            assert_eq!(key.gen_index().index(), slot_index);
        }
        // The slot is now retired: a new generate() must not reuse it.
        let fresh = pool.generate();
        assert_ne!(fresh.gen_index().index(), slot_index);
    }

    #[test]
    fn handle_map_insert_get_erase() {
        let mut map: HandleMap<TestKey, &'static str> = HandleMap::new();
        let k = map.insert("hello");
        assert_eq!(map.get(k), Some(&"hello"));
        assert_eq!(map.erase(k), Some("hello"));
        assert_eq!(map.get(k), None);
    }

    #[test]
    fn iteration_visits_live_entries_only() {
        let mut map: HandleMap<TestKey, i32> = HandleMap::new();
        let a = map.insert(1);
        let _b = map.insert(2);
        let c = map.insert(3);
        map.erase(a);
        let mut values: Vec<i32> = map.iter().map(|(_, v)| *v).collect();
        values.sort();
        assert_eq!(values, vec![2, 3]);
        let _ = c;
    }
}
