//! Deterministic `HashMap` and `HashSet` variants. The standard library's maps are seeded
//! randomly per process, which would make iteration order (and therefore any simulation that
//! iterates a map) differ between two runs with the same random seed.
//!
//! `HashMap<K, V, S>` has no `new` method for a custom hasher; use `HashMap::default()` or bring
//! `HashMapExt` / `HashSetExt` into scope.

use std::hash::BuildHasherDefault;
use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::FxHasher;

pub type HashMap<K, V> = std::collections::HashMap<K, V, BuildHasherDefault<FxHasher>>;
pub type HashSet<T> = std::collections::HashSet<T, BuildHasherDefault<FxHasher>>;

pub trait HashMapExt {
    fn new() -> Self;
    fn with_capacity(capacity: usize) -> Self;
}

impl<K, V> HashMapExt for HashMap<K, V> {
    fn new() -> Self {
        HashMap::default()
    }

    fn with_capacity(capacity: usize) -> Self {
        HashMap::with_capacity_and_hasher(capacity, BuildHasherDefault::default())
    }
}

pub trait HashSetExt {
    fn new() -> Self;
    fn with_capacity(capacity: usize) -> Self;
}

impl<T> HashSetExt for HashSet<T> {
    fn new() -> Self {
        HashSet::default()
    }

    fn with_capacity(capacity: usize) -> Self {
        HashSet::with_capacity_and_hasher(capacity, BuildHasherDefault::default())
    }
}

/// Stable 64-bit hash of a string, used to derive per-generator seed offsets.
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}
