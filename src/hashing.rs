//! Deterministic hashing. The standard library `HashMap` is randomly seeded,
//! which would make iteration order, and with it the order of random draws,
//! differ between runs with the same seed. Every map and set in the engine
//! uses the Fx hasher instead.
//!
//! `HashMap<K, V, S>` has no `new` method for a non-default hasher; use
//! `HashMap::default()`.

use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// A stable 64-bit hash of a `&str`, used to derive per-stream seeds from
/// RNG names.
#[must_use]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}
