//! Per-key exclusive locking.
//!
//! Mutating operations on a data type hold the lock for their namespaced key
//! for the whole operation, serializing writers of that key while leaving
//! other keys untouched. Locks are striped: the key hashes to one of a fixed
//! set of mutexes, so two distinct keys may share a stripe (coarser, never
//! unsound).

use parking_lot::{Mutex, MutexGuard};
use xxhash_rust::xxh64::xxh64;

/// Striped mutual-exclusion manager keyed by byte strings.
pub struct LockManager {
    stripes: Vec<Mutex<()>>,
}

impl LockManager {
    /// Creates a lock manager with `stripe_count` stripes (rounded up to a
    /// power of two, minimum 1).
    pub fn new(stripe_count: usize) -> Self {
        let count = stripe_count.max(1).next_power_of_two();
        let stripes = (0..count).map(|_| Mutex::new(())).collect();
        Self { stripes }
    }

    /// Acquires the exclusive lock for `key`, blocking until available.
    ///
    /// The returned guard releases the lock when dropped, on every exit path.
    pub fn lock_guard(&self, key: &[u8]) -> LockGuard<'_> {
        LockGuard { _guard: self.stripes[self.stripe_index(key)].lock() }
    }

    #[inline]
    fn stripe_index(&self, key: &[u8]) -> usize {
        (xxh64(key, 0) & (self.stripes.len() as u64 - 1)) as usize
    }
}

/// RAII guard for a per-key lock.
pub struct LockGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}
