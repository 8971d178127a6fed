//! # Cache Trait Seams
//!
//! Two traits split the engine into layers that can be swapped independently:
//!
//! ```text
//!   ┌─────────────────────────────────────────────┐
//!   │ StampedeCoordinator<C, K, V, E>             │   one producer per key
//!   └──────────────────────┬──────────────────────┘
//!                          │ C: ConcurrentCache<K, V>
//!   ┌──────────────────────▼──────────────────────┐
//!   │ GuardedCache / ShardedCache                 │   &self, lock per core
//!   └──────────────────────┬──────────────────────┘
//!                          │ owns
//!   ┌──────────────────────▼──────────────────────┐
//!   │ CacheCore<K, V, P>                          │   &mut self, stats
//!   └──────────────────────┬──────────────────────┘
//!                          │ P: EvictionPolicy<K>
//!   ┌──────────────────────▼──────────────────────┐
//!   │ LruPolicy / LfuPolicy / Policy              │   key metadata only
//!   └─────────────────────────────────────────────┘
//! ```
//!
//! ## Trait Summary
//!
//! | Trait                 | Receiver | Purpose                                   |
//! |-----------------------|----------|-------------------------------------------|
//! | `EvictionPolicy<K>`   | `&mut`   | Track recency/frequency, pick victims     |
//! | `ConcurrentCache<K,V>`| `&`      | Thread-safe cache surface for coordinators|

use crate::stats::CacheStats;

/// Bookkeeping half of a cache: knows which keys are present and which one
/// to evict, but never sees values.
///
/// Policies are infallible. Absence is reported as `false` or `None`.
///
/// The key set tracked by a policy must always equal the key set of the value
/// store that owns it; [`CacheCore`](crate::core::CacheCore) keeps the two in
/// lockstep.
pub trait EvictionPolicy<K> {
    /// Returns whether `key` is tracked and, if so, records an access to it.
    fn touch(&mut self, key: &K) -> bool;

    /// Registers `key` as present (new or overwritten) and records an access.
    ///
    /// When `key` is new and the policy is already at capacity, the victim is
    /// chosen, dropped from the policy's own bookkeeping, and returned.
    /// Re-admitting a key that is already tracked never evicts.
    fn admit(&mut self, key: K) -> Option<K>;

    /// Stops tracking `key`; returns whether it was tracked.
    fn remove(&mut self, key: &K) -> bool;

    /// Returns whether `key` is tracked, without recording an access.
    fn contains(&self, key: &K) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    /// Drops all metadata.
    fn clear(&mut self);
}

/// Cache surface that is safe to call from many threads through `&self`.
///
/// Every method is linearizable with respect to the other methods acting on
/// the same key.
pub trait ConcurrentCache<K, V>: Send + Sync {
    /// Looks up `key`, refreshing its policy metadata and counting a hit or
    /// miss.
    fn get(&self, key: &K) -> Option<V>;

    /// Inserts or overwrites `key`, returning the key evicted to make room.
    fn put(&self, key: K, value: V) -> Option<K>;

    fn remove(&self, key: &K) -> bool;

    /// Presence check that leaves metadata and statistics untouched.
    fn contains(&self, key: &K) -> bool;

    fn size(&self) -> usize;

    fn capacity(&self) -> usize;

    fn clear(&self);

    fn stats(&self) -> CacheStats;
}

impl<K, V, C> ConcurrentCache<K, V> for Box<C>
where
    C: ConcurrentCache<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    fn put(&self, key: K, value: V) -> Option<K> {
        (**self).put(key, value)
    }

    fn remove(&self, key: &K) -> bool {
        (**self).remove(key)
    }

    fn contains(&self, key: &K) -> bool {
        (**self).contains(key)
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn stats(&self) -> CacheStats {
        (**self).stats()
    }
}
