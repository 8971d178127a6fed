//! Thread-safe wrappers around [`CacheCore`].
//!
//! ## Architecture
//!
//! ```text
//!   GuardedCache                         ShardedCache
//!   ┌───────────────────────┐            ┌───────────────────────────────────────┐
//!   │ Mutex<CacheCore>      │            │ ShardSelector: hash(key) -> shard idx │
//!   │  every op, one lock   │            ├─────────────┬─────────────┬───────────┤
//!   └───────────────────────┘            │ Guarded #0  │ Guarded #1  │ ...       │
//!                                        │ cap = ceil  │ cap = ceil  │           │
//!                                        └─────────────┴─────────────┴───────────┘
//! ```
//!
//! Every operation, `get` included, takes the lock exclusively: a hit
//! reorders LRU links or bumps an LFU score, so readers are writers here.
//! Lock hold time is bounded by the policy's O(1)/O(log n) work; no user code
//! runs under a cache lock.
//!
//! ## Sharding
//!
//! [`ShardedCache`] routes each key to one of N independent guarded cores.
//! Operations on one key are linearizable; operations on keys in different
//! shards are unordered relative to each other. Capacity is enforced per
//! shard, so the global bound is approximate:
//!
//! | Requested capacity | Shards | Per-shard | Reported capacity |
//! |--------------------|--------|-----------|-------------------|
//! | 100                | 4      | 25        | 100               |
//! | 10                 | 4      | 3         | 12                |
//! | 2                  | 8      | 1         | 2 (2 shards)      |
//!
//! The shard count is clamped to the requested capacity so that no shard is
//! created empty.

use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::core::CacheCore;
use crate::ds::ShardSelector;
use crate::error::{ConfigError, InvariantError};
use crate::policy::{Policy, PolicyKind};
use crate::stats::CacheStats;
use crate::traits::{ConcurrentCache, EvictionPolicy};

// ---------------------------------------------------------------------------
// GuardedCache
// ---------------------------------------------------------------------------

/// A [`CacheCore`] behind a single mutex.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use cacheward::guard::GuardedCache;
/// use cacheward::policy::PolicyKind;
///
/// let cache = Arc::new(GuardedCache::try_new(PolicyKind::Lru, 64).unwrap());
/// let handles: Vec<_> = (0..4u64)
///     .map(|t| {
///         let cache = Arc::clone(&cache);
///         thread::spawn(move || cache.put(t, t * 10))
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(cache.size(), 4);
/// ```
pub struct GuardedCache<K, V, P = Policy<K>> {
    inner: Mutex<CacheCore<K, V, P>>,
}

impl<K, V> GuardedCache<K, V, Policy<K>>
where
    K: Eq + Hash + Clone,
{
    pub fn try_new(kind: PolicyKind, capacity: usize) -> Result<Self, ConfigError> {
        CacheCore::try_new(kind, capacity).map(Self::new)
    }
}

impl<K, V, P> GuardedCache<K, V, P>
where
    K: Eq + Hash + Clone,
    P: EvictionPolicy<K>,
{
    pub fn new(core: CacheCore<K, V, P>) -> Self {
        Self {
            inner: Mutex::new(core),
        }
    }

    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.lock().get(key)
    }

    /// Clone of the value without touching metadata or counters.
    pub fn peek(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.lock().peek(key).cloned()
    }

    pub fn put(&self, key: K, value: V) -> Option<K> {
        self.inner.lock().put(key, value)
    }

    pub fn remove(&self, key: &K) -> bool {
        self.inner.lock().remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    pub fn size(&self) -> usize {
        self.inner.lock().size()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Drops all entries, metadata and counters in one critical section.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }

    /// Runs `f` with exclusive access to the core.
    ///
    /// Useful for multi-step updates that must be atomic. `f` runs under the
    /// lock, so keep it short and never call back into this cache from it.
    pub fn with_core<R>(&self, f: impl FnOnce(&mut CacheCore<K, V, P>) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.lock().check_invariants()
    }

    pub fn into_inner(self) -> CacheCore<K, V, P> {
        self.inner.into_inner()
    }
}

impl<K, V, P> ConcurrentCache<K, V> for GuardedCache<K, V, P>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
    P: EvictionPolicy<K> + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        GuardedCache::get(self, key)
    }

    fn put(&self, key: K, value: V) -> Option<K> {
        GuardedCache::put(self, key, value)
    }

    fn remove(&self, key: &K) -> bool {
        GuardedCache::remove(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        GuardedCache::contains(self, key)
    }

    fn size(&self) -> usize {
        GuardedCache::size(self)
    }

    fn capacity(&self) -> usize {
        GuardedCache::capacity(self)
    }

    fn clear(&self) {
        GuardedCache::clear(self)
    }

    fn stats(&self) -> CacheStats {
        GuardedCache::stats(self)
    }
}

impl<K, V, P> fmt::Debug for GuardedCache<K, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.lock();
        f.debug_struct("GuardedCache").field("core", &*core).finish()
    }
}

// ---------------------------------------------------------------------------
// ShardedCache
// ---------------------------------------------------------------------------

/// N independently guarded cores selected by key hash.
pub struct ShardedCache<K, V, P = Policy<K>> {
    shards: Vec<GuardedCache<K, V, P>>,
    selector: ShardSelector,
}

impl<K, V> ShardedCache<K, V, Policy<K>>
where
    K: Eq + Hash + Clone,
{
    /// Splits `capacity` across `shards` cores running `kind`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroCapacity`] or [`ConfigError::ZeroShards`].
    pub fn try_new(kind: PolicyKind, capacity: usize, shards: usize) -> Result<Self, ConfigError> {
        Self::try_with_seed(kind, capacity, shards, 0)
    }

    /// Like [`try_new`](Self::try_new) with an explicit hash seed for shard
    /// selection.
    pub fn try_with_seed(
        kind: PolicyKind,
        capacity: usize,
        shards: usize,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if shards == 0 {
            return Err(ConfigError::ZeroShards);
        }

        let shard_count = shards.min(capacity);
        let per_shard = capacity.div_ceil(shard_count);
        let shards = (0..shard_count)
            .map(|_| GuardedCache::try_new(kind, per_shard))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            shards,
            selector: ShardSelector::new(shard_count, seed),
        })
    }
}

impl<K, V, P> ShardedCache<K, V, P>
where
    K: Eq + Hash + Clone,
    P: EvictionPolicy<K>,
{
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The guarded core responsible for `key`.
    pub fn shard_for(&self, key: &K) -> &GuardedCache<K, V, P> {
        &self.shards[self.selector.shard_for_key(key)]
    }

    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.shard_for(key).get(key)
    }

    pub fn peek(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.shard_for(key).peek(key)
    }

    /// Inserts into the key's shard; the evicted key, if any, comes from the
    /// same shard.
    pub fn put(&self, key: K, value: V) -> Option<K> {
        self.shard_for(&key).put(key, value)
    }

    pub fn remove(&self, key: &K) -> bool {
        self.shard_for(key).remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.shard_for(key).contains(key)
    }

    pub fn size(&self) -> usize {
        self.shards.iter().map(GuardedCache::size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(GuardedCache::is_empty)
    }

    /// Sum of per-shard capacities.
    pub fn capacity(&self) -> usize {
        self.shards.iter().map(GuardedCache::capacity).sum()
    }

    /// Clears shards one at a time; each shard is cleared atomically, the
    /// set of shards is not.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.clear();
        }
    }

    /// Counters and occupancy summed over all shards.
    pub fn stats(&self) -> CacheStats {
        self.shards.iter().map(GuardedCache::stats).sum()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        for (index, shard) in self.shards.iter().enumerate() {
            shard
                .check_invariants()
                .map_err(|err| InvariantError::new(format!("shard {index}: {err}")))?;
        }
        Ok(())
    }
}

impl<K, V, P> ConcurrentCache<K, V> for ShardedCache<K, V, P>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
    P: EvictionPolicy<K> + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        ShardedCache::get(self, key)
    }

    fn put(&self, key: K, value: V) -> Option<K> {
        ShardedCache::put(self, key, value)
    }

    fn remove(&self, key: &K) -> bool {
        ShardedCache::remove(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        ShardedCache::contains(self, key)
    }

    fn size(&self) -> usize {
        ShardedCache::size(self)
    }

    fn capacity(&self) -> usize {
        ShardedCache::capacity(self)
    }

    fn clear(&self) {
        ShardedCache::clear(self)
    }

    fn stats(&self) -> CacheStats {
        ShardedCache::stats(self)
    }
}

impl<K, V, P> fmt::Debug for ShardedCache<K, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedCache")
            .field("shards", &self.shards.len())
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}
