//! Single-threaded cache core: value store plus eviction policy plus counters.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────┐
//!   │ CacheCore<K, V, P>                                       │
//!   │                                                          │
//!   │   entries: FxHashMap<K, V>      policy: P                │
//!   │   ┌─────┬───────┐               ┌──────────────────────┐ │
//!   │   │ key │ value │  ◄─ same ─►   │ recency / frequency  │ │
//!   │   └─────┴───────┘    key set    │ metadata, victim pick│ │
//!   │                                 └──────────────────────┘ │
//!   │   hits, misses: u64                                      │
//!   └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The policy decides, the core applies: `put` asks the policy to admit the
//! key and drops whatever value belongs to the key it hands back. The key
//! sets of `entries` and `policy` are identical after every call.
//!
//! `CacheCore` takes `&mut self` everywhere, including `get`, because a hit
//! reorders policy metadata. Share it across threads through
//! [`GuardedCache`](crate::guard::GuardedCache) or
//! [`ShardedCache`](crate::guard::ShardedCache).
//!
//! ## Example
//!
//! ```
//! use cacheward::core::CacheCore;
//! use cacheward::policy::PolicyKind;
//!
//! let mut cache = CacheCore::try_new(PolicyKind::Lru, 2).unwrap();
//! cache.put("a", 1);
//! cache.put("b", 2);
//! assert_eq!(cache.get(&"a"), Some(1));
//! assert_eq!(cache.put("c", 3), Some("b"));
//! assert_eq!(cache.stats().hits, 1);
//! ```

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::{ConfigError, InvariantError};
use crate::policy::{Policy, PolicyKind};
use crate::stats::CacheStats;
use crate::traits::EvictionPolicy;

/// Fixed-capacity key/value store with pluggable eviction.
pub struct CacheCore<K, V, P = Policy<K>> {
    entries: FxHashMap<K, V>,
    policy: P,
    hits: u64,
    misses: u64,
}

impl<K, V> CacheCore<K, V, Policy<K>>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache holding at most `capacity` entries under `kind`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroCapacity`] when `capacity` is 0.
    pub fn try_new(kind: PolicyKind, capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self::with_policy(Policy::new(kind, capacity)))
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }
}

impl<K, V, P> CacheCore<K, V, P>
where
    K: Eq + Hash + Clone,
    P: EvictionPolicy<K>,
{
    /// Wraps an already-built policy.
    ///
    /// Any keys the policy already tracks are discarded: the store starts
    /// empty, so the policy must too.
    pub fn with_policy(mut policy: P) -> Self {
        policy.clear();
        let capacity = policy.capacity();
        Self {
            entries: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            policy,
            hits: 0,
            misses: 0,
        }
    }

    /// Looks up `key`, refreshing its policy metadata on a hit.
    ///
    /// Counts one hit or one miss. Returns a clone; callers never get a
    /// mutable alias into the store.
    pub fn get(&mut self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        if self.policy.touch(key) {
            self.hits += 1;
            self.entries.get(key).cloned()
        } else {
            self.misses += 1;
            None
        }
    }

    /// Reads `key` without touching metadata or counters.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Inserts or overwrites `key`.
    ///
    /// Returns the key evicted to make room, if any. Overwriting a present
    /// key replaces its value, refreshes its metadata, and never evicts.
    pub fn put(&mut self, key: K, value: V) -> Option<K> {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            self.policy.admit(key);
            return None;
        }

        let evicted = self.policy.admit(key.clone());
        if let Some(victim) = &evicted {
            self.entries.remove(victim);
            trace!(size = self.entries.len(), "evicted entry to admit new key");
        }
        self.entries.insert(key, value);
        evicted
    }

    /// Removes `key` from the store and the policy; returns whether it was
    /// present.
    pub fn remove(&mut self, key: &K) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.policy.remove(key);
            trace!(size = self.entries.len(), "removed entry");
        }
        removed
    }

    /// Presence check without touching metadata or counters.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.policy.capacity()
    }

    /// Drops every entry and all policy metadata, and zeroes the counters.
    pub fn clear(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.policy.clear();
        self.hits = 0;
        self.misses = 0;
        debug!(dropped, "cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats::new(self.hits, self.misses, self.entries.len(), self.capacity())
    }

    /// Read access to the policy for introspection.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Verifies that the value store and the policy track the same keys and
    /// that the store is within capacity.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.entries.len() > self.capacity() {
            return Err(InvariantError::new(format!(
                "size {} exceeds capacity {}",
                self.entries.len(),
                self.capacity()
            )));
        }
        if self.entries.len() != self.policy.len() {
            return Err(InvariantError::new(format!(
                "store holds {} keys but policy tracks {}",
                self.entries.len(),
                self.policy.len()
            )));
        }
        if self.entries.keys().any(|key| !self.policy.contains(key)) {
            return Err(InvariantError::new("stored key missing from policy"));
        }
        Ok(())
    }
}

impl<K, V, P> fmt::Debug for CacheCore<K, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheCore")
            .field("size", &self.entries.len())
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{LfuPolicy, LruPolicy};

    // ==============================================
    // Construction
    // ==============================================

    #[test]
    fn zero_capacity_is_rejected() {
        let err = CacheCore::<u32, u32>::try_new(PolicyKind::Lfu, 0).unwrap_err();
        assert_eq!(err, ConfigError::ZeroCapacity);
    }

    #[test]
    fn with_policy_takes_capacity_from_policy() {
        let cache: CacheCore<u32, u32, LruPolicy<u32>> = CacheCore::with_policy(LruPolicy::new(7));
        assert_eq!(cache.capacity(), 7);
        assert!(cache.is_empty());
    }

    #[test]
    fn with_policy_drops_keys_the_policy_already_tracked() {
        let mut policy = LruPolicy::new(2);
        policy.admit("ghost");
        let mut cache: CacheCore<&str, u32, _> = CacheCore::with_policy(policy);

        assert_eq!(cache.policy().len(), 0);
        assert_eq!(cache.get(&"ghost"), None);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (0, 1));
        cache.check_invariants().unwrap();

        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.put("c", 3), Some("a"));
        assert_eq!(cache.size(), 2);
        cache.check_invariants().unwrap();
    }

    // ==============================================
    // Eviction order
    // ==============================================

    #[test]
    fn lru_evicts_least_recently_used() {
        let mut cache = CacheCore::try_new(PolicyKind::Lru, 3).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);
        assert_eq!(cache.get(&"a"), Some(1));

        assert_eq!(cache.put("d", 4), Some("b"));
        assert!(cache.contains(&"a"));
        assert!(cache.contains(&"c"));
        assert!(!cache.contains(&"b"));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn lfu_tie_breaks_on_oldest_access() {
        let mut cache = CacheCore::try_new(PolicyKind::Lfu, 3).unwrap();
        cache.put("x", 1);
        cache.put("y", 2);
        cache.put("z", 3);
        cache.get(&"x");
        cache.get(&"x");
        cache.get(&"y");

        assert_eq!(cache.put("w", 4), Some("z"));
        assert_eq!(cache.peek(&"y"), Some(&2));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn overwrite_replaces_value_without_eviction() {
        for kind in [PolicyKind::Lru, PolicyKind::Lfu] {
            let mut cache = CacheCore::try_new(kind, 2).unwrap();
            cache.put("k", "v1");
            cache.put("other", "o");
            assert_eq!(cache.put("k", "v2"), None);
            assert_eq!(cache.get(&"k"), Some("v2"));
            assert_eq!(cache.size(), 2);
            assert!(cache.contains(&"other"));
        }
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let mut cache = CacheCore::with_policy(LfuPolicy::new(5));
        for i in 0..200u32 {
            cache.put(i % 17, i);
            if i % 4 == 0 {
                cache.get(&(i % 5));
            }
            assert!(cache.size() <= 5);
        }
        cache.check_invariants().unwrap();
    }

    // ==============================================
    // Remove / peek / contains
    // ==============================================

    #[test]
    fn remove_reports_presence() {
        let mut cache = CacheCore::try_new(PolicyKind::Lru, 2).unwrap();
        cache.put(1, "one");
        assert!(cache.remove(&1));
        assert!(!cache.remove(&1));
        assert!(cache.is_empty());
        cache.check_invariants().unwrap();
    }

    #[test]
    fn peek_and_contains_leave_stats_alone() {
        let mut cache = CacheCore::try_new(PolicyKind::Lru, 2).unwrap();
        cache.put(1, 10);
        assert_eq!(cache.peek(&1), Some(&10));
        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert_eq!(cache.stats().total_accesses(), 0);
    }

    #[test]
    fn peek_does_not_refresh_recency() {
        let mut cache = CacheCore::try_new(PolicyKind::Lru, 2).unwrap();
        cache.put(1, 10);
        cache.put(2, 20);
        cache.peek(&1);
        assert_eq!(cache.put(3, 30), Some(1));
    }

    // ==============================================
    // Stats / clear
    // ==============================================

    #[test]
    fn hit_rate_counts_hits_and_misses() {
        let mut cache = CacheCore::try_new(PolicyKind::Lfu, 4).unwrap();
        assert_eq!(cache.stats().hit_rate, 0.0);

        cache.put(1, 1);
        cache.get(&1);
        cache.get(&1);
        cache.get(&1);
        cache.get(&2);

        let stats = cache.stats();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 0.75);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.capacity, 4);
    }

    #[test]
    fn clear_resets_entries_and_stats() {
        let mut cache = CacheCore::try_new(PolicyKind::Lru, 3).unwrap();
        cache.put(1, 1);
        cache.put(2, 2);
        cache.get(&1);
        cache.get(&9);

        cache.clear();
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.stats(), CacheStats::new(0, 0, 0, 3));
        assert_eq!(cache.policy().len(), 0);
        cache.check_invariants().unwrap();
    }
}
