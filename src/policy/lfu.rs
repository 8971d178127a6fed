//! Least-frequently-used key tracking with recency tie-break.
//!
//! ## Architecture
//!
//! ```text
//!   heap: LazyMinHeap<K, LfuScore>
//!
//!   scores (authoritative)            heap (min first, may hold stale)
//!   ┌─────┬──────────────────┐        ┌──────────────────────────────┐
//!   │ "x" │ freq 3, tick 5   │        │ ("z", {1, 3})   ← victim      │
//!   │ "y" │ freq 2, tick 6   │        │ ("x", {1, 1})   stale         │
//!   │ "z" │ freq 1, tick 3   │        │ ("y", {2, 6})                 │
//!   └─────┴──────────────────┘        │ ("x", {3, 5})                 │
//!                                     └──────────────────────────────┘
//! ```
//!
//! Every access bumps the key's frequency and stamps it with the next value
//! of a per-policy monotonic tick. The victim is the minimum of
//! `(frequency, last_access)`: lowest frequency first, oldest access among
//! equals. Updates are amortized O(log n) through the lazy heap; there is no
//! per-access rebuild.

use std::fmt;
use std::hash::Hash;

use crate::ds::LazyMinHeap;
use crate::traits::EvictionPolicy;

/// Eviction rank of one key. Field order gives the lexicographic ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LfuScore {
    pub frequency: u64,
    pub last_access: u64,
}

/// Frequency/recency ranking over the keys of one cache.
///
/// ```
/// use cacheward::policy::LfuPolicy;
/// use cacheward::traits::EvictionPolicy;
///
/// let mut lfu = LfuPolicy::new(2);
/// lfu.admit("hot");
/// lfu.admit("cold");
/// lfu.touch(&"hot");
/// assert_eq!(lfu.admit("new"), Some("cold"));
/// assert_eq!(lfu.frequency(&"hot"), Some(2));
/// ```
pub struct LfuPolicy<K> {
    heap: LazyMinHeap<K, LfuScore>,
    tick: u64,
    capacity: usize,
}

impl<K> LfuPolicy<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates a policy for `capacity` keys. Zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            heap: LazyMinHeap::with_capacity(capacity),
            tick: 0,
            capacity,
        }
    }

    /// Access count of `key` since it was admitted.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.heap.score_of(key).map(|score| score.frequency)
    }

    pub fn score(&self, key: &K) -> Option<LfuScore> {
        self.heap.score_of(key).copied()
    }

    /// Key that the next admission into a full policy would evict.
    ///
    /// Takes `&mut self` because stale heap entries are discarded on the way.
    pub fn peek_victim(&mut self) -> Option<&K> {
        self.heap.peek_best().map(|(key, _)| key)
    }

    fn next_tick(&mut self) -> u64 {
        self.tick = self.tick.wrapping_add(1);
        self.tick
    }

    fn record_access(&mut self, key: &K, previous: LfuScore) {
        let score = LfuScore {
            frequency: previous.frequency.saturating_add(1),
            last_access: self.next_tick(),
        };
        self.heap.update(key.clone(), score);
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.heap.debug_validate_invariants();
        assert!(self.heap.len() <= self.capacity);
    }
}

impl<K> EvictionPolicy<K> for LfuPolicy<K>
where
    K: Eq + Hash + Clone,
{
    fn touch(&mut self, key: &K) -> bool {
        match self.heap.score_of(key).copied() {
            Some(previous) => {
                self.record_access(key, previous);
                true
            },
            None => false,
        }
    }

    fn admit(&mut self, key: K) -> Option<K> {
        if let Some(previous) = self.heap.score_of(&key).copied() {
            self.record_access(&key, previous);
            return None;
        }

        let evicted = if self.heap.len() >= self.capacity {
            self.heap.pop_best().map(|(victim, _)| victim)
        } else {
            None
        };

        let score = LfuScore {
            frequency: 1,
            last_access: self.next_tick(),
        };
        self.heap.update(key, score);
        evicted
    }

    fn remove(&mut self, key: &K) -> bool {
        self.heap.remove(key).is_some()
    }

    fn contains(&self, key: &K) -> bool {
        self.heap.contains(key)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn clear(&mut self) {
        self.heap.clear();
        self.tick = 0;
    }
}

impl<K> fmt::Debug for LfuPolicy<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LfuPolicy")
            .field("tick", &self.tick)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
