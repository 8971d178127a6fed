//! Least-recently-used key tracking.
//!
//! ## Architecture
//!
//! ```text
//!   index: FxHashMap<K, SlotId>          order: IntrusiveList<K>
//!   ┌─────┬────────┐
//!   │ "a" │ id_3   │──┐        MRU                              LRU
//!   │ "b" │ id_1   │──┼──►  head ─► [c] ◄──► [a] ◄──► [b] ◄── tail
//!   │ "c" │ id_2   │──┘
//!   └─────┴────────┘
//! ```
//!
//! `touch` and re-`admit` splice the key's node to the head; admitting a new
//! key into a full policy pops the tail first. Every operation is one hash
//! lookup plus a constant number of link updates.

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::{IntrusiveList, SlotId};
use crate::traits::EvictionPolicy;

/// Recency order over the keys of one cache.
///
/// ```
/// use cacheward::policy::LruPolicy;
/// use cacheward::traits::EvictionPolicy;
///
/// let mut lru = LruPolicy::new(2);
/// assert_eq!(lru.admit("a"), None);
/// assert_eq!(lru.admit("b"), None);
/// assert!(lru.touch(&"a"));
/// assert_eq!(lru.admit("c"), Some("b"));
/// ```
pub struct LruPolicy<K> {
    order: IntrusiveList<K>,
    index: FxHashMap<K, SlotId>,
    capacity: usize,
}

impl<K> LruPolicy<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates a policy for `capacity` keys. Zero is treated as one;
    /// [`CacheCore::try_new`](crate::core::CacheCore::try_new) rejects it
    /// before it gets here.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: IntrusiveList::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            capacity,
        }
    }

    /// Key that the next admission into a full policy would evict.
    pub fn peek_lru(&self) -> Option<&K> {
        self.order.back()
    }

    /// Keys from most to least recently used.
    pub fn iter_mru(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    fn evict_lru(&mut self) -> Option<K> {
        let victim = self.order.pop_back()?;
        self.index.remove(&victim);
        Some(victim)
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.order.debug_validate_invariants();
        assert_eq!(self.order.len(), self.index.len());
        assert!(self.index.len() <= self.capacity);
        for key in self.order.iter() {
            assert!(self.index.contains_key(key), "listed key missing from index");
        }
    }
}

impl<K> EvictionPolicy<K> for LruPolicy<K>
where
    K: Eq + Hash + Clone,
{
    fn touch(&mut self, key: &K) -> bool {
        match self.index.get(key) {
            Some(&id) => self.order.move_to_front(id),
            None => false,
        }
    }

    fn admit(&mut self, key: K) -> Option<K> {
        if let Some(&id) = self.index.get(&key) {
            self.order.move_to_front(id);
            return None;
        }

        let evicted = if self.index.len() >= self.capacity {
            self.evict_lru()
        } else {
            None
        };

        let id = self.order.push_front(key.clone());
        self.index.insert(key, id);
        evicted
    }

    fn remove(&mut self, key: &K) -> bool {
        match self.index.remove(key) {
            Some(id) => self.order.remove(id).is_some(),
            None => false,
        }
    }

    fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }
}

impl<K> fmt::Debug for LruPolicy<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruPolicy")
            .field("len", &self.index.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
