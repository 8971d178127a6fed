//! Eviction policies.
//!
//! | Policy        | Victim                                   | Touch cost        |
//! |---------------|------------------------------------------|-------------------|
//! | [`LruPolicy`] | least recently accessed key              | O(1)              |
//! | [`LfuPolicy`] | lowest `(frequency, last_access)` pair   | amortized O(log n)|
//!
//! [`Policy`] is the closed variant the cache core stores by default, so a
//! cache can choose its policy at runtime without boxing.

pub mod lfu;
pub mod lru;

use std::hash::Hash;

pub use lfu::{LfuPolicy, LfuScore};
pub use lru::LruPolicy;

use crate::traits::EvictionPolicy;

/// Which eviction policy a cache uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PolicyKind {
    /// Least Recently Used eviction.
    #[default]
    Lru,
    /// Least Frequently Used eviction, oldest access breaking ties.
    Lfu,
}

/// Runtime-selected eviction policy.
#[derive(Debug)]
pub enum Policy<K> {
    Lru(LruPolicy<K>),
    Lfu(LfuPolicy<K>),
}

impl<K> Policy<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(kind: PolicyKind, capacity: usize) -> Self {
        match kind {
            PolicyKind::Lru => Policy::Lru(LruPolicy::new(capacity)),
            PolicyKind::Lfu => Policy::Lfu(LfuPolicy::new(capacity)),
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Policy::Lru(_) => PolicyKind::Lru,
            Policy::Lfu(_) => PolicyKind::Lfu,
        }
    }
}

impl<K> EvictionPolicy<K> for Policy<K>
where
    K: Eq + Hash + Clone,
{
    #[inline]
    fn touch(&mut self, key: &K) -> bool {
        match self {
            Policy::Lru(lru) => lru.touch(key),
            Policy::Lfu(lfu) => lfu.touch(key),
        }
    }

    #[inline]
    fn admit(&mut self, key: K) -> Option<K> {
        match self {
            Policy::Lru(lru) => lru.admit(key),
            Policy::Lfu(lfu) => lfu.admit(key),
        }
    }

    fn remove(&mut self, key: &K) -> bool {
        match self {
            Policy::Lru(lru) => lru.remove(key),
            Policy::Lfu(lfu) => lfu.remove(key),
        }
    }

    fn contains(&self, key: &K) -> bool {
        match self {
            Policy::Lru(lru) => lru.contains(key),
            Policy::Lfu(lfu) => lfu.contains(key),
        }
    }

    fn len(&self) -> usize {
        match self {
            Policy::Lru(lru) => lru.len(),
            Policy::Lfu(lfu) => lfu.len(),
        }
    }

    fn capacity(&self) -> usize {
        match self {
            Policy::Lru(lru) => lru.capacity(),
            Policy::Lfu(lfu) => lfu.capacity(),
        }
    }

    fn clear(&mut self) {
        match self {
            Policy::Lru(lru) => lru.clear(),
            Policy::Lfu(lfu) => lfu.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_constructor() {
        for kind in [PolicyKind::Lru, PolicyKind::Lfu] {
            let policy: Policy<u32> = Policy::new(kind, 4);
            assert_eq!(policy.kind(), kind);
            assert_eq!(policy.capacity(), 4);
            assert!(policy.is_empty());
        }
    }

    #[test]
    fn variants_disagree_on_victim() {
        // a is touched often but long ago; b is touched once, recently.
        let mut lru: Policy<&str> = Policy::new(PolicyKind::Lru, 2);
        let mut lfu: Policy<&str> = Policy::new(PolicyKind::Lfu, 2);
        for policy in [&mut lru, &mut lfu] {
            policy.admit("a");
            policy.touch(&"a");
            policy.touch(&"a");
            policy.admit("b");
        }
        assert_eq!(lru.admit("c"), Some("a"));
        assert_eq!(lfu.admit("c"), Some("b"));
    }
}
