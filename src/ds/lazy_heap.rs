//! Min-heap keyed by a score map, with lazy deletion.
//!
//! `scores` is the source of truth. Every [`update`](LazyMinHeap::update)
//! pushes a fresh heap entry and leaves the previous one behind as stale;
//! [`pop_best`](LazyMinHeap::pop_best) and [`peek_best`](LazyMinHeap::peek_best)
//! discard entries whose score no longer matches the map.
//!
//! ```text
//!   scores: { "a": 3, "b": 7 }
//!
//!   heap (min first):
//!     ("a", 3, seq=4)   live
//!     ("a", 1, seq=1)   stale, scores["a"] != 1
//!     ("b", 7, seq=2)   live
//! ```
//!
//! Stale entries are bounded: once the heap holds more than
//! `COMPACT_FACTOR * len()` entries it is rebuilt from `scores`. Each rebuild
//! is O(n log n) and happens at most once per `n * (COMPACT_FACTOR - 1)`
//! updates, so `update` stays amortized O(log n).
//!
//! | Operation   | Complexity           |
//! |-------------|----------------------|
//! | `update`    | amortized O(log n)   |
//! | `remove`    | O(1)                 |
//! | `pop_best`  | amortized O(log n)   |
//! | `peek_best` | amortized O(log n)   |
//! | `score_of`  | O(1)                 |

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::hash::Hash;

use rustc_hash::FxHashMap;

const COMPACT_FACTOR: usize = 4;

#[derive(Debug, Clone)]
struct HeapEntry<K, S> {
    score: S,
    seq: u64,
    key: K,
}

impl<K, S: Ord> PartialEq for HeapEntry<K, S> {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.seq == other.seq
    }
}

impl<K, S: Ord> Eq for HeapEntry<K, S> {}

impl<K, S: Ord> PartialOrd for HeapEntry<K, S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K, S: Ord> Ord for HeapEntry<K, S> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Min-heap over `(key, score)` pairs with O(1) removal.
///
/// Equal scores pop in insertion order.
///
/// ```
/// use cacheward::ds::LazyMinHeap;
///
/// let mut heap: LazyMinHeap<&str, u32> = LazyMinHeap::new();
/// heap.update("a", 5);
/// heap.update("b", 2);
/// heap.update("a", 1);
///
/// assert_eq!(heap.pop_best(), Some(("a", 1)));
/// assert_eq!(heap.pop_best(), Some(("b", 2)));
/// assert_eq!(heap.pop_best(), None);
/// ```
#[derive(Debug)]
pub struct LazyMinHeap<K, S> {
    scores: FxHashMap<K, S>,
    heap: BinaryHeap<Reverse<HeapEntry<K, S>>>,
    seq: u64,
}

impl<K, S> LazyMinHeap<K, S>
where
    K: Eq + Hash + Clone,
    S: Ord + Clone,
{
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scores: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            heap: BinaryHeap::with_capacity(capacity),
            seq: 0,
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Heap length including stale entries.
    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.scores.contains_key(key)
    }

    pub fn score_of(&self, key: &K) -> Option<&S> {
        self.scores.get(key)
    }

    /// Sets `key`'s score, returning the previous one.
    pub fn update(&mut self, key: K, score: S) -> Option<S> {
        let previous = self.scores.insert(key.clone(), score.clone());
        self.push_entry(key, score);
        self.maybe_compact();
        previous
    }

    /// Drops `key` from the live set; its heap entries go stale.
    pub fn remove(&mut self, key: &K) -> Option<S> {
        let removed = self.scores.remove(key);
        if removed.is_some() {
            self.maybe_compact();
        }
        removed
    }

    /// Removes and returns the live entry with the smallest score.
    pub fn pop_best(&mut self) -> Option<(K, S)> {
        loop {
            let Reverse(entry) = self.heap.pop()?;
            if self.is_live(&entry) {
                self.scores.remove(&entry.key);
                return Some((entry.key, entry.score));
            }
        }
    }

    /// Returns the live entry with the smallest score without removing it.
    ///
    /// Stale entries found on top of the heap are discarded on the way.
    pub fn peek_best(&mut self) -> Option<(&K, &S)> {
        while let Some(Reverse(top)) = self.heap.peek() {
            if self.is_live(top) {
                break;
            }
            self.heap.pop();
        }
        self.heap
            .peek()
            .map(|Reverse(entry)| (&entry.key, &entry.score))
    }

    /// Rebuilds the heap from the score map, dropping every stale entry.
    pub fn rebuild(&mut self) {
        self.heap.clear();
        let entries: Vec<(K, S)> = self
            .scores
            .iter()
            .map(|(key, score)| (key.clone(), score.clone()))
            .collect();
        for (key, score) in entries {
            self.push_entry(key, score);
        }
    }

    pub fn clear(&mut self) {
        self.scores.clear();
        self.heap.clear();
        self.seq = 0;
    }

    fn is_live(&self, entry: &HeapEntry<K, S>) -> bool {
        self.scores
            .get(&entry.key)
            .is_some_and(|score| *score == entry.score)
    }

    fn maybe_compact(&mut self) {
        let limit = self.scores.len().max(1).saturating_mul(COMPACT_FACTOR);
        if self.heap.len() > limit {
            self.rebuild();
        }
    }

    fn push_entry(&mut self, key: K, score: S) {
        let entry = HeapEntry {
            score,
            seq: self.seq,
            key,
        };
        self.seq = self.seq.wrapping_add(1);
        self.heap.push(Reverse(entry));
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let live = self.heap.iter().filter(|Reverse(e)| self.is_live(e)).count();
        assert!(live >= self.scores.len(), "live key missing a heap entry");
    }
}

impl<K, S> Default for LazyMinHeap<K, S>
where
    K: Eq + Hash + Clone,
    S: Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_entries_are_skipped() {
        let mut heap = LazyMinHeap::new();
        heap.update("a", 5);
        heap.update("a", 2);
        heap.update("b", 3);

        assert_eq!(heap.pop_best(), Some(("a", 2)));
        assert_eq!(heap.pop_best(), Some(("b", 3)));
        assert_eq!(heap.pop_best(), None);
    }

    #[test]
    fn removed_key_never_pops() {
        let mut heap = LazyMinHeap::new();
        heap.update("a", 2);
        heap.update("b", 1);
        assert_eq!(heap.remove(&"b"), Some(1));
        assert_eq!(heap.remove(&"b"), None);
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.pop_best(), Some(("a", 2)));
        assert!(heap.is_empty());
    }

    #[test]
    fn equal_scores_pop_in_insertion_order() {
        let mut heap = LazyMinHeap::new();
        heap.update("a", 1);
        heap.update("b", 1);
        heap.update("c", 1);
        assert_eq!(heap.pop_best(), Some(("a", 1)));
        assert_eq!(heap.pop_best(), Some(("b", 1)));
        assert_eq!(heap.pop_best(), Some(("c", 1)));
    }

    #[test]
    fn peek_best_discards_stale_top_without_removing_live() {
        let mut heap = LazyMinHeap::new();
        heap.update("a", 1);
        heap.update("b", 4);
        heap.update("a", 9);

        assert_eq!(heap.peek_best(), Some((&"b", &4)));
        assert_eq!(heap.len(), 2);
        assert_eq!(heap.pop_best(), Some(("b", 4)));
    }

    #[test]
    fn repeated_updates_stay_bounded() {
        let mut heap = LazyMinHeap::new();
        heap.update("x", 0u64);
        for i in 1..1_000u64 {
            heap.update("hot", i);
            heap.debug_validate_invariants();
        }
        assert_eq!(heap.len(), 2);
        assert!(heap.heap_len() <= 2 * COMPACT_FACTOR);
        assert_eq!(heap.pop_best(), Some(("x", 0)));
    }

    #[test]
    fn clear_drops_everything() {
        let mut heap = LazyMinHeap::with_capacity(8);
        heap.update(1, 1);
        heap.update(2, 2);
        heap.clear();
        assert!(heap.is_empty());
        assert_eq!(heap.heap_len(), 0);
        assert_eq!(heap.peek_best(), None);
    }
}
