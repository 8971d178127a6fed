//! Cache statistics snapshot.
//!
//! Counters live inside [`CacheCore`](crate::core::CacheCore) and are only
//! touched under whatever guard owns the core; this type is the detached
//! copy handed to callers.

use std::iter::Sum;

/// Point-in-time view of a cache's hit/miss counters and occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheStats {
    /// Lookups that found the key.
    pub hits: u64,

    /// Lookups that did not.
    pub misses: u64,

    /// `hits / (hits + misses)`, or `0.0` before the first lookup.
    pub hit_rate: f64,

    /// Entries currently stored.
    pub size: usize,

    /// Maximum number of entries.
    pub capacity: usize,
}

impl CacheStats {
    pub fn new(hits: u64, misses: u64, size: usize, capacity: usize) -> Self {
        Self {
            hits,
            misses,
            hit_rate: ratio(hits, hits.saturating_add(misses)),
            size,
            capacity,
        }
    }

    /// Calculate miss rate (misses / total accesses)
    pub fn miss_rate(&self) -> f64 {
        ratio(self.misses, self.total_accesses())
    }

    /// Total number of access operations (hits + misses)
    pub fn total_accesses(&self) -> u64 {
        self.hits.saturating_add(self.misses)
    }

    /// Adds another snapshot's counters and occupancy to this one.
    pub fn combine(self, other: CacheStats) -> CacheStats {
        CacheStats::new(
            self.hits.saturating_add(other.hits),
            self.misses.saturating_add(other.misses),
            self.size + other.size,
            self.capacity + other.capacity,
        )
    }
}

impl Sum for CacheStats {
    fn sum<I: Iterator<Item = CacheStats>>(iter: I) -> Self {
        iter.fold(CacheStats::default(), CacheStats::combine)
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_have_zero_rates() {
        let stats = CacheStats::new(0, 0, 0, 8);
        assert_eq!(stats.hit_rate, 0.0);
        assert_eq!(stats.miss_rate(), 0.0);
        assert_eq!(stats.total_accesses(), 0);
    }

    #[test]
    fn hit_rate_is_hits_over_accesses() {
        let stats = CacheStats::new(3, 1, 2, 4);
        assert_eq!(stats.hit_rate, 0.75);
        assert_eq!(stats.miss_rate(), 0.25);
        assert_eq!(stats.total_accesses(), 4);
    }

    #[test]
    fn sum_recomputes_hit_rate() {
        let shards = [CacheStats::new(1, 0, 1, 2), CacheStats::new(0, 3, 2, 2)];
        let total: CacheStats = shards.into_iter().sum();
        assert_eq!(total.hits, 1);
        assert_eq!(total.misses, 3);
        assert_eq!(total.hit_rate, 0.25);
        assert_eq!(total.size, 3);
        assert_eq!(total.capacity, 4);
    }
}
