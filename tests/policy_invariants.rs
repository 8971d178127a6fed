// ==============================================
// CROSS-POLICY INVARIANT TESTS (integration)
// ==============================================
//
// Behaviour every cache must share regardless of eviction policy. Random
// workloads use a fixed seed so failures reproduce.

use cacheward::core::CacheCore;
use cacheward::error::ConfigError;
use cacheward::policy::PolicyKind;
use cacheward::stats::CacheStats;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const POLICIES: [PolicyKind; 2] = [PolicyKind::Lru, PolicyKind::Lfu];

// ==============================================
// Capacity
// ==============================================

mod capacity {
    use super::*;

    #[test]
    fn capacity_zero_is_invalid_configuration() {
        for kind in POLICIES {
            let err = CacheCore::<u64, u64>::try_new(kind, 0).unwrap_err();
            assert_eq!(err, ConfigError::ZeroCapacity, "{kind:?}");
        }
    }

    #[test]
    fn size_never_exceeds_capacity_under_random_puts() {
        for kind in POLICIES {
            for capacity in [1usize, 2, 7, 64] {
                let mut rng = StdRng::seed_from_u64(0x5eed ^ capacity as u64);
                let mut cache = CacheCore::try_new(kind, capacity).unwrap();

                for _ in 0..5_000 {
                    let key: u16 = rng.gen_range(0..256);
                    match rng.gen_range(0..10) {
                        0..=5 => {
                            cache.put(key, u32::from(key));
                        },
                        6..=8 => {
                            cache.get(&key);
                        },
                        _ => {
                            cache.remove(&key);
                        },
                    }
                    assert!(
                        cache.size() <= capacity,
                        "{kind:?} size {} over capacity {capacity}",
                        cache.size()
                    );
                }
                cache.check_invariants().unwrap();
            }
        }
    }

    #[test]
    fn eviction_only_when_full_and_key_new() {
        for kind in POLICIES {
            let mut cache = CacheCore::try_new(kind, 4).unwrap();
            for key in 0..4u32 {
                assert_eq!(cache.put(key, key), None, "{kind:?} evicted before full");
            }
            for key in 0..4u32 {
                assert_eq!(cache.put(key, key + 100), None, "{kind:?} evicted on overwrite");
            }
            let evicted = cache.put(99, 99);
            assert!(evicted.is_some(), "{kind:?} did not evict when full");
            assert!(!cache.contains(&evicted.unwrap()));
            assert_eq!(cache.size(), 4);
        }
    }
}

// ==============================================
// Eviction order
// ==============================================

mod eviction_order {
    use super::*;

    #[test]
    fn lru_get_protects_key_from_eviction() {
        let mut cache = CacheCore::try_new(PolicyKind::Lru, 3).unwrap();
        cache.put('a', 1);
        cache.put('b', 2);
        cache.put('c', 3);
        cache.get(&'a');

        assert_eq!(cache.put('d', 4), Some('b'));
        assert_eq!(cache.put('e', 5), Some('c'));
        assert_eq!(cache.put('f', 6), Some('a'));
    }

    #[test]
    fn lfu_tie_break_evicts_oldest_of_lowest_frequency() {
        let mut cache = CacheCore::try_new(PolicyKind::Lfu, 3).unwrap();
        cache.put('x', 1);
        cache.put('y', 2);
        cache.put('z', 3);
        cache.get(&'x');
        cache.get(&'x');
        cache.get(&'y');

        assert_eq!(cache.put('w', 4), Some('z'));
        assert!(cache.contains(&'y'));
        assert!(cache.contains(&'x'));
    }

    #[test]
    fn lfu_equal_frequency_new_keys_evict_in_insertion_order() {
        let mut cache = CacheCore::try_new(PolicyKind::Lfu, 3).unwrap();
        cache.put(1, ());
        cache.put(2, ());
        cache.put(3, ());
        assert_eq!(cache.put(4, ()), Some(1));
        assert_eq!(cache.put(5, ()), Some(2));
    }
}

// ==============================================
// Overwrite and stats
// ==============================================

mod overwrite_and_stats {
    use super::*;

    #[test]
    fn overwrite_is_idempotent_for_size() {
        for kind in POLICIES {
            let mut cache = CacheCore::try_new(kind, 2).unwrap();
            cache.put("k", "v1");
            cache.put("j", "w");
            assert_eq!(cache.put("k", "v2"), None);
            assert_eq!(cache.get(&"k"), Some("v2"));
            assert_eq!(cache.get(&"j"), Some("w"));
            assert_eq!(cache.size(), 2);
        }
    }

    #[test]
    fn hit_rate_matches_counted_hits_and_misses() {
        for kind in POLICIES {
            let mut rng = StdRng::seed_from_u64(42);
            let mut cache = CacheCore::try_new(kind, 16).unwrap();
            let (mut hits, mut misses) = (0u64, 0u64);

            for _ in 0..2_000 {
                let key: u8 = rng.gen_range(0..32);
                if rng.gen_bool(0.5) {
                    cache.put(key, key);
                } else if cache.get(&key).is_some() {
                    hits += 1;
                } else {
                    misses += 1;
                }
            }

            let stats = cache.stats();
            assert_eq!(stats.hits, hits);
            assert_eq!(stats.misses, misses);
            assert_eq!(stats.hit_rate, hits as f64 / (hits + misses) as f64);
        }
    }

    #[test]
    fn clear_resets_everything() {
        for kind in POLICIES {
            let mut cache = CacheCore::try_new(kind, 5).unwrap();
            for key in 0..10 {
                cache.put(key, key);
                cache.get(&(key / 2));
            }
            cache.clear();
            assert_eq!(cache.size(), 0);
            assert_eq!(cache.stats(), CacheStats::new(0, 0, 0, 5));
            assert_eq!(cache.stats().hit_rate, 0.0);

            // Usable again after clear.
            cache.put(1, 1);
            assert_eq!(cache.get(&1), Some(1));
            cache.check_invariants().unwrap();
        }
    }
}
