// ==============================================
// GUARDED / SHARDED CONCURRENCY TESTS (integration)
// ==============================================
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use cacheward::guard::{GuardedCache, ShardedCache};
use cacheward::policy::PolicyKind;
use cacheward::traits::ConcurrentCache;

const THREADS: u64 = 8;
const OPS_PER_THREAD: u64 = 2_000;

/// Mixed get/put/remove from many threads against any shared cache; returns
/// the total number of lookups performed.
fn hammer<C>(cache: Arc<C>) -> u64
where
    C: ConcurrentCache<u64, u64> + 'static,
{
    let lookups = Arc::new(AtomicU64::new(0));
    let handles: Vec<_> = (0..THREADS)
        .map(|thread_id| {
            let cache = Arc::clone(&cache);
            let lookups = Arc::clone(&lookups);
            thread::spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    let key = (thread_id * 31 + i) % 200;
                    match i % 5 {
                        0 | 1 => {
                            cache.put(key, key * 2);
                        },
                        2 | 3 => {
                            if let Some(value) = cache.get(&key) {
                                assert_eq!(value, key * 2, "value for {key} torn");
                            }
                            lookups.fetch_add(1, Ordering::Relaxed);
                        },
                        _ => {
                            cache.remove(&key);
                        },
                    }
                    assert!(cache.size() <= cache.capacity());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    lookups.load(Ordering::Relaxed)
}

mod guarded {
    use super::*;

    #[test]
    fn concurrent_mixed_ops_keep_invariants() {
        for kind in [PolicyKind::Lru, PolicyKind::Lfu] {
            let cache = Arc::new(GuardedCache::<u64, u64>::try_new(kind, 64).unwrap());
            let lookups = hammer(Arc::clone(&cache));

            cache.check_invariants().unwrap();
            assert!(cache.size() <= 64);
            assert_eq!(cache.stats().total_accesses(), lookups);
        }
    }

    #[test]
    fn concurrent_puts_of_distinct_keys_all_land() {
        let cache = Arc::new(GuardedCache::try_new(PolicyKind::Lru, 1_000).unwrap());
        let handles: Vec<_> = (0..THREADS)
            .map(|thread_id| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..100 {
                        cache.put(thread_id * 100 + i, i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.size(), (THREADS * 100) as usize);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn clear_races_with_writers_without_corruption() {
        let cache = Arc::new(GuardedCache::<u64, u64>::try_new(PolicyKind::Lfu, 32).unwrap());
        let writer = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..5_000u64 {
                    cache.put(i % 100, i);
                    cache.get(&(i % 7));
                }
            })
        };
        for _ in 0..50 {
            cache.clear();
            cache.check_invariants().unwrap();
        }
        writer.join().unwrap();
        cache.check_invariants().unwrap();
    }
}

mod sharded {
    use super::*;

    #[test]
    fn concurrent_mixed_ops_keep_invariants() {
        for kind in [PolicyKind::Lru, PolicyKind::Lfu] {
            let cache = Arc::new(ShardedCache::<u64, u64>::try_new(kind, 64, 4).unwrap());
            let lookups = hammer(Arc::clone(&cache));

            cache.check_invariants().unwrap();
            assert!(cache.size() <= cache.capacity());
            assert_eq!(cache.stats().total_accesses(), lookups);
        }
    }

    #[test]
    fn same_key_writes_are_totally_ordered() {
        // Every writer stores its own id; the survivor must be one of them.
        let cache = Arc::new(ShardedCache::try_new(PolicyKind::Lru, 16, 4).unwrap());
        let handles: Vec<_> = (0..THREADS)
            .map(|thread_id| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for _ in 0..500 {
                        cache.put(7u64, thread_id);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let last = cache.get(&7).unwrap();
        assert!(last < THREADS);
        assert_eq!(cache.size(), 1);
    }
}
