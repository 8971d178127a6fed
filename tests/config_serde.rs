// ==============================================
// CONFIGURATION SERIALIZATION TESTS (integration)
// ==============================================
#![cfg(feature = "serde")]

use cacheward::builder::{CacheConfig, CacheFactory, Concurrency};
use cacheward::policy::PolicyKind;
use cacheward::stats::CacheStats;
use cacheward::traits::ConcurrentCache;

#[test]
fn config_loads_from_json_with_defaults() {
    let config: CacheConfig = serde_json::from_str(r#"{ "capacity": 256 }"#).unwrap();
    assert_eq!(config, CacheConfig::lru(256));
}

#[test]
fn config_reads_policy_and_sharding() {
    let json = r#"{
        "policy": "lfu",
        "capacity": 1000,
        "concurrency": { "sharded": { "shards": 8 } },
        "stampede_safe": true
    }"#;
    let config: CacheConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.policy, PolicyKind::Lfu);
    assert_eq!(config.concurrency, Concurrency::Sharded { shards: 8 });
    assert!(config.stampede_safe);

    let cache = CacheFactory::create_shared::<String, u64, String>(&config).unwrap();
    assert!(cache.is_stampede_safe());
    assert_eq!(cache.concurrency(), Concurrency::Sharded { shards: 8 });
    assert_eq!(cache.capacity(), 1000);
}

#[test]
fn loaded_config_is_still_validated() {
    let config: CacheConfig =
        serde_json::from_str(r#"{ "capacity": 0, "concurrency": "guarded" }"#).unwrap();
    assert!(CacheFactory::create::<u8, u8, String>(&config).is_err());
}

#[test]
fn stats_serialize_with_hit_rate() {
    let stats = CacheStats::new(3, 1, 2, 10);
    let value = serde_json::to_value(stats).unwrap();
    assert_eq!(value["hits"], 3);
    assert_eq!(value["hit_rate"], 0.75);
    assert_eq!(value["capacity"], 10);
}
