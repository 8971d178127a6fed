//! cacheward: fixed-capacity LRU/LFU caches with lock guarding, sharding and
//! stampede-safe loading.
//!
//! ```text
//!   CacheFactory / CacheBuilder
//!            │
//!            ▼
//!   StampedeCoordinator ──► GuardedCache | ShardedCache ──► CacheCore ──► Policy
//!   (one producer per key)  (mutex per core)                (store+stats) (LRU | LFU)
//! ```
//!
//! Start with [`builder::CacheBuilder`] or [`core::CacheCore`]; the
//! [`prelude`] re-exports the common types.

pub mod builder;
pub mod core;
pub mod ds;
pub mod error;
pub mod guard;
pub mod policy;
pub mod prelude;
pub mod stampede;
pub mod stats;
pub mod traits;
