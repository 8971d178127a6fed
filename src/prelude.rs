pub use crate::builder::{Cache, CacheBuilder, CacheConfig, CacheFactory, Concurrency, SharedCache};
pub use crate::core::CacheCore;
pub use crate::error::{ConfigError, InvariantError, LoadError};
pub use crate::guard::{GuardedCache, ShardedCache};
pub use crate::policy::{LfuPolicy, LruPolicy, Policy, PolicyKind};
pub use crate::stampede::StampedeCoordinator;
pub use crate::stats::CacheStats;
pub use crate::traits::{ConcurrentCache, EvictionPolicy};
