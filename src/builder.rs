//! Cache configuration and assembly.
//!
//! [`CacheFactory::create`] turns a [`CacheConfig`] into a ready-to-use
//! [`Cache`]: policy, concurrency guard and (optionally) stampede
//! coordination wired together. [`CacheBuilder`] is the fluent front end.
//!
//! | `concurrency`          | `stampede_safe` | Handle                                         |
//! |------------------------|-----------------|------------------------------------------------|
//! | `None`                 | either          | `Cache::Local(CacheCore)`, `&mut self` ops     |
//! | `Guarded`              | `false`         | `Cache::Shared`, one mutex                     |
//! | `Guarded`              | `true`          | `Cache::Shared`, one mutex + coordinator       |
//! | `Sharded { shards }`   | `false`         | `Cache::Shared`, N mutexes                     |
//! | `Sharded { shards }`   | `true`          | `Cache::Shared`, N mutexes + coordinator       |
//!
//! A local cache cannot be reached by two callers at once, so
//! `get_or_compute` on it already runs the producer at most once per miss;
//! `stampede_safe` changes nothing there.
//!
//! ## Example
//!
//! ```rust
//! use cacheward::builder::{CacheBuilder, CacheConfig, CacheFactory};
//!
//! let mut local = CacheFactory::create::<u64, String, std::convert::Infallible>(
//!     &CacheConfig::lru(100),
//! )
//! .unwrap();
//! local.put(1, "hello".to_string());
//! assert_eq!(local.get(&1).as_deref(), Some("hello"));
//!
//! let shared = CacheBuilder::new(1_000)
//!     .lfu()
//!     .sharded(8)
//!     .stampede_safe(true)
//!     .try_build_shared::<u64, String, std::io::ErrorKind>()
//!     .unwrap();
//! let value = shared.get_or_compute(7, |key| Ok(format!("row {key}"))).unwrap();
//! assert_eq!(value, "row 7");
//! ```

use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::core::CacheCore;
use crate::error::{ConfigError, LoadError};
use crate::guard::{GuardedCache, ShardedCache};
use crate::policy::PolicyKind;
use crate::stampede::StampedeCoordinator;
use crate::stats::CacheStats;
use crate::traits::ConcurrentCache;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How a cache is protected against concurrent access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Concurrency {
    /// Single owner, no locking.
    #[default]
    None,
    /// One mutex around the whole cache.
    Guarded,
    /// `shards` independently locked cores; capacity is enforced per shard.
    Sharded { shards: usize },
}

/// Everything [`CacheFactory`] needs to assemble a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub policy: PolicyKind,

    pub capacity: usize,

    #[cfg_attr(feature = "serde", serde(default))]
    pub concurrency: Concurrency,

    /// Coordinate concurrent misses so each key's producer runs once.
    #[cfg_attr(feature = "serde", serde(default))]
    pub stampede_safe: bool,
}

impl CacheConfig {
    pub fn new(policy: PolicyKind, capacity: usize) -> Self {
        Self {
            policy,
            capacity,
            concurrency: Concurrency::None,
            stampede_safe: false,
        }
    }

    /// Quick preset for a single-owner LRU cache
    pub fn lru(capacity: usize) -> Self {
        Self::new(PolicyKind::Lru, capacity)
    }

    /// Quick preset for a single-owner LFU cache
    pub fn lfu(capacity: usize) -> Self {
        Self::new(PolicyKind::Lfu, capacity)
    }

    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_stampede_safe(mut self, enabled: bool) -> Self {
        self.stampede_safe = enabled;
        self
    }

    /// Checks capacity and shard count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if let Concurrency::Sharded { shards: 0 } = self.concurrency {
            return Err(ConfigError::ZeroShards);
        }
        Ok(())
    }
}

/// Fluent builder over [`CacheConfig`].
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    config: CacheConfig,
}

impl CacheBuilder {
    /// Starts from a single-owner LRU cache of `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            config: CacheConfig::lru(capacity),
        }
    }

    pub fn policy(mut self, policy: PolicyKind) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn lru(self) -> Self {
        self.policy(PolicyKind::Lru)
    }

    pub fn lfu(self) -> Self {
        self.policy(PolicyKind::Lfu)
    }

    pub fn concurrency(mut self, concurrency: Concurrency) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    pub fn guarded(self) -> Self {
        self.concurrency(Concurrency::Guarded)
    }

    pub fn sharded(self, shards: usize) -> Self {
        self.concurrency(Concurrency::Sharded { shards })
    }

    pub fn stampede_safe(mut self, enabled: bool) -> Self {
        self.config.stampede_safe = enabled;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Builds the cache described so far.
    pub fn try_build<K, V, E>(self) -> Result<Cache<K, V, E>, ConfigError>
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Clone + Send + 'static,
        E: Clone + Send,
    {
        CacheFactory::create(&self.config)
    }

    /// Builds a thread-safe handle; `Concurrency::None` is promoted to
    /// `Guarded`.
    pub fn try_build_shared<K, V, E>(self) -> Result<SharedCache<K, V, E>, ConfigError>
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Clone + Send + 'static,
        E: Clone + Send,
    {
        CacheFactory::create_shared(&self.config)
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Assembles caches from [`CacheConfig`]. Allocation is the only side effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheFactory;

impl CacheFactory {
    /// Builds the cache `config` describes.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] when capacity or shard count is zero.
    pub fn create<K, V, E>(config: &CacheConfig) -> Result<Cache<K, V, E>, ConfigError>
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Clone + Send + 'static,
        E: Clone + Send,
    {
        config.validate()?;
        match config.concurrency {
            Concurrency::None => {
                let core = CacheCore::try_new(config.policy, config.capacity)?;
                debug!(policy = ?config.policy, capacity = config.capacity, "created local cache");
                Ok(Cache::Local(core))
            },
            Concurrency::Guarded | Concurrency::Sharded { .. } => {
                Self::create_shared(config).map(Cache::Shared)
            },
        }
    }

    /// Builds a thread-safe handle for `config`, treating
    /// `Concurrency::None` as `Guarded`.
    pub fn create_shared<K, V, E>(config: &CacheConfig) -> Result<SharedCache<K, V, E>, ConfigError>
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Clone + Send + 'static,
        E: Clone + Send,
    {
        config.validate()?;
        let backend: Backend<K, V> = match config.concurrency {
            Concurrency::None | Concurrency::Guarded => {
                Box::new(GuardedCache::<K, V>::try_new(config.policy, config.capacity)?)
            },
            Concurrency::Sharded { shards } => {
                Box::new(ShardedCache::<K, V>::try_new(config.policy, config.capacity, shards)?)
            },
        };
        let concurrency = match config.concurrency {
            Concurrency::None => Concurrency::Guarded,
            layout => layout,
        };

        let inner = if config.stampede_safe {
            SharedInner::Coordinated(Arc::new(StampedeCoordinator::new(backend)))
        } else {
            SharedInner::Plain(Arc::new(backend))
        };

        debug!(
            policy = ?config.policy,
            capacity = config.capacity,
            concurrency = ?concurrency,
            stampede_safe = config.stampede_safe,
            "created shared cache"
        );
        Ok(SharedCache { inner, concurrency })
    }
}

// ---------------------------------------------------------------------------
// SharedCache
// ---------------------------------------------------------------------------

/// Lock layout behind a [`SharedCache`]: a [`GuardedCache`] or a
/// [`ShardedCache`].
type Backend<K, V> = Box<dyn ConcurrentCache<K, V>>;

enum SharedInner<K, V, E> {
    Plain(Arc<Backend<K, V>>),
    Coordinated(Arc<StampedeCoordinator<Backend<K, V>, K, V, E>>),
}

/// Cloneable, thread-safe cache handle. Clones share the same entries.
///
/// Plain cache operations come from [`ConcurrentCache`].
pub struct SharedCache<K, V, E = Infallible> {
    inner: SharedInner<K, V, E>,
    concurrency: Concurrency,
}

impl<K, V, E> Clone for SharedCache<K, V, E> {
    fn clone(&self) -> Self {
        let inner = match &self.inner {
            SharedInner::Plain(backend) => SharedInner::Plain(Arc::clone(backend)),
            SharedInner::Coordinated(coordinator) => {
                SharedInner::Coordinated(Arc::clone(coordinator))
            },
        };
        Self {
            inner,
            concurrency: self.concurrency,
        }
    }
}

impl<K, V, E> SharedCache<K, V, E>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
    E: Clone + Send,
{
    fn backend(&self) -> &dyn ConcurrentCache<K, V> {
        match &self.inner {
            SharedInner::Plain(backend) => &**backend,
            SharedInner::Coordinated(coordinator) => &**coordinator.cache(),
        }
    }

    /// Lock layout actually in use; never [`Concurrency::None`].
    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Whether concurrent misses on one key share a single producer run.
    pub fn is_stampede_safe(&self) -> bool {
        matches!(self.inner, SharedInner::Coordinated(_))
    }

    /// Returns the cached value or runs `producer` on a miss.
    ///
    /// Coordinated handles run the producer once per key across all
    /// concurrent callers. Plain handles check, compute and store without
    /// coordination, so racing callers may each run the producer.
    pub fn get_or_compute<F>(&self, key: K, producer: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        match &self.inner {
            SharedInner::Coordinated(coordinator) => coordinator.get_or_compute(key, producer),
            SharedInner::Plain(backend) => compute_uncoordinated(backend.as_ref(), key, producer),
        }
    }

    /// [`get_or_compute`](Self::get_or_compute) with a bound on how long this
    /// caller waits for someone else's load. Plain handles never wait, so
    /// they never time out.
    pub fn get_or_compute_timeout<F>(
        &self,
        key: K,
        timeout: Duration,
        producer: F,
    ) -> Result<V, LoadError<E>>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        match &self.inner {
            SharedInner::Coordinated(coordinator) => {
                coordinator.get_or_compute_timeout(key, timeout, producer)
            },
            SharedInner::Plain(backend) => {
                compute_uncoordinated(backend.as_ref(), key, producer).map_err(LoadError::Producer)
            },
        }
    }

    /// Number of keys with a coordinated load in progress.
    pub fn in_flight(&self) -> usize {
        match &self.inner {
            SharedInner::Coordinated(coordinator) => coordinator.in_flight(),
            SharedInner::Plain(_) => 0,
        }
    }
}

impl<K, V, E> ConcurrentCache<K, V> for SharedCache<K, V, E>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
    E: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        self.backend().get(key)
    }

    fn put(&self, key: K, value: V) -> Option<K> {
        self.backend().put(key, value)
    }

    fn remove(&self, key: &K) -> bool {
        self.backend().remove(key)
    }

    fn contains(&self, key: &K) -> bool {
        self.backend().contains(key)
    }

    fn size(&self) -> usize {
        self.backend().size()
    }

    fn capacity(&self) -> usize {
        self.backend().capacity()
    }

    fn clear(&self) {
        self.backend().clear()
    }

    fn stats(&self) -> CacheStats {
        self.backend().stats()
    }
}

impl<K, V, E> fmt::Debug for SharedCache<K, V, E>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
    E: Clone + Send,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCache")
            .field("concurrency", &self.concurrency)
            .field("stampede_safe", &self.is_stampede_safe())
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

fn compute_uncoordinated<C, K, V, E, F>(cache: &C, key: K, producer: F) -> Result<V, E>
where
    C: ConcurrentCache<K, V>,
    V: Clone,
    F: FnOnce(&K) -> Result<V, E>,
{
    if let Some(value) = cache.get(&key) {
        return Ok(value);
    }
    let value = producer(&key)?;
    cache.put(key, value.clone());
    Ok(value)
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Unified handle returned by [`CacheFactory::create`].
///
/// Operations take `&mut self` so the same code drives a local or a shared
/// cache. Use [`Cache::as_shared`] / [`Cache::into_shared`] to get a
/// cloneable `&self` handle for other threads.
pub enum Cache<K, V, E = Infallible> {
    Local(CacheCore<K, V>),
    Shared(SharedCache<K, V, E>),
}

impl<K, V, E> Cache<K, V, E>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
    E: Clone + Send,
{
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self {
            Cache::Local(core) => core.get(key),
            Cache::Shared(shared) => shared.get(key),
        }
    }

    /// Inserts or overwrites `key`; returns the evicted key, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<K> {
        match self {
            Cache::Local(core) => core.put(key, value),
            Cache::Shared(shared) => shared.put(key, value),
        }
    }

    pub fn remove(&mut self, key: &K) -> bool {
        match self {
            Cache::Local(core) => core.remove(key),
            Cache::Shared(shared) => shared.remove(key),
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        match self {
            Cache::Local(core) => core.contains(key),
            Cache::Shared(shared) => shared.contains(key),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Cache::Local(core) => core.size(),
            Cache::Shared(shared) => shared.size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn capacity(&self) -> usize {
        match self {
            Cache::Local(core) => core.capacity(),
            Cache::Shared(shared) => shared.capacity(),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Cache::Local(core) => core.clear(),
            Cache::Shared(shared) => shared.clear(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        match self {
            Cache::Local(core) => core.stats(),
            Cache::Shared(shared) => shared.stats(),
        }
    }

    pub fn get_or_compute<F>(&mut self, key: K, producer: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        match self {
            Cache::Local(core) => {
                if let Some(value) = core.get(&key) {
                    return Ok(value);
                }
                let value = producer(&key)?;
                core.put(key, value.clone());
                Ok(value)
            },
            Cache::Shared(shared) => shared.get_or_compute(key, producer),
        }
    }

    pub fn as_shared(&self) -> Option<&SharedCache<K, V, E>> {
        match self {
            Cache::Local(_) => None,
            Cache::Shared(shared) => Some(shared),
        }
    }

    pub fn into_shared(self) -> Option<SharedCache<K, V, E>> {
        match self {
            Cache::Local(_) => None,
            Cache::Shared(shared) => Some(shared),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Cache::Local(_))
    }
}

impl<K, V, E> fmt::Debug for Cache<K, V, E>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
    E: Clone + Send,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cache::Local(core) => f.debug_tuple("Local").field(core).finish(),
            Cache::Shared(shared) => f.debug_tuple("Shared").field(shared).finish(),
        }
    }
}
