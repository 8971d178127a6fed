//! Stampede-safe loading: at most one producer run per missing key.
//!
//! ## Architecture
//!
//! ```text
//!   caller ──► cache.get(key) ── hit ──────────────────────────────► value
//!                  │ miss
//!                  ▼
//!   registry: Mutex<FxHashMap<K, Arc<PendingComputation>>>
//!     check-or-create (short critical section, no user code)
//!          │                                  │
//!      created: LEADER                    found: WAITER
//!          │                                  │
//!     producer(&key)  (no lock held)      wait on slot condvar
//!          │                                  │
//!     cache.put(key, value)                   │
//!     registry.remove(key)                    │
//!     slot = Published | Failed ──notify_all──┘
//! ```
//!
//! The registry entry is the only per-key state. The leader removes it
//! exactly once when the load reaches a terminal state, so the registry is
//! empty whenever no load is running.
//!
//! ## Per-key state machine
//!
//! ```text
//!   NoEntry ──miss──► Running ──ok────► Published ──► NoEntry
//!                        │
//!                        ├──err───► Failed ─────► NoEntry
//!                        │
//!                        └──unwind► Abandoned ──► NoEntry (waiters retry)
//! ```
//!
//! A failed load is not cached: every caller already waiting receives a clone
//! of the same error, and the next caller starts a fresh attempt. If the
//! leader unwinds before publishing (a panic in the producer, or in a
//! `Clone`/`Hash` impl while storing the result), a drop guard marks the slot
//! abandoned and drops the registry entry. Waiters re-run the whole lookup
//! and one of them becomes the new leader. The panic keeps unwinding in the
//! original leader's thread.
//!
//! ## Timeouts
//!
//! [`StampedeCoordinator::get_or_compute_timeout`] bounds only the time a
//! waiter spends blocked. A waiter that gives up leaves the slot untouched;
//! the producer keeps running, its result still lands in the cache, and the
//! remaining waiters still receive it. A caller that becomes the leader runs
//! the producer to completion regardless of the timeout.

use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::stats::CacheStats;
use crate::traits::ConcurrentCache;

enum Phase<V, E> {
    Running,
    Published(V),
    Failed(E),
    Abandoned,
}

struct PendingState<V, E> {
    phase: Phase<V, E>,
    waiters: usize,
}

/// Single-result latch shared by a leader and its waiters.
struct PendingComputation<V, E> {
    state: Mutex<PendingState<V, E>>,
    ready: Condvar,
}

impl<V, E> PendingComputation<V, E> {
    fn running() -> Self {
        Self {
            state: Mutex::new(PendingState {
                phase: Phase::Running,
                waiters: 0,
            }),
            ready: Condvar::new(),
        }
    }
}

enum Role<V, E> {
    Leader(Arc<PendingComputation<V, E>>),
    Waiter(Arc<PendingComputation<V, E>>),
}

/// Terminal phase observed by a waiter.
enum Settled<V, E> {
    Published(V),
    Failed(E),
    Abandoned,
}

type SlotGuard<'a, V, E> = MutexGuard<'a, PendingState<V, E>>;

/// Wraps a [`ConcurrentCache`] with per-key single-flight loading.
///
/// # Example
///
/// ```
/// use std::convert::Infallible;
///
/// use cacheward::guard::GuardedCache;
/// use cacheward::policy::PolicyKind;
/// use cacheward::stampede::StampedeCoordinator;
///
/// let cache = GuardedCache::try_new(PolicyKind::Lru, 16).unwrap();
/// let loader: StampedeCoordinator<_, u32, String, Infallible> = StampedeCoordinator::new(cache);
///
/// let value = loader.get_or_compute(7, |key| Ok(format!("row-{key}"))).unwrap();
/// assert_eq!(value, "row-7");
/// assert_eq!(loader.cache().get(&7).as_deref(), Some("row-7"));
/// assert_eq!(loader.in_flight(), 0);
/// ```
pub struct StampedeCoordinator<C, K, V, E> {
    cache: C,
    registry: Mutex<FxHashMap<K, Arc<PendingComputation<V, E>>>>,
}

impl<C, K, V, E> StampedeCoordinator<C, K, V, E>
where
    C: ConcurrentCache<K, V>,
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    pub fn new(cache: C) -> Self {
        Self {
            cache,
            registry: Mutex::new(FxHashMap::default()),
        }
    }

    /// The wrapped cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Returns the cached value for `key`, running `producer` on a miss.
    ///
    /// Concurrent callers that miss on the same key share one producer run
    /// and all receive its value, or a clone of its error.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from `producer` in the caller that ran it. Callers
    /// waiting on that run are not affected; they retry.
    pub fn get_or_compute<F>(&self, key: K, producer: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        let Ok(result) = self.load(key, producer, |ready, state| {
            ready.wait(state);
            Ok::<(), Infallible>(())
        });
        result
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but a waiter gives up
    /// with [`LoadError::Timeout`] after `timeout`.
    pub fn get_or_compute_timeout<F>(
        &self,
        key: K,
        timeout: Duration,
        producer: F,
    ) -> Result<V, LoadError<E>>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        let deadline = Instant::now() + timeout;
        let result = self.load(key, producer, |ready, state| {
            if ready.wait_until(state, deadline).timed_out() {
                Err(LoadError::<E>::Timeout)
            } else {
                Ok(())
            }
        })?;
        result.map_err(LoadError::Producer)
    }

    /// Number of keys with a load in progress.
    pub fn in_flight(&self) -> usize {
        self.registry.lock().len()
    }

    /// Number of callers currently blocked on the in-flight load for `key`.
    pub fn waiting_on(&self, key: &K) -> usize {
        let slot = self.registry.lock().get(key).cloned();
        slot.map_or(0, |slot| slot.state.lock().waiters)
    }

    /// Runs the lookup, leading or joining a load on a miss.
    ///
    /// `block` parks a waiter on the slot condvar; its `Err` means the waiter
    /// gave up and is returned as the outer error.
    fn load<F, B, T>(&self, key: K, producer: F, mut block: B) -> Result<Result<V, E>, T>
    where
        F: FnOnce(&K) -> Result<V, E>,
        B: FnMut(&Condvar, &mut SlotGuard<'_, V, E>) -> Result<(), T>,
    {
        loop {
            if let Some(value) = self.cache.get(&key) {
                return Ok(Ok(value));
            }

            match self.claim(&key) {
                Role::Leader(slot) => return Ok(self.lead(key, &slot, producer)),
                Role::Waiter(slot) => match Self::wait(&slot, &mut block) {
                    Ok(Settled::Published(value)) => return Ok(Ok(value)),
                    Ok(Settled::Failed(err)) => return Ok(Err(err)),
                    Ok(Settled::Abandoned) => {
                        debug!("in-flight load abandoned, retrying");
                    },
                    Err(gave_up) => {
                        debug!("gave up waiting on in-flight load");
                        return Err(gave_up);
                    },
                },
            }
        }
    }

    /// Atomic check-or-create of the registry entry for `key`.
    fn claim(&self, key: &K) -> Role<V, E> {
        let mut registry = self.registry.lock();
        if let Some(existing) = registry.get(key) {
            debug!("joined in-flight load");
            return Role::Waiter(Arc::clone(existing));
        }
        let slot = Arc::new(PendingComputation::running());
        registry.insert(key.clone(), Arc::clone(&slot));
        drop(registry);
        debug!("elected load leader");
        Role::Leader(slot)
    }

    fn lead<F>(&self, key: K, slot: &Arc<PendingComputation<V, E>>, producer: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        let mut guard = AbandonOnUnwind {
            coordinator: self,
            key: &key,
            slot,
            armed: true,
        };

        let (terminal, result) = match producer(&key) {
            Ok(value) => {
                self.cache.put(key.clone(), value.clone());
                (Phase::Published(value.clone()), Ok(value))
            },
            Err(err) => (Phase::Failed(err.clone()), Err(err)),
        };

        guard.armed = false;
        self.release(&key, slot, terminal);
        match &result {
            Ok(_) => debug!("published loaded value"),
            Err(_) => debug!("load failed, error shared with waiters"),
        }
        result
    }

    /// Drops the registry entry, then publishes the terminal phase.
    ///
    /// Removal comes first so that a caller arriving after a failure starts
    /// a fresh attempt instead of joining the finished one.
    fn release(&self, key: &K, slot: &Arc<PendingComputation<V, E>>, terminal: Phase<V, E>) {
        {
            let mut registry = self.registry.lock();
            if registry
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current, slot))
            {
                registry.remove(key);
            }
        }

        slot.state.lock().phase = terminal;
        slot.ready.notify_all();
    }

    fn wait<B, T>(slot: &PendingComputation<V, E>, block: &mut B) -> Result<Settled<V, E>, T>
    where
        B: FnMut(&Condvar, &mut SlotGuard<'_, V, E>) -> Result<(), T>,
    {
        let mut state = slot.state.lock();
        state.waiters += 1;

        let outcome = loop {
            match &state.phase {
                Phase::Running => {},
                Phase::Published(value) => break Ok(Settled::Published(value.clone())),
                Phase::Failed(err) => break Ok(Settled::Failed(err.clone())),
                Phase::Abandoned => break Ok(Settled::Abandoned),
            }

            if let Err(gave_up) = block(&slot.ready, &mut state) {
                if matches!(state.phase, Phase::Running) {
                    break Err(gave_up);
                }
            }
        };

        state.waiters -= 1;
        outcome
    }
}

/// Releases a leader's slot as abandoned if `lead` unwinds before publishing.
struct AbandonOnUnwind<'a, C, K, V, E>
where
    C: ConcurrentCache<K, V>,
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    coordinator: &'a StampedeCoordinator<C, K, V, E>,
    key: &'a K,
    slot: &'a Arc<PendingComputation<V, E>>,
    armed: bool,
}

impl<C, K, V, E> Drop for AbandonOnUnwind<'_, C, K, V, E>
where
    C: ConcurrentCache<K, V>,
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    fn drop(&mut self) {
        if self.armed {
            warn!("load leader unwound before publishing; waking waiters to retry");
            self.coordinator.release(self.key, self.slot, Phase::Abandoned);
        }
    }
}

impl<C, K, V, E> ConcurrentCache<K, V> for StampedeCoordinator<C, K, V, E>
where
    C: ConcurrentCache<K, V>,
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
    E: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        self.cache.get(key)
    }

    fn put(&self, key: K, value: V) -> Option<K> {
        self.cache.put(key, value)
    }

    fn remove(&self, key: &K) -> bool {
        self.cache.remove(key)
    }

    fn contains(&self, key: &K) -> bool {
        self.cache.contains(key)
    }

    fn size(&self) -> usize {
        self.cache.size()
    }

    fn capacity(&self) -> usize {
        self.cache.capacity()
    }

    /// Clears the wrapped cache. Loads already in flight still complete and
    /// write their value afterwards.
    fn clear(&self) {
        self.cache.clear()
    }

    fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl<C: fmt::Debug, K, V, E> fmt::Debug for StampedeCoordinator<C, K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StampedeCoordinator")
            .field("cache", &self.cache)
            .field("in_flight", &self.registry.lock().len())
            .finish()
    }
}
