//! Error types for the cacheward library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when a cache cannot be constructed from the
//!   given parameters (zero capacity, zero shards).
//! - [`InvariantError`]: Returned when internal bookkeeping disagrees with the
//!   value store (debug-only `check_invariants` methods).
//! - [`LoadError`]: Returned by deadline-bounded stampede-safe loads.
//!
//! Lookups never fail: a missing key is `None`, not an error. The only
//! runtime errors come out of `get_or_compute`, and those are the producer's
//! own error type.
//!
//! ## Example Usage
//!
//! ```
//! use cacheward::core::CacheCore;
//! use cacheward::error::ConfigError;
//! use cacheward::policy::PolicyKind;
//!
//! let bad = CacheCore::<u64, u64>::try_new(PolicyKind::Lru, 0);
//! assert_eq!(bad.unwrap_err(), ConfigError::ZeroCapacity);
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: capacity must be at least 1")]
    ZeroCapacity,

    #[error("invalid configuration: shard count must be at least 1")]
    ZeroShards,
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// LoadError
// ---------------------------------------------------------------------------

/// Outcome of a stampede-safe load that gave up waiting or whose producer
/// failed.
///
/// `Timeout` concerns only the caller that received it. The in-flight
/// producer keeps running and its result still reaches the cache and every
/// other waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError<E> {
    #[error("producer failed: {0}")]
    Producer(E),

    #[error("timed out waiting for an in-flight load")]
    Timeout,
}

impl<E> LoadError<E> {
    /// Returns the producer error, if this is one.
    pub fn into_producer(self) -> Option<E> {
        match self {
            LoadError::Producer(err) => Some(err),
            LoadError::Timeout => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LoadError::Timeout)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
