use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Failure reported by a [`CounterCache`] backend.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    /// The stored value for `key` is not a count.
    #[error("corrupt counter at {key:?}: {value:?}")]
    Corrupt {
        /// Counter key.
        key: String,
        /// Raw stored value.
        value: String,
    },
    /// Any other backend error.
    #[error("cache backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Abstract storage for window counters (in-memory, memcached, Redis, ...).
///
/// The throttle only ever reads a count and writes back the incremented value. It does
/// not require, and does not rely on, atomic increments: two concurrent requests for the
/// same key may both read the same count. Backends that need exact counts under load must
/// provide that guarantee themselves.
#[async_trait]
pub trait CounterCache: Send + Sync {
    /// Fetch the current count for `key`; `Ok(None)` when nothing is stored.
    async fn get(&self, key: &str) -> Result<Option<u64>, CacheError>;

    /// Store `count` under `key`, overwriting any previous value.
    async fn set(&self, key: &str, count: u64) -> Result<(), CacheError>;
}

#[async_trait]
impl<C: CounterCache + ?Sized> CounterCache for Arc<C> {
    async fn get(&self, key: &str) -> Result<Option<u64>, CacheError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, count: u64) -> Result<(), CacheError> {
        (**self).set(key, count).await
    }
}

/// Simple in-memory counter cache.
///
/// Entries are never expired; window keys change over time, so old windows simply stop
/// being addressed. Clones share the same map.
#[derive(Default, Clone, Debug)]
pub struct InMemoryCache {
    data: Arc<Mutex<HashMap<String, u64>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored counters.
    pub fn len(&self) -> usize {
        self.data.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a counter without going through the async port.
    pub fn peek(&self, key: &str) -> Option<u64> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner).get(key).copied()
    }

    /// Drop every stored counter.
    pub fn clear(&self) {
        self.data.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[async_trait]
impl CounterCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<u64>, CacheError> {
        let guard = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(key).copied())
    }

    async fn set(&self, key: &str, count: u64) -> Result<(), CacheError> {
        let mut guard = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert(key.to_string(), count);
        Ok(())
    }
}
