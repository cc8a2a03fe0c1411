#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use throttlegate::{CacheError, ClientRequest, CounterCache, InMemoryCache};

/// Minimal request used across integration tests.
#[derive(Debug, Clone)]
pub struct TestRequest {
    pub ip: String,
    pub path: String,
}

impl TestRequest {
    pub fn new(ip: &str, path: &str) -> Self {
        Self { ip: ip.to_string(), path: path.to_string() }
    }

    pub fn get(path: &str) -> Self {
        Self::new("1.2.3.4", path)
    }
}

impl ClientRequest for TestRequest {
    fn client_addr(&self) -> String {
        self.ip.clone()
    }

    fn path(&self) -> &str {
        &self.path
    }
}

/// In-memory cache whose reads and writes can be switched to fail at runtime.
#[derive(Debug, Clone, Default)]
pub struct SwitchableCache {
    pub inner: InMemoryCache,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl SwitchableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CounterCache for SwitchableCache {
    async fn get(&self, key: &str) -> Result<Option<u64>, CacheError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("read refused".into()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, count: u64) -> Result<(), CacheError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("write refused".into()));
        }
        self.inner.set(key, count).await
    }
}
