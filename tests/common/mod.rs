//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use owl_config::store::TransportError;
use owl_config::{KvPair, KvStore, MemoryStore, OwlConfig, Subscription};

/// A memory store whose watch calls can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing_watches: AtomicU32,
    watch_calls: AtomicU32,
}

impl FlakyStore {
    /// Fail the next `count` watch calls.
    pub fn fail_watches(&self, count: u32) {
        self.failing_watches.store(count, Ordering::SeqCst);
    }

    pub fn watch_calls(&self) -> u32 {
        self.watch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn list(&self, prefix: &str) -> Result<Vec<KvPair>, TransportError> {
        self.inner.list(prefix).await
    }

    async fn watch(&self, key: &str) -> Result<Subscription, TransportError> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failing_watches.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_watches.store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError::Request("connection refused".into()));
        }
        self.inner.watch(key).await
    }
}

/// Options with short grace and retry timings.
pub fn fast_options() -> OwlConfig {
    let mut options = OwlConfig::default();
    options.watch.grace_period_ms = 20;
    options.watch.retry_base_delay_ms = 5;
    options.watch.retry_max_delay_ms = 20;
    options
}

/// Handler invocations as `(key, value)` pairs.
#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<(String, String)>>>);

impl Calls {
    pub fn record(&self, key: &str, value: &str) {
        self.0.lock().unwrap().push((key.to_string(), value.to_string()));
    }

    pub fn all(&self) -> Vec<(String, String)> {
        self.0.lock().unwrap().clone()
    }

    pub fn values(&self) -> Vec<String> {
        self.all().into_iter().map(|(_, v)| v).collect()
    }
}

/// Poll `check` until it holds, failing the test after two seconds.
pub async fn eventually<F>(what: &str, check: F)
where
    F: Fn() -> bool,
{
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}
