//! KV store capability consumed by the configurator.
//!
//! # Data Flow
//! ```text
//! snapshot.rs ──list(namespace)──▶ KvStore ──▶ Vec<KvPair>
//! watch/      ──watch(key)───────▶ KvStore ──▶ Subscription (ChangeEvent stream)
//! ```
//!
//! # Design Decisions
//! - Object-safe trait (`async-trait`) so a configurator holds `Arc<dyn KvStore>`
//! - A subscription is a stream plus a stop switch; dropping it also stops it
//! - `memory.rs` is the in-process store, `consul.rs` speaks the Consul KV API

pub mod address;
pub mod consul;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use thiserror::Error;

pub use address::StoreAddress;
pub use consul::ConsulStore;
pub use memory::MemoryStore;

/// A stored entry as returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: String,
    /// `None` when the entry exists without a value (e.g. a folder marker).
    pub value: Option<String>,
    /// Store-assigned modification index.
    pub index: u64,
}

/// A change notification for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub key: String,
    /// `None` when the key is absent (deleted or never written).
    pub value: Option<String>,
    /// Store-assigned index of the change.
    pub index: u64,
}

impl ChangeEvent {
    /// The value, if the event carries a usable one.
    pub fn payload(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }
}

/// The KV store failed to answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("subscription fell behind by {0} events")]
    Lagged(u64),

    #[error("store closed")]
    Closed,
}

/// No client could be set up for the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("invalid store address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("cannot build store client: {0}")]
    Client(String),
}

/// A watchable key-value configuration store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// All entries whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<KvPair>, TransportError>;

    /// Open a long-lived subscription to changes of `key`.
    async fn watch(&self, key: &str) -> Result<Subscription, TransportError>;
}

/// One open watch on a key.
pub struct Subscription {
    events: Option<BoxStream<'static, Result<ChangeEvent, TransportError>>>,
    on_stop: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<S>(events: S) -> Self
    where
        S: Stream<Item = Result<ChangeEvent, TransportError>> + Send + 'static,
    {
        Self {
            events: Some(events.boxed()),
            on_stop: None,
        }
    }

    /// Run `f` when the subscription is stopped.
    pub fn on_stop<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_stop = Some(Box::new(f));
        self
    }

    /// Next event; `None` once the stream has ended or was stopped.
    pub async fn next(&mut self) -> Option<Result<ChangeEvent, TransportError>> {
        match self.events.as_mut() {
            Some(events) => events.next().await,
            None => None,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.events.is_none()
    }

    /// Tear down the underlying stream. Idempotent.
    pub fn stop(&mut self) {
        self.events = None;
        if let Some(on_stop) = self.on_stop.take() {
            on_stop();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
