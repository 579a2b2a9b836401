//! Live-bound configuration backed by a watchable KV store.
//!
//! Fields of an application configuration structure are bound to keys in a
//! KV service (Consul, or any [`store::KvStore`]). Values are coerced from
//! text into the field types, seeded from one snapshot of the namespace,
//! and kept current by one watcher per auto-watched key, which calls the
//! field's handlers after each update.

// Core subsystems
pub mod binding;
pub mod coerce;
pub mod configurator;
mod pipeline;
pub mod snapshot;
pub mod store;
pub mod watch;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use binding::{Configurable, Field, Schema, SchemaBuilder};
pub use coerce::{Coerce, CoercionError};
pub use config::OwlConfig;
pub use configurator::{ConfigHandle, Configurator};
pub use error::{Error, Result};
pub use lifecycle::Shutdown;
pub use snapshot::SnapshotReport;
pub use store::{ChangeEvent, KvPair, KvStore, MemoryStore, Subscription};
