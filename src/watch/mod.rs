//! Watch subsystem: keeps auto-watched fields live.
//!
//! # Data Flow
//! ```text
//! Configurator start
//!     → registry.rs spawns one task per auto-watched binding
//!     → manager.rs: KvStore::watch(key) → ChangeEvent → pipeline::apply
//!
//! Shutdown token fires
//!     → every watcher drains and stops independently
//!     → registry.rs join_all() returns once all have exited
//! ```

pub(crate) mod manager;
pub mod registry;

pub use registry::WatchRegistry;
