//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every watcher's ShutdownSignal resolves
//!     → each watcher drains for its grace period → stops its subscription
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → caller triggers Shutdown
//! ```
//!
//! # Design Decisions
//! - One token per process, observed by every watcher
//! - No barrier across watchers: shutdown takes the longest grace period, not the sum

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
