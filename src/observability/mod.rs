//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! schema build, snapshot, watchers, pipeline produce:
//!     → logging.rs (structured log events, one span per watcher)
//!     → metrics.rs (counters, gauges)
//! ```

pub mod logging;
pub mod metrics;
