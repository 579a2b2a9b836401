//! Options schema.
//!
//! Defines how the configurator itself is tuned: where the KV store lives,
//! how watchers pace reconnects and shut down, and how the initial snapshot
//! treats bad values. All types derive Serde traits for deserialization from
//! TOML.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root options for a configurator.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct OwlConfig {
    /// KV store connection settings.
    pub store: StoreConfig,

    /// Watch loop settings.
    pub watch: WatchConfig,

    /// Initial snapshot settings.
    pub snapshot: SnapshotConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// KV store connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Store address (e.g., "127.0.0.1:8500" or "http://consul:8500").
    pub address: String,

    /// ACL token sent with every request.
    pub token: Option<String>,

    /// Longest time a blocking watch query may wait server-side, in seconds.
    pub wait_secs: u64,

    /// Timeout for non-blocking requests in seconds.
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8500".to_string(),
            token: None,
            wait_secs: 300,
            request_timeout_secs: 10,
        }
    }
}

impl StoreConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Watch loop settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WatchConfig {
    /// Time a cancelled watcher waits before tearing down its subscription.
    pub grace_period_ms: u64,

    /// Base delay for reconnect backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for reconnect backoff in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 2000,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 30_000,
        }
    }
}

impl WatchConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

/// What the initial snapshot does with a value it cannot coerce.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
    /// Abort construction on the first bad value.
    #[default]
    FailFast,
    /// Log the bad value and keep going.
    SkipInvalid,
}

/// Initial snapshot settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct SnapshotConfig {
    pub policy: SnapshotPolicy,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
