//! Options validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (wait window, backoff bounds)
//! - Check that addresses parse before anything connects
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: OwlConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::OwlConfig;
use crate::store::StoreAddress;

/// Consul rejects blocking queries longer than ten minutes.
const MAX_WAIT_SECS: u64 = 600;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("store.address {0:?} is not a valid store address")]
    StoreAddress(String),

    #[error("store.wait_secs must be between 1 and 600, got {0}")]
    WaitWindow(u64),

    #[error("store.request_timeout_secs must be greater than 0")]
    RequestTimeout,

    #[error("watch.retry_base_delay_ms ({base}) exceeds watch.retry_max_delay_ms ({max})")]
    RetryBounds { base: u64, max: u64 },

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check every semantic rule and report all violations.
pub fn validate_config(config: &OwlConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.store.address.parse::<StoreAddress>().is_err() {
        errors.push(ValidationError::StoreAddress(config.store.address.clone()));
    }
    if config.store.wait_secs == 0 || config.store.wait_secs > MAX_WAIT_SECS {
        errors.push(ValidationError::WaitWindow(config.store.wait_secs));
    }
    if config.store.request_timeout_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    let watch = &config.watch;
    if watch.retry_base_delay_ms > watch.retry_max_delay_ms {
        errors.push(ValidationError::RetryBounds {
            base: watch.retry_base_delay_ms,
            max: watch.retry_max_delay_ms,
        });
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::LogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&OwlConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = OwlConfig::default();
        config.store.address = "ftp://consul".to_string();
        config.store.wait_secs = 0;
        config.watch.retry_base_delay_ms = 5_000;
        config.watch.retry_max_delay_ms = 100;
        config.observability.log_level = "loud".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::WaitWindow(0)));
        assert!(errors.contains(&ValidationError::RetryBounds { base: 5_000, max: 100 }));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = OwlConfig::default();
        config.observability.metrics_address = "nowhere".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::MetricsAddress("nowhere".to_string())])
        );
    }
}
