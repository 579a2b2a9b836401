//! Crate-level error type.
//!
//! Field-level problems (annotations, coercion of live updates) are logged
//! and contained where they happen; only construction-time failures and
//! explicit calls surface here.

use thiserror::Error;

use crate::binding::SchemaError;
use crate::coerce::CoercionError;
use crate::config::ConfigError;
use crate::store::{ConnectError, TransportError};

#[derive(Debug, Error)]
pub enum Error {
    /// The store client could not be set up.
    #[error("cannot connect to KV store: {0}")]
    Connect(#[from] ConnectError),

    /// The store failed while listing the namespace at construction.
    #[error("KV store error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The initial snapshot held a value the bound field rejects.
    #[error("initial value of {key} rejected: {source}")]
    Snapshot {
        key: String,
        #[source]
        source: CoercionError,
    },

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error("no binding for key {0:?}")]
    UnknownKey(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Snapshot {
            key: "App/port".into(),
            source: CoercionError {
                kind: "integer",
                input: "x".into(),
                cause: "invalid digit found in string".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "initial value of App/port rejected: \
             cannot parse \"x\" as integer: invalid digit found in string"
        );

        let err = Error::from(TransportError::Status(500));
        assert_eq!(err.to_string(), "KV store error: unexpected status 500");
    }
}
