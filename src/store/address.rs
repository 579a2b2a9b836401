//! Store address parsing.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::store::ConnectError;

/// Base URL of a KV store's HTTP API.
///
/// Accepts `host:port` (plain HTTP assumed) or an `http`/`https` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAddress(Url);

impl StoreAddress {
    pub fn url(&self) -> &Url {
        &self.0
    }

    /// Resolve an API path such as `v1/kv/App/token` against the base.
    pub fn endpoint(&self, path: &str) -> Url {
        let mut url = self.0.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/{}", base, path.trim_start_matches('/')));
        url
    }
}

impl FromStr for StoreAddress {
    type Err = ConnectError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ConnectError::InvalidAddress {
            address: raw.to_string(),
            reason,
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty address".to_string()));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        let url = Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        Ok(Self(url))
    }
}

impl fmt::Display for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
