//! Consul KV client.
//!
//! # Responsibilities
//! - List entries under a prefix (`GET /v1/kv/<prefix>?recurse`)
//! - Watch one key with blocking queries (`GET /v1/kv/<key>?index=N&wait=Ws`)
//! - Decode base64 values and track `X-Consul-Index`
//!
//! # Design Decisions
//! - The first blocking query returns immediately with the current value,
//!   so every (re)opened watch starts by reporting the key's state
//! - A query that returns with an unchanged index yields nothing
//! - An index that goes backwards resets to 0 (store restore or leader change)

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use futures_util::stream;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::config::schema::StoreConfig;
use crate::store::{
    ChangeEvent, ConnectError, KvPair, KvStore, StoreAddress, Subscription, TransportError,
};

const INDEX_HEADER: &str = "X-Consul-Index";
const TOKEN_HEADER: &str = "X-Consul-Token";

/// Extra client-side slack on top of the server-side wait (Consul adds up to wait/16 jitter).
const WAIT_SLACK: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KvEntry {
    key: String,
    value: Option<String>,
    modify_index: u64,
}

/// A [`KvStore`] backed by a Consul agent's HTTP API.
#[derive(Debug, Clone)]
pub struct ConsulStore {
    client: Client,
    address: StoreAddress,
    token: Option<String>,
    wait: Duration,
    request_timeout: Duration,
}

impl ConsulStore {
    /// Client for `address` with default settings.
    pub fn connect(address: &str) -> Result<Self, ConnectError> {
        Self::from_config(&StoreConfig {
            address: address.to_string(),
            ..StoreConfig::default()
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, ConnectError> {
        let address: StoreAddress = config.address.parse()?;
        let client = Client::builder()
            .connect_timeout(config.request_timeout())
            .build()
            .map_err(|e| ConnectError::Client(e.to_string()))?;

        tracing::info!(address = %address, "Consul client initialized");

        Ok(Self {
            client,
            address,
            token: config.token.clone(),
            wait: config.wait(),
            request_timeout: config.request_timeout(),
        })
    }

    pub fn address(&self) -> &StoreAddress {
        &self.address
    }

    fn kv_url(&self, key: &str) -> Url {
        self.address.endpoint(&format!("v1/kv/{}", key.trim_start_matches('/')))
    }
}

fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.header(TOKEN_HEADER, token),
        None => request,
    }
}

fn decode_entries(body: &[u8]) -> Result<Vec<KvPair>, TransportError> {
    let entries: Vec<KvEntry> =
        serde_json::from_slice(body).map_err(|e| TransportError::Decode(e.to_string()))?;

    entries
        .into_iter()
        .map(|entry| {
            let value = entry
                .value
                .map(|encoded| {
                    general_purpose::STANDARD
                        .decode(encoded)
                        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                        .map_err(|e| {
                            TransportError::Decode(format!("value of {}: {}", entry.key, e))
                        })
                })
                .transpose()?;
            Ok(KvPair {
                key: entry.key,
                value,
                index: entry.modify_index,
            })
        })
        .collect()
}

fn next_index(previous: u64, reported: u64) -> u64 {
    if reported < previous {
        0
    } else {
        reported
    }
}

/// Blocking-query state for one watched key.
struct KeyWatch {
    client: Client,
    url: Url,
    key: String,
    token: Option<String>,
    wait: Duration,
    index: u64,
}

impl KeyWatch {
    /// One blocking query. `Ok(None)` when the wait elapsed without a change.
    async fn poll(&mut self) -> Result<Option<ChangeEvent>, TransportError> {
        let request = self
            .client
            .get(self.url.clone())
            .query(&[
                ("index", self.index.to_string()),
                ("wait", format!("{}s", self.wait.as_secs())),
            ])
            .timeout(self.wait + self.wait / 16 + WAIT_SLACK);

        let response = authorize(request, self.token.as_deref())
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let reported = response
            .headers()
            .get(INDEX_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| TransportError::Decode(format!("missing {INDEX_HEADER} header")))?;

        let previous = self.index;
        self.index = next_index(previous, reported);
        if reported == previous {
            return Ok(None);
        }

        if status == StatusCode::NOT_FOUND {
            return Ok(Some(ChangeEvent {
                key: self.key.clone(),
                value: None,
                index: reported,
            }));
        }
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let event = decode_entries(&body)?
            .into_iter()
            .find(|pair| pair.key == self.key)
            .map(|pair| ChangeEvent {
                key: pair.key,
                value: pair.value,
                index: pair.index,
            })
            .unwrap_or_else(|| ChangeEvent {
                key: self.key.clone(),
                value: None,
                index: reported,
            });

        Ok(Some(event))
    }
}

#[async_trait]
impl KvStore for ConsulStore {
    async fn list(&self, prefix: &str) -> Result<Vec<KvPair>, TransportError> {
        let request = self
            .client
            .get(self.kv_url(prefix))
            .query(&[("recurse", "true")])
            .timeout(self.request_timeout);

        let response = authorize(request, self.token.as_deref())
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| TransportError::Request(e.to_string()))?;
                decode_entries(&body)
            }
            status => Err(TransportError::Status(status.as_u16())),
        }
    }

    async fn watch(&self, key: &str) -> Result<Subscription, TransportError> {
        let watch = KeyWatch {
            client: self.client.clone(),
            url: self.kv_url(key),
            key: key.to_string(),
            token: self.token.clone(),
            wait: self.wait,
            index: 0,
        };

        let events = stream::unfold(watch, |mut watch| async move {
            loop {
                match watch.poll().await {
                    Ok(Some(event)) => return Some((Ok(event), watch)),
                    Ok(None) => continue,
                    Err(e) => return Some((Err(e), watch)),
                }
            }
        });

        Ok(Subscription::new(events))
    }
}
