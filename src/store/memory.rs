//! In-process KV store.
//!
//! Used by tests and by applications that feed configuration from somewhere
//! other than a remote service. A watch first reports the key's current
//! entry, if any, then every later change.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{stream, StreamExt};
use tokio::sync::broadcast;

use crate::store::{ChangeEvent, KvPair, KvStore, Subscription, TransportError};

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A thread-safe KV store kept in memory.
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, (String, u64)>,
    last_index: AtomicU64,
    events: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// A store whose watchers may fall `capacity` events behind before lagging.
    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            entries: DashMap::new(),
            last_index: AtomicU64::new(0),
            events,
        }
    }

    /// Write a value and notify watchers. Returns the change index.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) -> u64 {
        let key = key.into();
        let value = value.into();
        let index = self.last_index.fetch_add(1, Ordering::SeqCst) + 1;
        self.entries.insert(key.clone(), (value.clone(), index));
        self.publish(ChangeEvent {
            key,
            value: Some(value),
            index,
        });
        index
    }

    /// Remove a key and notify watchers with an absent value.
    pub fn delete(&self, key: &str) -> Option<u64> {
        self.entries.remove(key)?;
        let index = self.last_index.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish(ChangeEvent {
            key: key.to_string(),
            value: None,
            index,
        });
        Some(index)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().0.clone())
    }

    /// Number of open watch subscriptions.
    pub fn watcher_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn publish(&self, event: ChangeEvent) {
        // No receivers is fine: nobody is watching yet.
        let _ = self.events.send(event);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn list(&self, prefix: &str) -> Result<Vec<KvPair>, TransportError> {
        let mut pairs: Vec<KvPair> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| {
                let (value, index) = entry.value();
                KvPair {
                    key: entry.key().clone(),
                    value: Some(value.clone()),
                    index: *index,
                }
            })
            .collect();
        pairs.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(pairs)
    }

    async fn watch(&self, key: &str) -> Result<Subscription, TransportError> {
        // Subscribe before reading the entry so no change falls in between.
        let rx = self.events.subscribe();
        let current = self.entries.get(key).map(|entry| {
            let (value, index) = entry.value();
            ChangeEvent {
                key: key.to_string(),
                value: Some(value.clone()),
                index: *index,
            }
        });
        let floor = current.as_ref().map_or(0, |event| event.index);
        let replay = stream::iter(current.map(Ok::<_, TransportError>));

        let key = key.to_string();
        let changes = stream::unfold((rx, key), move |(mut rx, key)| async move {
            loop {
                match rx.recv().await {
                    Ok(event) if event.key == key && event.index > floor => {
                        return Some((Ok(event), (rx, key)));
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        return Some((Err(TransportError::Lagged(skipped)), (rx, key)));
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(Subscription::new(replay.chain(changes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let store = MemoryStore::new();
        store.put("App/b", "2");
        store.put("App/a", "1");
        store.put("Other/c", "3");

        let pairs = store.list("App").await.unwrap();
        let keys: Vec<_> = pairs.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["App/a", "App/b"]);
        assert_eq!(pairs[0].value.as_deref(), Some("1"));
        assert_eq!(store.list("").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_watch_sees_only_its_key() {
        let store = MemoryStore::new();
        let mut sub = store.watch("App/port").await.unwrap();
        assert_eq!(store.watcher_count(), 1);

        store.put("App/other", "x");
        let index = store.put("App/port", "9090");
        store.delete("App/port");

        let first = tokio::time::timeout(Duration::from_secs(1), sub.next()).await.unwrap();
        assert_eq!(
            first,
            Some(Ok(ChangeEvent {
                key: "App/port".into(),
                value: Some("9090".into()),
                index,
            }))
        );
        let second = tokio::time::timeout(Duration::from_secs(1), sub.next()).await.unwrap();
        assert_eq!(second.unwrap().unwrap().value, None);
        assert_eq!(store.get("App/port"), None);

        sub.stop();
        assert_eq!(store.watcher_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_watcher_lags() {
        let store = MemoryStore::with_capacity(1);
        let mut sub = store.watch("k").await.unwrap();
        store.put("k", "1");
        store.put("k", "2");

        assert_eq!(sub.next().await, Some(Err(TransportError::Lagged(1))));
        assert_eq!(sub.next().await.unwrap().unwrap().value.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_watch_opens_with_current_entry() {
        let store = MemoryStore::new();
        store.put("k", "old");
        let index = store.put("k", "new");

        let mut sub = store.watch("k").await.unwrap();
        let first = sub.next().await.unwrap().unwrap();
        assert_eq!(first.value.as_deref(), Some("new"));
        assert_eq!(first.index, index);

        let later = store.put("k", "newer");
        let next = tokio::time::timeout(Duration::from_secs(1), sub.next()).await.unwrap();
        assert_eq!(next.unwrap().unwrap().index, later);
    }

    #[tokio::test]
    async fn test_reopened_watch_recovers_after_lag() {
        let store = MemoryStore::with_capacity(1);
        let mut sub = store.watch("k").await.unwrap();
        store.put("k", "1");
        store.put("k", "2");
        let last = store.put("k", "3");

        assert_eq!(sub.next().await, Some(Err(TransportError::Lagged(2))));
        drop(sub);

        let mut reopened = store.watch("k").await.unwrap();
        let event = reopened.next().await.unwrap().unwrap();
        assert_eq!(event.value.as_deref(), Some("3"));
        assert_eq!(event.index, last);
    }
}
