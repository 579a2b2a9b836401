//! Watcher lifecycle: reconnection, cancellation and the drain grace period.

use std::sync::Arc;
use std::time::{Duration, Instant};

use owl_config::{Configurator, Field, KvStore, MemoryStore, SchemaBuilder, Shutdown};

mod common;
use common::{eventually, fast_options, Calls, FlakyStore};

#[derive(Debug, Clone, Default)]
struct Limits {
    workers: u32,
    ratio: f64,
    label: Option<String>,
}

fn watched_schema(calls: &Calls) -> SchemaBuilder<Limits> {
    let on_workers = calls.clone();
    let on_ratio = calls.clone();
    let on_label = calls.clone();
    SchemaBuilder::new()
        .field(
            Field::bind("workers", |c: &mut Limits| &mut c.workers)
                .on_change(move |_: &Limits, key: &str, value: &str| on_workers.record(key, value)),
        )
        .field(
            Field::bind("ratio", |c: &mut Limits| &mut c.ratio)
                .on_change(move |_: &Limits, key: &str, value: &str| on_ratio.record(key, value)),
        )
        .field(
            Field::bind("label", |c: &mut Limits| &mut c.label)
                .on_change(move |_: &Limits, key: &str, value: &str| on_label.record(key, value)),
        )
}

async fn start(
    store: Arc<dyn KvStore>,
    calls: &Calls,
    shutdown: &Shutdown,
    grace_ms: u64,
) -> Configurator<Limits> {
    let mut options = fast_options();
    options.watch.grace_period_ms = grace_ms;
    let schema = watched_schema(calls).build().unwrap();
    Configurator::from_schema(store, schema, Limits::default(), shutdown, &options)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_reconnects_after_transport_errors() {
    let store = Arc::new(FlakyStore::default());
    store.fail_watches(3);
    let calls = Calls::default();
    let shutdown = Shutdown::new();
    let mut configurator = start(store.clone(), &calls, &shutdown, 20).await;

    eventually("all watchers subscribed", || store.inner.watcher_count() == 3).await;
    assert!(store.watch_calls() >= 6);
    assert_eq!(configurator.running_watchers(), 3);

    store.inner.put("workers", "16");
    let handle = configurator.handle();
    eventually("workers update", || handle.load().workers == 16).await;

    configurator.shutdown().await;
}

#[tokio::test]
async fn test_no_handlers_fire_after_shutdown() {
    let store = Arc::new(MemoryStore::new());
    let calls = Calls::default();
    let shutdown = Shutdown::new();
    let mut configurator = start(store.clone(), &calls, &shutdown, 50).await;

    eventually("all watchers subscribed", || store.watcher_count() == 3).await;
    store.put("ratio", "0.5");
    let handle = configurator.handle();
    eventually("ratio update", || handle.load().ratio == 0.5).await;

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(5)).await;
    store.put("ratio", "0.75");
    store.put("label", "late");

    configurator.join().await;

    assert_eq!(configurator.running_watchers(), 0);
    assert_eq!(store.watcher_count(), 0);
    assert_eq!(handle.load().ratio, 0.5);
    assert_eq!(handle.load().label, None);
    assert_eq!(calls.values(), vec!["0.5"]);
}

#[tokio::test]
async fn test_watchers_drain_concurrently() {
    let store = Arc::new(MemoryStore::new());
    let calls = Calls::default();
    let shutdown = Shutdown::new();
    let mut configurator = start(store.clone(), &calls, &shutdown, 150).await;

    eventually("all watchers subscribed", || store.watcher_count() == 3).await;

    let started = Instant::now();
    shutdown.trigger();
    let joined = tokio::time::timeout(Duration::from_secs(2), configurator.join()).await;
    let elapsed = started.elapsed();

    assert!(joined.is_ok(), "watchers did not exit");
    assert!(elapsed >= Duration::from_millis(150), "exited before the grace period: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(400), "grace periods ran serially: {elapsed:?}");
}

#[tokio::test]
async fn test_shutdown_interrupts_backoff() {
    let store = Arc::new(FlakyStore::default());
    store.fail_watches(u32::MAX);
    let calls = Calls::default();
    let shutdown = Shutdown::new();

    let mut options = fast_options();
    options.watch.retry_base_delay_ms = 10_000;
    options.watch.retry_max_delay_ms = 10_000;
    let schema = watched_schema(&calls).build().unwrap();
    let mut configurator =
        Configurator::from_schema(store.clone(), schema, Limits::default(), &shutdown, &options)
            .await
            .unwrap();

    eventually("first watch attempts", || store.watch_calls() >= 3).await;

    let started = Instant::now();
    configurator.shutdown().await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(configurator.running_watchers(), 0);
    assert_eq!(store.inner.watcher_count(), 0);
}

#[tokio::test]
async fn test_shared_token_stops_several_configurators() {
    let first_store = Arc::new(MemoryStore::new());
    let second_store = Arc::new(MemoryStore::new());
    let calls = Calls::default();
    let shutdown = Shutdown::new();

    let mut first = start(first_store.clone(), &calls, &shutdown, 10).await;
    let mut second = start(second_store.clone(), &calls, &shutdown, 10).await;
    eventually("first subscribed", || first_store.watcher_count() == 3).await;
    eventually("second subscribed", || second_store.watcher_count() == 3).await;

    shutdown.trigger();
    let joined = tokio::time::timeout(Duration::from_secs(2), async {
        first.join().await;
        second.join().await;
    })
    .await;

    assert!(joined.is_ok());
    assert_eq!(first_store.watcher_count(), 0);
    assert_eq!(second_store.watcher_count(), 0);
}
