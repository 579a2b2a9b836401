//! Per-key watch loop.
//!
//! # State Transitions
//! ```text
//! Running → event            → Update Pipeline → Running
//! Running → transport error  → backoff → reopen → Running
//! Running → stream ended     → backoff → reopen → Running
//! Running → shutdown         → Draining (grace period) → stop subscription → Stopped
//! ```
//!
//! # Design Decisions
//! - Events for one key are applied one at a time, in delivery order
//! - Shutdown is polled first, so no event is taken after the token fires
//! - Retries are unbounded; the backoff resets after each delivered event
//! - An event whose index equals the last one applied (including the snapshot's) is skipped

use std::sync::Arc;
use std::time::Duration;

use crate::binding::BindingId;
use crate::config::schema::WatchConfig;
use crate::configurator::Shared;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::pipeline;
use crate::resilience::Backoff;
use crate::store::{ChangeEvent, Subscription, TransportError};

/// Timing knobs for a watcher.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WatchSettings {
    pub grace: Duration,
    pub retry_base: Duration,
    pub retry_max: Duration,
}

impl From<&WatchConfig> for WatchSettings {
    fn from(config: &WatchConfig) -> Self {
        Self {
            grace: config.grace_period(),
            retry_base: Duration::from_millis(config.retry_base_delay_ms),
            retry_max: Duration::from_millis(config.retry_max_delay_ms),
        }
    }
}

/// Why a subscription stopped delivering.
enum Exit {
    Cancelled,
    Failed(TransportError),
    Ended,
}

/// The long-lived subscription loop for one auto-watched binding.
pub(crate) struct Watcher<T> {
    shared: Arc<Shared<T>>,
    id: BindingId,
    shutdown: ShutdownSignal,
    settings: WatchSettings,
    backoff: Backoff,
    last_index: Option<u64>,
}

impl<T> Watcher<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(
        shared: Arc<Shared<T>>,
        id: BindingId,
        shutdown: ShutdownSignal,
        settings: WatchSettings,
    ) -> Self {
        Self {
            shared,
            id,
            shutdown,
            backoff: Backoff::new(settings.retry_base, settings.retry_max),
            settings,
            last_index: None,
        }
    }

    /// Treat the entry at `index` as already applied.
    pub fn resume_after(mut self, index: Option<u64>) -> Self {
        self.last_index = index;
        self
    }

    pub async fn run(mut self) {
        let shared = Arc::clone(&self.shared);
        let Some(binding) = shared.table.get(self.id) else {
            return;
        };
        let key = binding.key();

        metrics::record_watcher_started();
        tracing::info!("Watcher started");

        loop {
            let opened = tokio::select! {
                biased;
                _ = self.shutdown.recv() => break,
                opened = shared.store.watch(key) => opened,
            };

            let mut subscription = match opened {
                Ok(subscription) => subscription,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to open subscription");
                    if !self.pause(key).await {
                        break;
                    }
                    continue;
                }
            };

            match self.pump(&mut subscription).await {
                Exit::Cancelled => {
                    self.drain(subscription).await;
                    break;
                }
                Exit::Failed(e) => tracing::warn!(error = %e, "Subscription failed, reconnecting"),
                Exit::Ended => tracing::debug!("Subscription ended, reconnecting"),
            }

            drop(subscription);
            if !self.pause(key).await {
                break;
            }
        }

        metrics::record_watcher_stopped();
        tracing::info!("Watcher closed");
    }

    async fn pump(&mut self, subscription: &mut Subscription) -> Exit {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.recv() => return Exit::Cancelled,
                next = subscription.next() => match next {
                    Some(Ok(event)) => {
                        self.backoff.reset();
                        self.dispatch(event);
                    }
                    Some(Err(e)) => return Exit::Failed(e),
                    None => return Exit::Ended,
                },
            }
        }
    }

    fn dispatch(&mut self, event: ChangeEvent) {
        if event.index != 0 {
            if self.last_index == Some(event.index) {
                tracing::debug!(index = event.index, "Ignoring replayed event");
                return;
            }
            self.last_index = Some(event.index);
        }

        let Some(value) = event.payload() else {
            tracing::debug!(key = %event.key, "Ignoring event without a value");
            return;
        };
        let Some(binding) = self.shared.table.lookup(&event.key) else {
            tracing::debug!(key = %event.key, "Ignoring event for unbound key");
            return;
        };

        // Rejections are logged by the pipeline; the previous value stays.
        let _ = pipeline::apply(binding, &self.shared.state, value);
    }

    /// Wait out the backoff. Returns `false` if shutdown fired meanwhile.
    async fn pause(&mut self, key: &str) -> bool {
        metrics::record_watch_restart(key);
        let delay = self.backoff.next_delay();
        tokio::select! {
            biased;
            _ = self.shutdown.recv() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    async fn drain(&self, mut subscription: Subscription) {
        tracing::info!(grace = ?self.settings.grace, "Watcher draining");
        tokio::time::sleep(self.settings.grace).await;
        if !subscription.is_stopped() {
            subscription.stop();
        }
    }
}
