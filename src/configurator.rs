//! Configurator: binds a configuration structure to a KV store and keeps it live.
//!
//! # Startup Order
//! ```text
//! Configurable::schema() → build (bindings, handlers, namespace)
//!     → apply declared defaults, in declaration order (handlers fire)
//!     → snapshot: list(namespace), apply bound keys
//!     → spawn one watcher per auto-watched binding
//! ```
//!
//! # Design Decisions
//! - The structure is moved in and held in an `ArcSwap`; readers take `Arc<T>` snapshots
//! - Watchers start after the snapshot, so each field has one writer at a time during startup
//! - Each watcher starts from the index the snapshot saw, so an entry is not delivered twice
//! - Only construction can fail; once watching, errors are logged and retried

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::Instrument;

use crate::binding::{BindingTable, Configurable, Schema};
use crate::config::schema::{OwlConfig, StoreConfig};
use crate::error::{Error, Result};
use crate::lifecycle::Shutdown;
use crate::pipeline;
use crate::snapshot::{self, SnapshotReport};
use crate::store::{ConsulStore, KvStore};
use crate::watch::manager::{WatchSettings, Watcher};
use crate::watch::WatchRegistry;

/// State shared between the configurator, its handles and its watchers.
pub(crate) struct Shared<T> {
    pub(crate) state: ArcSwap<T>,
    pub(crate) table: BindingTable<T>,
    pub(crate) namespace: Option<String>,
    pub(crate) store: Arc<dyn KvStore>,
}

/// A configuration structure bound to a KV store.
pub struct Configurator<T> {
    shared: Arc<Shared<T>>,
    shutdown: Shutdown,
    watchers: WatchRegistry,
    snapshot: SnapshotReport,
}

impl<T> Configurator<T>
where
    T: Configurable,
{
    /// Bind `config` to the Consul agent at `address`.
    ///
    /// The configurator owns its shutdown token: watchers run until
    /// [`Configurator::shutdown`] is called, or for the rest of the process
    /// if the configurator is dropped.
    pub async fn new(config: T, address: &str) -> Result<Self> {
        Self::with_shutdown(&Shutdown::new(), config, address, &OwlConfig::default()).await
    }

    /// Bind `config` to the Consul agent at `address`; watchers stop when
    /// `shutdown` fires.
    ///
    /// Watcher spans are children of the span current at the call, so log
    /// output can be routed by entering a span first.
    pub async fn with_shutdown(
        shutdown: &Shutdown,
        config: T,
        address: &str,
        options: &OwlConfig,
    ) -> Result<Self> {
        let store = ConsulStore::from_config(&StoreConfig {
            address: address.to_string(),
            ..options.store.clone()
        })?;
        Self::with_store(Arc::new(store), config, shutdown, options).await
    }

    /// Bind `config` to an explicit store.
    pub async fn with_store(
        store: Arc<dyn KvStore>,
        config: T,
        shutdown: &Shutdown,
        options: &OwlConfig,
    ) -> Result<Self> {
        let schema = T::schema().build()?;
        Self::from_schema(store, schema, config, shutdown, options).await
    }
}

impl<T> Configurator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Bind `config` using a schema built elsewhere.
    pub async fn from_schema(
        store: Arc<dyn KvStore>,
        schema: Schema<T>,
        config: T,
        shutdown: &Shutdown,
        options: &OwlConfig,
    ) -> Result<Self> {
        let (namespace, table) = schema.into_parts();
        let state = ArcSwap::from_pointee(config);

        for (_, binding) in table.iter() {
            if let Some(default) = binding.default_value() {
                // A rejected default is logged by the pipeline and leaves the field as constructed.
                let _ = pipeline::apply(binding, &state, default);
            }
        }

        let shared = Arc::new(Shared {
            state,
            table,
            namespace,
            store,
        });

        let snapshot = snapshot::load(
            shared.store.as_ref(),
            &shared.table,
            shared.namespace.as_deref(),
            &shared.state,
            options.snapshot.policy,
        )
        .await?;

        let report = snapshot.report;
        let settings = WatchSettings::from(&options.watch);
        let parent = tracing::Span::current();
        let mut watchers = WatchRegistry::new();
        for id in shared.table.watched() {
            let Some(binding) = shared.table.get(id) else {
                continue;
            };
            let span = tracing::info_span!(parent: &parent, "watch", key = %binding.key());
            let watcher = Watcher::new(Arc::clone(&shared), id, shutdown.subscribe(), settings)
                .resume_after(snapshot.index_of(id));
            watchers.spawn(watcher.run().instrument(span));
        }

        tracing::info!(
            namespace = shared.namespace.as_deref().unwrap_or_default(),
            bindings = shared.table.len(),
            watchers = watchers.len(),
            "Configurator ready"
        );

        Ok(Self {
            shared,
            shutdown: shutdown.clone(),
            watchers,
            snapshot: report,
        })
    }

    /// Current configuration.
    pub fn current(&self) -> Arc<T> {
        self.shared.state.load_full()
    }

    /// A cloneable read handle that outlives borrows of the configurator.
    pub fn handle(&self) -> ConfigHandle<T> {
        ConfigHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn table(&self) -> &BindingTable<T> {
        &self.shared.table
    }

    pub fn namespace(&self) -> Option<&str> {
        self.shared.namespace.as_deref()
    }

    /// Outcome of the initial snapshot.
    pub fn snapshot_report(&self) -> SnapshotReport {
        self.snapshot
    }

    /// Run the update pipeline for a fully-qualified key, as a watcher would.
    pub fn apply(&self, key: &str, text: &str) -> Result<Arc<T>> {
        let binding = self
            .shared
            .table
            .lookup(key)
            .ok_or_else(|| Error::UnknownKey(key.to_string()))?;
        Ok(pipeline::apply(binding, &self.shared.state, text)?)
    }

    /// Number of watchers started at construction.
    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Number of watchers that have not exited yet.
    pub fn running_watchers(&self) -> usize {
        self.watchers.running()
    }

    pub fn shutdown_token(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Wait for every watcher to exit after the token has fired elsewhere.
    pub async fn join(&mut self) {
        self.watchers.join_all().await;
    }

    /// Fire the shutdown token and wait for every watcher to exit.
    pub async fn shutdown(&mut self) {
        self.shutdown.trigger();
        self.watchers.join_all().await;
        tracing::info!("Configurator stopped");
    }
}

impl<T> fmt::Debug for Configurator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configurator")
            .field("namespace", &self.shared.namespace)
            .field("bindings", &self.shared.table.len())
            .field("watchers", &self.watchers.len())
            .finish()
    }
}

/// Read access to a bound configuration.
pub struct ConfigHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> ConfigHandle<T> {
    pub fn load(&self) -> Arc<T> {
        self.shared.state.load_full()
    }
}

impl<T> Clone for ConfigHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for ConfigHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("namespace", &self.shared.namespace)
            .finish()
    }
}
