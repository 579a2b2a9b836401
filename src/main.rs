//! Demo: a configuration structure kept live from Consul.
//!
//! ```text
//! DemoProject/token       → token      (default "true")
//! DemoProject/api-url     → api_url    (default "http://www.demo.com")
//! DemoProject/api-port    → api_port   (watched, api_port_updated)
//! DemoProject/user-redis  → redis      (watched, redis_updated)
//! ```
//!
//! Change a watched key in Consul and the handler logs the whole
//! configuration as JSON. SIGINT/SIGTERM stops the watchers.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use owl_config::config::load_config;
use owl_config::lifecycle::signals::wait_for_shutdown_signal;
use owl_config::observability::{logging::init_logging, metrics::init_metrics};
use owl_config::{Configurable, Configurator, Field, OwlConfig, SchemaBuilder, Shutdown};

#[derive(Parser)]
#[command(name = "owl-demo")]
#[command(
    about = "Bind a demo configuration to Consul KV and follow its changes",
    long_about = None
)]
struct Cli {
    /// Options file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store address; overrides `store.address` from the options file.
    #[arg(short, long)]
    address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
struct DemoConfig {
    token: bool,
    #[serde(rename = "api-url")]
    api_url: String,
    #[serde(rename = "api-port")]
    api_port: Option<i64>,
    #[serde(rename = "user-redis")]
    redis: Option<String>,
}

impl DemoConfig {
    fn as_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("<unserializable: {e}>"))
    }

    fn redis_updated(&self, key: &str, value: &str) {
        tracing::info!(key, value, config = %self.as_json(), "Redis endpoint updated");
    }

    fn api_port_updated(&self, key: &str, value: &str) {
        tracing::info!(key, value, config = %self.as_json(), "API port updated");
    }
}

impl Configurable for DemoConfig {
    fn schema() -> SchemaBuilder<Self> {
        SchemaBuilder::new()
            .namespace("DemoProject")
            .handler("api_port_updated", DemoConfig::api_port_updated)
            .handler("redis_updated", DemoConfig::redis_updated)
            .field(Field::bind("token", |c: &mut Self| &mut c.token).default_value("true"))
            .field(
                Field::bind("api-url", |c: &mut Self| &mut c.api_url)
                    .default_value("http://www.demo.com"),
            )
            .field(Field::bind("api-port:api_port_updated", |c: &mut Self| &mut c.api_port))
            .field(Field::bind("user-redis:redis_updated", |c: &mut Self| &mut c.redis))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let options = match &cli.config {
        Some(path) => load_config(path)?,
        None => OwlConfig::default(),
    };

    init_logging(&options.observability)?;

    if options.observability.metrics_enabled {
        match options.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %options.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let address = cli.address.unwrap_or_else(|| options.store.address.clone());
    tracing::info!(address = %address, "owl-demo starting");

    let shutdown = Shutdown::new();
    let mut configurator =
        Configurator::with_shutdown(&shutdown, DemoConfig::default(), &address, &options).await?;

    tracing::info!(
        config = %configurator.current().as_json(),
        watchers = configurator.watcher_count(),
        "Configuration loaded"
    );

    wait_for_shutdown_signal().await?;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
    configurator.join().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
