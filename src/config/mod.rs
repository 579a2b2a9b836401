//! Options subsystem: how the configurator itself is tuned.
//!
//! # Data Flow
//! ```text
//! options file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → OwlConfig (validated, immutable)
//!     → passed by reference to Configurator constructors
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    LogFormat, ObservabilityConfig, OwlConfig, SnapshotConfig, SnapshotPolicy, StoreConfig,
    WatchConfig,
};
pub use validation::ValidationError;
