//! Schema subsystem: binds configuration fields to remote keys.
//!
//! # Data Flow
//! ```text
//! Configurable::schema()
//!     → builder.rs (fields, handlers, namespace in declaration order)
//!     → annotation.rs (parse `key[:h1,h2|*]`)
//!     → key.rs (namespace join)
//!     → table.rs (BindingTable: arena + key index, read-only afterwards)
//! ```
//!
//! # Design Decisions
//! - Fields are reached through typed accessors, never looked up by name
//! - Bindings are addressed by `BindingId` into one arena
//! - Handler names resolve against an explicit registry; misses are dropped
//! - A key bound twice is a build error

pub mod annotation;
pub mod builder;
pub mod key;
pub mod table;

pub use annotation::{Annotation, AnnotationError};
pub use builder::{Configurable, Field, Schema, SchemaBuilder};
pub use table::{Binding, BindingId, BindingTable, Handler, SchemaError};
