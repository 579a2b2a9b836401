//! Resilience for long-lived watches.
//!
//! # Design Decisions
//! - Watchers retry forever; backoff only paces them
//! - Jittered backoff keeps many watchers from reconnecting in lockstep

pub mod backoff;

pub use backoff::Backoff;
