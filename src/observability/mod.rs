//! Log subscriber setup for the `contract-guard` binary.
//!
//! Structured logging with configurable formats (pretty, compact, JSON) and
//! `RUST_LOG`-aware filtering.

mod tracing_init;

pub use tracing_init::*;
