//! Structured logging configuration.
//!
//! # Module Organization
//!
//! - [`logger`] - `env_logger` setup: aligned `[LEVEL] | file:line |` output,
//!   color support honoring `NO_COLOR`, level filtering via `RUST_LOG`.

pub mod logger;
