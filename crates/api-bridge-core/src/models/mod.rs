//! Data models and domain types for the API bridge engine.
//!
//! This module contains all the core data structures used throughout the
//! bridge: configuration entities normally owned by a repository (endpoints,
//! routing rules, orchestration rules), the per-call request/response
//! envelopes, and the comparison records produced when both backends are
//! called for the same client request.
//!
//! # Module Organization
//!
//! - [`endpoint`] - Upstream service definitions (legacy/modern backends)
//! - [`routing_rule`] - Request-to-endpoint mapping with glob path patterns
//! - [`orchestration_rule`] - Per-route dispatch mode and transition policy
//! - [`request`] / [`response`] - The request/response envelopes processed per call
//! - [`comparison`] - Recorded legacy/modern comparison outcomes
//! - [`error`] - The bridge's error taxonomy, mapped to HTTP responses
//! - [`settings`] - Process configuration (server, cache, breaker defaults)
//!
//! # Design Principles
//!
//! - **Type Safety**: Leverage Rust's type system instead of stringly-typed data
//! - **Validation**: Every entity that can be created via the management surface
//!   carries a `validate(&self) -> Result<(), String>` method
//! - **Serialization**: Full serde support so repository and HTTP-surface
//!   implementations can round-trip these types as JSON or YAML
//! - **Documentation**: Density matched to how central the type is to the engine

pub mod comparison;
pub mod endpoint;
pub mod error;
pub mod orchestration_rule;
pub mod request;
pub mod response;
pub mod routing_rule;
pub mod settings;
