//! Service layer: the engine's business logic, sitting between the
//! repository contracts (persistence) and `api-bridge-server`'s HTTP
//! wiring.
//!
//! # Module Organization
//!
//! - [`resolver`] — Routing Resolver: request → routing rule, TTL cached
//! - [`registry`] — Endpoint Registry: active-endpoint lookups
//! - [`circuit_breaker`] — Circuit Breaker Registry
//! - [`transport`] — thin HTTP transport contract behind the Executor
//! - [`executor`] — External Call Executor: single call + retry policy
//! - [`dispatcher`] — Parallel Dispatcher: concurrent legacy/modern legs
//! - [`comparator`] — JSON Comparator: recursive response diffing
//! - [`orchestration`] — Orchestration Engine: mode policy, transitions
//! - [`cache`] — Response Cache
//! - [`processor`] — Request Processor: the top-level pipeline
//! - [`metrics`] — process-wide metric collection and Prometheus rendering
//!
//! # Architecture
//!
//! ```text
//! Client → Processor → Resolver → Orchestration lookup
//!                                       ↓
//!                    ┌──────────────────┼──────────────────┐
//!              LegacyOnly          ModernOnly            Parallel
//!                    ↓                  ↓                    ↓
//!                 Executor           Executor            Dispatcher
//!                    ↓                  ↓               ↙          ↘
//!                 Response           Response       Executor     Executor
//!                                                        ↘          ↙
//!                                                    Comparator
//! ```

pub mod cache;
pub mod circuit_breaker;
pub mod comparator;
pub mod dispatcher;
pub mod executor;
pub mod metrics;
pub mod orchestration;
pub mod processor;
pub mod registry;
pub mod resolver;
pub mod transport;
