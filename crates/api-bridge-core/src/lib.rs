//! # API Bridge
//!
//! A request-processing engine for mediating client traffic between a legacy
//! HTTP API and a modern HTTP API during a controlled migration. For every
//! inbound request the engine resolves a routing rule, dispatches to one or
//! both backends, compares the responses when both are called, and decides
//! whether the modern backend is ready to serve traffic alone.
//!
//! ## Module Organization
//!
//! - [`models`] - Domain types: endpoints, routing rules, orchestration
//!   rules, requests/responses, comparisons, the error taxonomy, settings.
//! - [`repository`] - Persistence contracts (traits) plus an in-memory
//!   implementation of each, sufficient to run the engine end to end.
//! - [`services`] - The engine itself: resolver, registry, circuit breaker,
//!   executor, dispatcher, comparator, orchestration, cache, processor.
//! - [`config`] - Process configuration loading and validation.
//! - [`logs`] - Structured logger configuration.
//!
//! ## Control Flow
//!
//! ```text
//! Processor -> Resolver -> (cache?) -> Orchestration -> Dispatcher
//!           -> Executor(x1 or x2) -> Comparator -> Orchestration
//!           (persist + evaluate) -> Response
//! ```
//!
//! Persistent stores, the CRUD management surface, process bootstrap and the
//! external HTTP transport are external collaborators: this crate defines
//! their contracts and ships in-memory/reqwest implementations, but a real
//! deployment is free to swap them out.

pub mod config;
pub mod logs;
pub mod models;
pub mod repository;
pub mod services;
pub mod utils;
