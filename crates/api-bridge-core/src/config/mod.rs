//! Process configuration: YAML file loading, environment overrides, and the
//! comprehensive validator the process runs once at startup.
//!
//! # Module Organization
//!
//! - [`settings`] - Loads [`crate::models::settings::Settings`] from a YAML
//!   file, honoring environment-variable overrides for the most commonly
//!   tuned knobs.
//! - [`validation`] - [`validation::ConfigValidator`], which runs structural,
//!   security and performance checks over a loaded `Settings` and returns a
//!   [`validation::ValidationResult`] of errors/warnings/recommendations.

pub mod settings;
pub mod validation;
