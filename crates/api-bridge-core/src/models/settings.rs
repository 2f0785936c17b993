//! Process configuration loaded from YAML plus environment overrides.
//!
//! A tree of `Default`-able sub-structs, each with its own `validate()`,
//! rolled up into one top-level `validate()` the process calls once at
//! startup.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Local,
    Redis,
    Mock,
}

impl Default for CacheBackend {
    fn default() -> Self {
        CacheBackend::Local
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSettings {
    #[serde(default)]
    pub backend: CacheBackend,
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_cache_max_ttl_seconds")]
    pub max_ttl_seconds: u64,
    #[serde(default)]
    pub redis_endpoint: Option<String>,
    #[serde(default)]
    pub redis_username: Option<String>,
    #[serde(default)]
    pub redis_password: Option<String>,
}

fn default_cache_max_entries() -> usize {
    10_000
}

fn default_cache_max_ttl_seconds() -> u64 {
    3600
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            max_entries: default_cache_max_entries(),
            max_ttl_seconds: default_cache_max_ttl_seconds(),
            redis_endpoint: None,
            redis_username: None,
            redis_password: None,
        }
    }
}

impl CacheSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.backend == CacheBackend::Redis && self.redis_endpoint.is_none() {
            return Err("cache.redis_endpoint is required when cache.backend is 'redis'".to_string());
        }
        if self.max_entries == 0 {
            return Err("cache.max_entries must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Defaults applied to every outbound call unless an endpoint overrides them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalApiSettings {
    #[serde(default = "default_timeout_seconds")]
    pub default_timeout_seconds: u64,
    #[serde(default = "default_retry_count")]
    pub default_retry_count: u32,
    #[serde(default = "default_backoff_seconds")]
    pub backoff_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    5
}

fn default_retry_count() -> u32 {
    2
}

fn default_backoff_seconds() -> u64 {
    1
}

impl Default for ExternalApiSettings {
    fn default() -> Self {
        Self {
            default_timeout_seconds: default_timeout_seconds(),
            default_retry_count: default_retry_count(),
            backoff_seconds: default_backoff_seconds(),
        }
    }
}

impl ExternalApiSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.default_timeout_seconds == 0 {
            return Err("external_api.default_timeout_seconds must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Process-wide circuit breaker defaults; an individual breaker may be
/// constructed with a different [`crate::services::circuit_breaker::TripPolicy`]
/// but inherits these timing parameters unless overridden.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitBreakerSettings {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u64,
    #[serde(default = "default_half_open_max_requests")]
    pub half_open_max_requests: u64,
    #[serde(default = "default_reset_interval_seconds")]
    pub reset_interval_seconds: u64,
    #[serde(default = "default_open_timeout_seconds")]
    pub open_timeout_seconds: u64,
}

fn default_failure_threshold() -> u64 {
    5
}

fn default_half_open_max_requests() -> u64 {
    3
}

fn default_reset_interval_seconds() -> u64 {
    10
}

fn default_open_timeout_seconds() -> u64 {
    30
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            half_open_max_requests: default_half_open_max_requests(),
            reset_interval_seconds: default_reset_interval_seconds(),
            open_timeout_seconds: default_open_timeout_seconds(),
        }
    }
}

impl CircuitBreakerSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("circuit_breaker.failure_threshold must be greater than zero".to_string());
        }
        if self.half_open_max_requests == 0 {
            return Err(
                "circuit_breaker.half_open_max_requests must be greater than zero".to_string(),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_output")]
    pub output: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_output() -> String {
    "stdout".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            output: default_log_output(),
        }
    }
}

fn default_port() -> u16 {
    10019
}

/// Top-level process configuration, loaded once at startup by
/// `config::settings::load_settings`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database_dsn: Option<String>,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub external_api: ExternalApiSettings,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
    #[serde(default)]
    pub endpoints: Vec<crate::models::endpoint::Endpoint>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_dsn: None,
            logging: LoggingSettings::default(),
            cache: CacheSettings::default(),
            external_api: ExternalApiSettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            endpoints: Vec::new(),
        }
    }
}

impl Settings {
    /// Validates every nested section, returning the first failure
    /// encountered.
    pub fn validate(&self) -> Result<(), String> {
        self.cache.validate()?;
        self.external_api.validate()?;
        self.circuit_breaker.validate()?;
        for endpoint in &self.endpoints {
            endpoint.validate()?;
        }
        Ok(())
    }
}
