//! Upstream service definitions.
//!
//! An [`Endpoint`] is a named, addressable backend (legacy or modern) that
//! the bridge can dispatch a request to. Endpoints are owned by whatever
//! [`crate::repository::endpoint_repository::EndpointRepository`] backs the
//! running process; the engine only ever reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single upstream HTTP service the bridge can call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Endpoint {
    pub id: String,
    pub name: String,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_url: Option<String>,
    #[serde(default = "default_method")]
    pub default_method: String,
    pub timeout_seconds: u64,
    pub retry_count: u32,
    pub active: bool,
    #[serde(default)]
    pub is_legacy: bool,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl Endpoint {
    /// Validates the invariants required before an endpoint can be persisted:
    /// non-empty base URL, positive timeout.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("endpoint id must not be empty".to_string());
        }
        if self.base_url.trim().is_empty() {
            return Err("endpoint base_url must not be empty".to_string());
        }
        if self.timeout_seconds == 0 {
            return Err("endpoint timeout_seconds must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}
