//! The inbound request envelope processed by the engine.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A single client request, built by `api-bridge-server`'s data-plane route
/// from the raw HTTP method, path, query string, headers and body.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    pub path: String,
    /// Header keys are stored lower-cased so lookups are case-insensitive.
    pub headers: HashMap<String, String>,
    /// Query params in the order they appeared on the wire.
    pub query_params: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub client_ip: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Request {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("request id must not be empty".to_string());
        }
        if self.method.trim().is_empty() {
            return Err("request method must not be empty".to_string());
        }
        if self.path.trim().is_empty() {
            return Err("request path must not be empty".to_string());
        }
        Ok(())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    /// The cache/routing-resolver lookup key: `method:path`.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.method, self.path)
    }
}
