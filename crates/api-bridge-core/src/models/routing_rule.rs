//! Request-to-endpoint mapping with glob path patterns.
//!
//! A plain data struct with a `validate` method; regex compilation is kept
//! out of the type itself (see [`crate::services::resolver`] for the
//! compiled-pattern cache).

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single routing rule: matches requests by path glob and method, and
/// names the endpoint(s) a matching request should be dispatched to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingRule {
    pub id: String,
    pub path_pattern: String,
    /// Exact HTTP method or `"*"` to match any method.
    pub method_pattern: String,
    pub endpoint_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_endpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modern_endpoint_id: Option<String>,
    pub priority: i64,
    pub active: bool,
    pub cache_enabled: bool,
    pub cache_ttl_seconds: u64,
}

impl RoutingRule {
    pub fn validate(&self) -> Result<(), String> {
        if self.path_pattern.trim().is_empty() {
            return Err("routing rule path_pattern must not be empty".to_string());
        }
        if self.endpoint_id.trim().is_empty() {
            return Err("routing rule endpoint_id must not be empty".to_string());
        }
        if self.cache_enabled && self.cache_ttl_seconds == 0 {
            return Err(
                "routing rule cache_ttl_seconds must be greater than zero when cache_enabled"
                    .to_string(),
            );
        }
        Ok(())
    }

    /// Compiles the glob path pattern into an anchored regex: `*` maps to
    /// `.*`, every other character is escaped.
    pub fn compile_path_pattern(&self) -> Result<Regex, regex::Error> {
        let mut out = String::with_capacity(self.path_pattern.len() * 2 + 2);
        out.push('^');
        for ch in self.path_pattern.chars() {
            if ch == '*' {
                out.push_str(".*");
            } else {
                out.push_str(&regex::escape(&ch.to_string()));
            }
        }
        out.push('$');
        Regex::new(&out)
    }

    pub fn matches_method(&self, method: &str) -> bool {
        self.method_pattern == "*" || self.method_pattern.eq_ignore_ascii_case(method)
    }

    /// The synthetic rule produced by the Resolver when no candidate rule
    /// matches and a default legacy endpoint exists.
    pub fn synthesize_default(endpoint_id: &str, method: &str, path: &str) -> Self {
        Self {
            id: "default-legacy-route".to_string(),
            path_pattern: path.to_string(),
            method_pattern: method.to_string(),
            endpoint_id: endpoint_id.to_string(),
            legacy_endpoint_id: None,
            modern_endpoint_id: None,
            priority: i64::MAX,
            active: true,
            cache_enabled: false,
            cache_ttl_seconds: 0,
        }
    }

    pub fn is_default(&self) -> bool {
        self.id == "default-legacy-route"
    }
}
