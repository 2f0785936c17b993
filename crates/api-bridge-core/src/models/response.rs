//! The response envelope returned by an executor call, a cache hit, or the
//! orchestration engine's mode selection.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

/// Identifies which path produced a [`Response`]; used both for metrics tags
/// and by the Orchestration Engine when choosing which side to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Legacy,
    Modern,
    Cache,
    ExternalApi,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Legacy => "legacy",
            Source::Modern => "modern",
            Source::Cache => "cache",
            Source::ExternalApi => "external-api",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub request_id: String,
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
    pub source: Source,
    pub error: Option<String>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
