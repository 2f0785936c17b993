//! Recorded legacy/modern comparison outcomes, produced by
//! [`crate::services::comparator`] and persisted through
//! [`crate::repository::comparison_repository::ComparisonRepository`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The kind of disagreement found at a JSON path by the comparator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum DiffKind {
    ValueMismatch,
    TypeMismatch,
    Missing,
    Extra,
}

/// A single field-level disagreement between a legacy and a modern response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseDiff {
    pub kind: DiffKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modern_value: Option<serde_json::Value>,
    pub message: String,
}

/// A snapshot of a single body/status pair as recorded in a comparison, kept
/// separate from the live [`crate::models::response::Response`] so a
/// persisted comparison doesn't carry transport-layer fields like headers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseSnapshot {
    pub status_code: u16,
    pub body: serde_json::Value,
}

/// The outcome of comparing a legacy and a modern response for the same
/// request, produced by `Orchestration::ProcessParallel`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiComparison {
    pub id: String,
    pub request_id: String,
    pub routing_rule_id: String,
    pub legacy_response: Option<ResponseSnapshot>,
    pub modern_response: Option<ResponseSnapshot>,
    pub match_rate: f64,
    pub diffs: Vec<ResponseDiff>,
    pub comparison_duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ApiComparison {
    pub fn comparison_duration(&self) -> Duration {
        Duration::from_millis(self.comparison_duration_ms)
    }

    /// The globally fixed API-wide comparison success bar (distinct from a
    /// rule's own `match_rate_threshold`).
    pub const SUCCESS_BAR: f64 = 0.95;

    pub fn is_successful(&self) -> bool {
        self.match_rate >= Self::SUCCESS_BAR
    }
}
