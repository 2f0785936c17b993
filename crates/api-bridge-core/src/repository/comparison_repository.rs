//! Persistence contract for [`ApiComparison`](crate::models::comparison::ApiComparison)
//! history, consulted by `Orchestration::EvaluateTransition`.

use crate::models::comparison::ApiComparison;
use crate::models::error::BridgeError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Aggregate statistics over a window of stored comparisons for a routing
/// rule, used by the management surface's reporting endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonStatistics {
    pub routing_rule_id: String,
    pub sample_count: u64,
    pub mean_match_rate: f64,
    pub min_match_rate: f64,
    pub max_match_rate: f64,
}

#[async_trait::async_trait]
pub trait ComparisonRepository: Send + Sync {
    async fn save(&self, comparison: ApiComparison) -> Result<(), BridgeError>;

    /// Most recent `limit` comparisons for `routing_rule_id`, newest first.
    async fn get_recent(
        &self,
        routing_rule_id: &str,
        limit: usize,
    ) -> Result<Vec<ApiComparison>, BridgeError>;

    async fn get_statistics(
        &self,
        routing_rule_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<ComparisonStatistics, BridgeError>;
}
