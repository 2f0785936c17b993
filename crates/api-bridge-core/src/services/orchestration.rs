//! The Orchestration Engine: drives the Parallel Dispatcher into a
//! recorded [`ApiComparison`], and owns the auto-transition policy that
//! promotes a route from `Parallel` to `ModernOnly` (and rolls it back).
//!
//! `evaluate_transition`/`execute_transition` form a read-then-act pair
//! in the same shape as a circuit breaker's `ready_to_trip`/`transition`,
//! just driven by comparison history instead of failure counts.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::comparison::{ApiComparison, DiffKind, ResponseDiff, ResponseSnapshot};
use crate::models::endpoint::Endpoint;
use crate::models::error::BridgeError;
use crate::models::orchestration_rule::{Mode, OrchestrationRule};
use crate::models::request::Request;
use crate::models::response::Response;
use crate::repository::{ComparisonRepository, OrchestrationRepository};
use crate::services::comparator::Comparator;
use crate::services::dispatcher::{DispatchOutcome, Dispatcher};
use crate::services::metrics::MetricsCollector;

/// The chosen response to return to the client, plus the recorded
/// comparison, from a single `ProcessParallel` call.
pub struct ParallelOutcome {
    pub response: Response,
    pub comparison: ApiComparison,
}

pub struct OrchestrationEngine {
    dispatcher: Arc<Dispatcher>,
    comparisons: Arc<dyn ComparisonRepository>,
    orchestrations: Arc<dyn OrchestrationRepository>,
    metrics: Arc<MetricsCollector>,
}

impl OrchestrationEngine {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        comparisons: Arc<dyn ComparisonRepository>,
        orchestrations: Arc<dyn OrchestrationRepository>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            dispatcher,
            comparisons,
            orchestrations,
            metrics,
        }
    }

    /// Runs both legs, builds the comparison, and picks the response to
    /// return: legacy when available, else modern, else an error.
    pub async fn process_parallel(
        &self,
        cancel: &CancellationToken,
        request: &Request,
        routing_rule_id: &str,
        legacy: &Endpoint,
        modern: &Endpoint,
        config: &crate::models::orchestration_rule::ComparisonConfig,
    ) -> Result<ParallelOutcome, BridgeError> {
        let start = Instant::now();
        let outcome = self.dispatcher.dispatch(cancel, request, legacy, modern).await;
        let duration = start.elapsed();

        let comparison = self.build_comparison(request, routing_rule_id, &outcome, config);

        self.metrics.record_parallel_call(
            routing_rule_id,
            duration,
            outcome.legacy_err.is_some() || outcome.modern_err.is_some(),
        );
        self.metrics
            .set_comparison_match_rate(routing_rule_id, comparison.match_rate);

        if config.save_comparison_history {
            if let Err(e) = self.comparisons.save(comparison.clone()).await {
                log::warn!("failed to persist comparison for rule '{}': {}", routing_rule_id, e);
            }
        }

        let response = match (outcome.legacy, outcome.modern) {
            (Some(legacy_response), _) => legacy_response,
            (None, Some(modern_response)) => modern_response,
            (None, None) => {
                return Err(BridgeError::BothBackendsFailed {
                    legacy: outcome
                        .legacy_err
                        .map(|e| e.to_string())
                        .unwrap_or_default(),
                    modern: outcome
                        .modern_err
                        .map(|e| e.to_string())
                        .unwrap_or_default(),
                });
            }
        };

        Ok(ParallelOutcome { response, comparison })
    }

    fn build_comparison(
        &self,
        request: &Request,
        routing_rule_id: &str,
        outcome: &DispatchOutcome,
        config: &crate::models::orchestration_rule::ComparisonConfig,
    ) -> ApiComparison {
        let start = Instant::now();

        let (match_rate, diffs) = match (&outcome.legacy, &outcome.modern) {
            (Some(legacy), Some(modern)) => {
                let result = Comparator::compare(&legacy.body, &modern.body, config);
                (result.match_rate, result.diffs)
            }
            (Some(_), None) => (
                0.0,
                vec![ResponseDiff {
                    kind: DiffKind::Extra,
                    path: "modern_response".to_string(),
                    legacy_value: None,
                    modern_value: None,
                    message: format!(
                        "modern call failed: {}",
                        outcome
                            .modern_err
                            .as_ref()
                            .map(|e| e.to_string())
                            .unwrap_or_default()
                    ),
                }],
            ),
            (None, Some(_)) => (
                0.0,
                vec![ResponseDiff {
                    kind: DiffKind::Missing,
                    path: "legacy_response".to_string(),
                    legacy_value: None,
                    modern_value: None,
                    message: format!(
                        "legacy call failed: {}",
                        outcome
                            .legacy_err
                            .as_ref()
                            .map(|e| e.to_string())
                            .unwrap_or_default()
                    ),
                }],
            ),
            (None, None) => (0.0, Vec::new()),
        };

        ApiComparison {
            id: Uuid::new_v4().to_string(),
            request_id: request.id.clone(),
            routing_rule_id: routing_rule_id.to_string(),
            legacy_response: outcome.legacy.as_ref().map(to_snapshot),
            modern_response: outcome.modern.as_ref().map(to_snapshot),
            match_rate,
            diffs,
            comparison_duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        }
    }

    /// `false` when auto-transition is disabled or there isn't yet enough
    /// history; otherwise the arithmetic mean of the most recent
    /// `min_requests_for_transition` comparisons compared against the
    /// rule's threshold.
    pub async fn evaluate_transition(&self, rule: &OrchestrationRule) -> bool {
        if !rule.transition_config.auto_transition_enabled {
            return false;
        }

        let needed = rule.transition_config.min_requests_for_transition as usize;
        let recent = match self
            .comparisons
            .get_recent(&rule.routing_rule_id, needed)
            .await
        {
            Ok(recent) => recent,
            Err(e) => {
                log::warn!(
                    "failed to fetch comparison history for rule '{}': {}",
                    rule.id,
                    e
                );
                return false;
            }
        };

        if recent.len() < needed {
            return false;
        }

        let mean = recent.iter().map(|c| c.match_rate).sum::<f64>() / recent.len() as f64;
        mean >= rule.transition_config.match_rate_threshold && recent.len() >= needed
    }

    /// Persists `new_mode` and emits `api_mode_transitions{rule_id,from,to}`.
    /// Rollback is the same call with [`Mode::LegacyOnly`].
    pub async fn execute_transition(
        &self,
        rule: &OrchestrationRule,
        new_mode: Mode,
    ) -> Result<(), BridgeError> {
        let from = rule.current_mode;
        let mut updated = rule.clone();
        updated.current_mode = new_mode;
        self.orchestrations.update(updated).await?;
        self.metrics
            .record_mode_transition(&rule.id, from.as_str(), new_mode.as_str());
        log::info!(
            "orchestration rule '{}' transitioned {} -> {}",
            rule.id,
            from.as_str(),
            new_mode.as_str()
        );
        Ok(())
    }
}

fn to_snapshot(response: &Response) -> ResponseSnapshot {
    let body = if response.body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&response.body).unwrap_or(serde_json::Value::Null)
    };
    ResponseSnapshot {
        status_code: response.status_code,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::orchestration_rule::{ComparisonConfig, TransitionConfig};
    use crate::repository::in_memory::{InMemoryComparisonRepository, InMemoryOrchestrationRepository};
    use crate::services::circuit_breaker::CircuitBreakerRegistry;
    use crate::services::executor::Executor;
    use crate::services::transport::{Transport, TransportError, TransportRequest, TransportResponse};
    use std::collections::HashMap;
    use std::time::Duration;

    struct PerUrlTransport;

    #[async_trait::async_trait]
    impl Transport for PerUrlTransport {
        async fn send(
            &self,
            request: TransportRequest,
            _timeout: Duration,
        ) -> Result<TransportResponse, TransportError> {
            if request.url.contains("modern") {
                Ok(TransportResponse {
                    status: 200,
                    headers: vec![],
                    body: b"{\"id\":1,\"name\":\"b\"}".to_vec(),
                })
            } else {
                Ok(TransportResponse {
                    status: 200,
                    headers: vec![],
                    body: b"{\"id\":1,\"name\":\"a\"}".to_vec(),
                })
            }
        }
    }

    fn endpoint(id: &str, base_url: &str) -> Endpoint {
        Endpoint {
            id: id.to_string(),
            name: id.to_string(),
            base_url: base_url.to_string(),
            health_url: None,
            default_method: "GET".to_string(),
            timeout_seconds: 5,
            retry_count: 0,
            active: true,
            is_legacy: id == "legacy",
            is_default: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn request() -> Request {
        Request {
            id: "r1".to_string(),
            method: "GET".to_string(),
            path: "/users".to_string(),
            headers: HashMap::new(),
            query_params: Vec::new(),
            body: Vec::new(),
            client_ip: None,
            timestamp: Utc::now(),
        }
    }

    fn engine() -> OrchestrationEngine {
        let executor = Arc::new(Executor::new(
            Arc::new(PerUrlTransport),
            Arc::new(CircuitBreakerRegistry::new(
                Default::default(),
                Arc::new(MetricsCollector::default()),
            )),
            Arc::new(MetricsCollector::default()),
        ));
        let dispatcher = Arc::new(Dispatcher::new(executor));
        OrchestrationEngine::new(
            dispatcher,
            Arc::new(InMemoryComparisonRepository::default()),
            Arc::new(InMemoryOrchestrationRepository::default()),
            Arc::new(MetricsCollector::default()),
        )
    }

    #[tokio::test]
    async fn legacy_response_wins_when_both_succeed() {
        let engine = engine();
        let cancel = CancellationToken::new();
        let outcome = engine
            .process_parallel(
                &cancel,
                &request(),
                "rule-1",
                &endpoint("legacy", "http://legacy"),
                &endpoint("modern", "http://modern"),
                &ComparisonConfig::default(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.response.body, b"{\"id\":1,\"name\":\"a\"}");
        assert!(outcome.comparison.match_rate < 1.0);
    }

    #[tokio::test]
    async fn evaluate_transition_false_when_disabled() {
        let engine = engine();
        let rule = OrchestrationRule {
            id: "o1".to_string(),
            routing_rule_id: "rule-1".to_string(),
            legacy_endpoint_id: "legacy".to_string(),
            modern_endpoint_id: "modern".to_string(),
            current_mode: Mode::Parallel,
            transition_config: TransitionConfig {
                auto_transition_enabled: false,
                ..TransitionConfig::default()
            },
            comparison_config: ComparisonConfig::default(),
            active: true,
        };
        assert!(!engine.evaluate_transition(&rule).await);
    }

    #[tokio::test]
    async fn evaluate_transition_false_without_enough_history() {
        let engine = engine();
        let rule = OrchestrationRule {
            id: "o1".to_string(),
            routing_rule_id: "rule-1".to_string(),
            legacy_endpoint_id: "legacy".to_string(),
            modern_endpoint_id: "modern".to_string(),
            current_mode: Mode::Parallel,
            transition_config: TransitionConfig {
                auto_transition_enabled: true,
                min_requests_for_transition: 5,
                ..TransitionConfig::default()
            },
            comparison_config: ComparisonConfig::default(),
            active: true,
        };
        assert!(!engine.evaluate_transition(&rule).await);
    }
}
