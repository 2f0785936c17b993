//! The Request Processor: the top-level per-request pipeline tying
//! every other service together.
//!
//! Validate, resolve, dispatch, respond, record metrics — generalized
//! from a single proxy hop into the legacy/modern mode-branching pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::ResponseError;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
use crate::models::endpoint::Endpoint;
use crate::models::error::BridgeError;
use crate::models::orchestration_rule::{Mode, OrchestrationRule};
use crate::models::request::Request;
use crate::models::response::{Response, Source};
use crate::models::routing_rule::RoutingRule;
use crate::repository::{CacheRepository, OrchestrationRepository};
use crate::services::cache::LocalCache;
use crate::services::executor::Executor;
use crate::services::metrics::MetricsCollector;
use crate::services::orchestration::OrchestrationEngine;
use crate::services::registry::EndpointRegistry;
use crate::services::resolver::Resolver;

pub struct RequestProcessor {
    resolver: Arc<Resolver>,
    endpoints: Arc<EndpointRegistry>,
    orchestrations: Arc<dyn OrchestrationRepository>,
    orchestration_engine: Arc<OrchestrationEngine>,
    executor: Arc<Executor>,
    cache: Arc<LocalCache>,
    metrics: Arc<MetricsCollector>,
    max_cache_ttl: Duration,
}

impl RequestProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: Arc<Resolver>,
        endpoints: Arc<EndpointRegistry>,
        orchestrations: Arc<dyn OrchestrationRepository>,
        orchestration_engine: Arc<OrchestrationEngine>,
        executor: Arc<Executor>,
        cache: Arc<LocalCache>,
        metrics: Arc<MetricsCollector>,
        max_cache_ttl: Duration,
    ) -> Self {
        Self {
            resolver,
            endpoints,
            orchestrations,
            orchestration_engine,
            executor,
            cache,
            metrics,
            max_cache_ttl,
        }
    }

    pub async fn process(
        &self,
        cancel: &CancellationToken,
        request: &Request,
    ) -> Result<Response, BridgeError> {
        let start = Instant::now();
        let result = self.process_inner(cancel, request).await;
        let status = match &result {
            Ok(response) => response.status_code,
            Err(error) => error.status_code().as_u16(),
        };
        self.metrics
            .record_http_request(&request.method, &request.path, status, start.elapsed());
        result
    }

    async fn process_inner(
        &self,
        cancel: &CancellationToken,
        request: &Request,
    ) -> Result<Response, BridgeError> {
        request
            .validate()
            .map_err(BridgeError::ValidationError)?;

        let rule = self.resolver.resolve(request).await;

        let orchestration = self
            .orchestrations
            .find_by_routing_rule_id(&rule.id)
            .await?;

        match orchestration {
            Some(orchestration) => self.process_with_orchestration(cancel, request, &rule, orchestration).await,
            None if rule.is_default() => self.process_default_fallback(cancel, request, &rule).await,
            None => self.process_single(cancel, request, &rule.endpoint_id, Source::ExternalApi, &rule).await,
        }
    }

    /// Mode branching per the orchestration rule attached to this route.
    async fn process_with_orchestration(
        &self,
        cancel: &CancellationToken,
        request: &Request,
        rule: &RoutingRule,
        orchestration: OrchestrationRule,
    ) -> Result<Response, BridgeError> {
        match orchestration.current_mode {
            Mode::LegacyOnly => {
                self.process_single(cancel, request, &orchestration.legacy_endpoint_id, Source::Legacy, rule)
                    .await
            }
            Mode::ModernOnly => {
                self.process_single(cancel, request, &orchestration.modern_endpoint_id, Source::Modern, rule)
                    .await
            }
            Mode::Parallel => self.process_parallel(cancel, request, rule, &orchestration).await,
        }
    }

    /// The Resolver fell back to the synthetic default-legacy route. If a
    /// default modern endpoint also exists, synthesize an ephemeral Parallel
    /// orchestration rule; otherwise fall straight through to single-API.
    async fn process_default_fallback(
        &self,
        cancel: &CancellationToken,
        request: &Request,
        rule: &RoutingRule,
    ) -> Result<Response, BridgeError> {
        let default_modern = self.endpoints.find_default_modern().await.ok().flatten();

        match default_modern {
            Some(modern) => {
                let synthetic = OrchestrationRule::synthesize_default(&rule.endpoint_id, &modern.id);
                self.process_parallel(cancel, request, rule, &synthetic).await
            }
            None => {
                self.process_single(cancel, request, &rule.endpoint_id, Source::Legacy, rule)
                    .await
            }
        }
    }

    async fn process_single(
        &self,
        cancel: &CancellationToken,
        request: &Request,
        endpoint_id: &str,
        source: Source,
        rule: &RoutingRule,
    ) -> Result<Response, BridgeError> {
        let cache_key = LocalCache::build_key(&request.method, &request.path);

        if rule.cache_enabled {
            if let Some(cached) = self.cache.get(&cache_key).await? {
                self.metrics.record_cache_hit();
                return Ok(Response {
                    request_id: request.id.clone(),
                    status_code: 200,
                    headers: Default::default(),
                    body: cached,
                    content_type: Some("application/json".to_string()),
                    timestamp: chrono::Utc::now(),
                    duration: Duration::from_secs(0),
                    source: Source::Cache,
                    error: None,
                });
            }
            self.metrics.record_cache_miss();
        }

        let endpoint = self.endpoints.find_active(endpoint_id).await?;
        let mut response = self.executor.send_with_retry(cancel, &endpoint, request).await?;
        response.source = source;

        if rule.cache_enabled && response.is_success() {
            let ttl = Duration::from_secs(rule.cache_ttl_seconds).min(self.max_cache_ttl);
            if let Err(e) = self.cache.set(&cache_key, response.body.clone(), ttl).await {
                log::warn!("cache write failed for key '{}': {}", cache_key, e);
            }
        }

        Ok(response)
    }

    async fn process_parallel(
        &self,
        cancel: &CancellationToken,
        request: &Request,
        rule: &RoutingRule,
        orchestration: &OrchestrationRule,
    ) -> Result<Response, BridgeError> {
        let legacy = self.endpoints.find_active(&orchestration.legacy_endpoint_id).await?;
        let modern = self.endpoints.find_active(&orchestration.modern_endpoint_id).await?;

        let outcome = self
            .orchestration_engine
            .process_parallel(
                cancel,
                request,
                &rule.id,
                &legacy,
                &modern,
                &orchestration.comparison_config,
            )
            .await?;

        if orchestration.id != "default-orchestration-rule" {
            self.schedule_transition_evaluation(orchestration.clone());
        }

        Ok(outcome.response)
    }

    /// Detached from the client request: only the rule id and a clone of the
    /// rule travel into the task, per the "must not hold references to
    /// request-scoped context" rule.
    fn schedule_transition_evaluation(&self, rule: OrchestrationRule) {
        let engine = self.orchestration_engine.clone();
        tokio::spawn(async move {
            if rule.current_mode != Mode::Parallel {
                return;
            }
            if engine.evaluate_transition(&rule).await {
                if let Err(e) = engine.execute_transition(&rule, Mode::ModernOnly).await {
                    log::warn!(
                        "failed to execute transition for orchestration rule '{}': {}",
                        rule.id,
                        e
                    );
                }
            }
        });
    }
}
