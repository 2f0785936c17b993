//! End-to-end scenario coverage: routing resolution through the full
//! `RequestProcessor` pipeline, backed by the in-memory repositories and a
//! scripted [`Transport`], the same harness shape the inline processor
//! tests use.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use api_bridge_core::models::endpoint::Endpoint;
use api_bridge_core::models::orchestration_rule::{ComparisonConfig, Mode, OrchestrationRule, TransitionConfig};
use api_bridge_core::models::request::Request;
use api_bridge_core::models::response::Source;
use api_bridge_core::models::routing_rule::RoutingRule;
use api_bridge_core::repository::in_memory::{
    InMemoryComparisonRepository, InMemoryEndpointRepository, InMemoryOrchestrationRepository,
    InMemoryRoutingRepository,
};
use api_bridge_core::repository::{ComparisonRepository, EndpointRepository, OrchestrationRepository, RoutingRepository};
use api_bridge_core::services::cache::LocalCache;
use api_bridge_core::services::circuit_breaker::CircuitBreakerRegistry;
use api_bridge_core::services::dispatcher::Dispatcher;
use api_bridge_core::services::executor::Executor;
use api_bridge_core::services::metrics::MetricsCollector;
use api_bridge_core::services::orchestration::OrchestrationEngine;
use api_bridge_core::services::processor::RequestProcessor;
use api_bridge_core::services::registry::EndpointRegistry;
use api_bridge_core::services::resolver::Resolver;
use api_bridge_core::services::transport::{Transport, TransportError, TransportRequest, TransportResponse};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

fn endpoint(id: &str, base_url: &str, is_legacy: bool, is_default: bool) -> Endpoint {
    Endpoint {
        id: id.to_string(),
        name: id.to_string(),
        base_url: base_url.to_string(),
        health_url: None,
        default_method: "GET".to_string(),
        timeout_seconds: 5,
        retry_count: 0,
        active: true,
        is_legacy,
        is_default,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn request(path: &str) -> Request {
    Request {
        id: "req-1".to_string(),
        method: "GET".to_string(),
        path: path.to_string(),
        headers: HashMap::new(),
        query_params: Vec::new(),
        body: Vec::new(),
        client_ip: None,
        timestamp: Utc::now(),
    }
}

/// Responds with a fixed body for any URL containing `legacy`, a different
/// fixed body for any URL containing `modern`, and fails modern calls when
/// `fail_modern` is set — enough to drive the parallel-mode tests independently.
struct ScriptedTransport {
    legacy_body: &'static [u8],
    modern_body: &'static [u8],
    fail_modern: bool,
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: TransportRequest,
        _timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        if request.url.contains("modern") {
            if self.fail_modern {
                return Err(TransportError::ConnectionReset);
            }
            return Ok(TransportResponse {
                status: 200,
                headers: vec![],
                body: self.modern_body.to_vec(),
            });
        }
        Ok(TransportResponse {
            status: 200,
            headers: vec![],
            body: self.legacy_body.to_vec(),
        })
    }
}

struct Harness {
    processor: RequestProcessor,
    routing_repo: Arc<InMemoryRoutingRepository>,
    endpoint_repo: Arc<InMemoryEndpointRepository>,
    orchestration_repo: Arc<InMemoryOrchestrationRepository>,
    comparison_repo: Arc<InMemoryComparisonRepository>,
}

fn build_harness(transport: Arc<dyn Transport>) -> Harness {
    let endpoint_repo = Arc::new(InMemoryEndpointRepository::default());
    let routing_repo = Arc::new(InMemoryRoutingRepository::default());
    let orchestration_repo = Arc::new(InMemoryOrchestrationRepository::default());
    let comparison_repo = Arc::new(InMemoryComparisonRepository::default());

    let metrics = Arc::new(MetricsCollector::default());
    let registry = Arc::new(EndpointRegistry::new(endpoint_repo.clone()));
    let resolver = Arc::new(Resolver::with_default_ttl(
        routing_repo.clone(),
        registry.clone(),
        metrics.clone(),
    ));
    let executor = Arc::new(Executor::new(
        transport,
        Arc::new(CircuitBreakerRegistry::new(Default::default(), metrics.clone())),
        metrics.clone(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(executor.clone()));
    let engine = Arc::new(OrchestrationEngine::new(
        dispatcher,
        comparison_repo.clone(),
        orchestration_repo.clone(),
        metrics.clone(),
    ));
    let cache = Arc::new(LocalCache::new(Duration::from_secs(3600)));

    let processor = RequestProcessor::new(
        resolver,
        registry,
        orchestration_repo.clone(),
        engine,
        executor,
        cache,
        metrics,
        Duration::from_secs(3600),
    );

    Harness {
        processor,
        routing_repo,
        endpoint_repo,
        orchestration_repo,
        comparison_repo,
    }
}

/// Single legacy path, cache disabled.
#[tokio::test]
async fn single_legacy_path_no_cache() {
    let harness = build_harness(Arc::new(ScriptedTransport {
        legacy_body: br#"{"id":1}"#,
        modern_body: br#"{"id":1}"#,
        fail_modern: false,
    }));
    harness
        .endpoint_repo
        .create(endpoint("legacy", "http://legacy/api", true, false))
        .await
        .unwrap();
    harness
        .routing_repo
        .create(RoutingRule {
            id: "r1".to_string(),
            path_pattern: "/users".to_string(),
            method_pattern: "GET".to_string(),
            endpoint_id: "legacy".to_string(),
            legacy_endpoint_id: None,
            modern_endpoint_id: None,
            priority: 1,
            active: true,
            cache_enabled: false,
            cache_ttl_seconds: 0,
        })
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let response = harness.processor.process(&cancel, &request("/users")).await.unwrap();

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, br#"{"id":1}"#);
    assert_eq!(response.source, Source::ExternalApi);
}

/// Cache hit on the second call within the TTL; the backend is not
/// called again.
#[tokio::test]
async fn cache_hit_skips_backend_on_second_call() {
    let harness = build_harness(Arc::new(ScriptedTransport {
        legacy_body: br#"{"id":1}"#,
        modern_body: br#"{"id":1}"#,
        fail_modern: false,
    }));
    harness
        .endpoint_repo
        .create(endpoint("legacy", "http://legacy/api", true, false))
        .await
        .unwrap();
    harness
        .routing_repo
        .create(RoutingRule {
            id: "r1".to_string(),
            path_pattern: "/users".to_string(),
            method_pattern: "GET".to_string(),
            endpoint_id: "legacy".to_string(),
            legacy_endpoint_id: None,
            modern_endpoint_id: None,
            priority: 1,
            active: true,
            cache_enabled: true,
            cache_ttl_seconds: 60,
        })
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let first = harness.processor.process(&cancel, &request("/users")).await.unwrap();
    assert_eq!(first.source, Source::ExternalApi);
    let second = harness.processor.process(&cancel, &request("/users")).await.unwrap();
    assert_eq!(second.source, Source::Cache);
    assert_eq!(second.body, first.body);
}

/// Parallel mode, identical responses: client gets the legacy body, the
/// persisted comparison has a perfect match rate and no diffs.
#[tokio::test]
async fn parallel_identical_responses_match_rate_one() {
    let harness = build_harness(Arc::new(ScriptedTransport {
        legacy_body: br#"{"id":1,"name":"x"}"#,
        modern_body: br#"{"id":1,"name":"x"}"#,
        fail_modern: false,
    }));
    harness
        .endpoint_repo
        .create(endpoint("legacy", "http://legacy/api", true, false))
        .await
        .unwrap();
    harness
        .endpoint_repo
        .create(endpoint("modern", "http://modern/api", false, false))
        .await
        .unwrap();
    harness
        .routing_repo
        .create(RoutingRule {
            id: "r1".to_string(),
            path_pattern: "/users".to_string(),
            method_pattern: "GET".to_string(),
            endpoint_id: "legacy".to_string(),
            legacy_endpoint_id: Some("legacy".to_string()),
            modern_endpoint_id: Some("modern".to_string()),
            priority: 1,
            active: true,
            cache_enabled: false,
            cache_ttl_seconds: 0,
        })
        .await
        .unwrap();
    harness
        .orchestration_repo
        .create(OrchestrationRule {
            id: "o1".to_string(),
            routing_rule_id: "r1".to_string(),
            legacy_endpoint_id: "legacy".to_string(),
            modern_endpoint_id: "modern".to_string(),
            current_mode: Mode::Parallel,
            transition_config: TransitionConfig::default(),
            comparison_config: ComparisonConfig::default(),
            active: true,
        })
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let response = harness.processor.process(&cancel, &request("/users")).await.unwrap();
    assert_eq!(response.body, br#"{"id":1,"name":"x"}"#);
    assert_eq!(response.source, Source::Legacy);

    // Comparison persistence happens inside process_parallel before the
    // Processor returns, so it is already visible here.
    let recent = harness.comparison_repo.get_recent("r1", 1).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].match_rate, 1.0);
    assert!(recent[0].diffs.is_empty());
}

/// Parallel mode, one field differs: exactly one `ValueMismatch` diff
/// at path `"email"`, match rate around 0.5.
#[tokio::test]
async fn parallel_one_field_differs() {
    let harness = build_harness(Arc::new(ScriptedTransport {
        legacy_body: br#"{"id":1,"email":"a@x"}"#,
        modern_body: br#"{"id":1,"email":"b@x"}"#,
        fail_modern: false,
    }));
    harness
        .endpoint_repo
        .create(endpoint("legacy", "http://legacy/api", true, false))
        .await
        .unwrap();
    harness
        .endpoint_repo
        .create(endpoint("modern", "http://modern/api", false, false))
        .await
        .unwrap();
    harness
        .routing_repo
        .create(RoutingRule {
            id: "r1".to_string(),
            path_pattern: "/users".to_string(),
            method_pattern: "GET".to_string(),
            endpoint_id: "legacy".to_string(),
            legacy_endpoint_id: Some("legacy".to_string()),
            modern_endpoint_id: Some("modern".to_string()),
            priority: 1,
            active: true,
            cache_enabled: false,
            cache_ttl_seconds: 0,
        })
        .await
        .unwrap();
    harness
        .orchestration_repo
        .create(OrchestrationRule {
            id: "o1".to_string(),
            routing_rule_id: "r1".to_string(),
            legacy_endpoint_id: "legacy".to_string(),
            modern_endpoint_id: "modern".to_string(),
            current_mode: Mode::Parallel,
            transition_config: TransitionConfig::default(),
            comparison_config: ComparisonConfig::default(),
            active: true,
        })
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    harness.processor.process(&cancel, &request("/users")).await.unwrap();

    let recent = harness.comparison_repo.get_recent("r1", 1).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].diffs.len(), 1);
    assert_eq!(recent[0].diffs[0].path, "email");
    assert!((recent[0].match_rate - 0.5).abs() < 1e-9);
}

/// Parallel mode, modern fails: client still gets the legacy response,
/// comparison recorded with `match_rate == 0.0` and a single diff at
/// `"modern_response"`.
#[tokio::test]
async fn parallel_modern_fails_client_gets_legacy() {
    let harness = build_harness(Arc::new(ScriptedTransport {
        legacy_body: br#"{"id":1}"#,
        modern_body: br#"{"id":1}"#,
        fail_modern: true,
    }));
    harness
        .endpoint_repo
        .create(endpoint("legacy", "http://legacy/api", true, false))
        .await
        .unwrap();
    harness
        .endpoint_repo
        .create(endpoint("modern", "http://modern/api", false, false))
        .await
        .unwrap();
    harness
        .routing_repo
        .create(RoutingRule {
            id: "r1".to_string(),
            path_pattern: "/users".to_string(),
            method_pattern: "GET".to_string(),
            endpoint_id: "legacy".to_string(),
            legacy_endpoint_id: Some("legacy".to_string()),
            modern_endpoint_id: Some("modern".to_string()),
            priority: 1,
            active: true,
            cache_enabled: false,
            cache_ttl_seconds: 0,
        })
        .await
        .unwrap();
    harness
        .orchestration_repo
        .create(OrchestrationRule {
            id: "o1".to_string(),
            routing_rule_id: "r1".to_string(),
            legacy_endpoint_id: "legacy".to_string(),
            modern_endpoint_id: "modern".to_string(),
            current_mode: Mode::Parallel,
            transition_config: TransitionConfig::default(),
            comparison_config: ComparisonConfig::default(),
            active: true,
        })
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let response = harness.processor.process(&cancel, &request("/users")).await.unwrap();
    assert_eq!(response.body, br#"{"id":1}"#);
    assert_eq!(response.source, Source::Legacy);

    let recent = harness.comparison_repo.get_recent("r1", 1).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].match_rate, 0.0);
    assert_eq!(recent[0].diffs.len(), 1);
    assert_eq!(recent[0].diffs[0].path, "modern_response");
}

/// Transition fires once enough comparisons clear the threshold: after
/// 100 stored comparisons with a mean match rate above 0.95,
/// `evaluate_transition` reports ready and `execute_transition` persists
/// `ModernOnly`; a subsequent request only calls the modern endpoint.
#[tokio::test]
async fn transition_fires_after_enough_high_match_comparisons() {
    let harness = build_harness(Arc::new(ScriptedTransport {
        legacy_body: br#"{"id":1}"#,
        modern_body: br#"{"id":1}"#,
        fail_modern: false,
    }));
    harness
        .endpoint_repo
        .create(endpoint("legacy", "http://legacy/api", true, false))
        .await
        .unwrap();
    harness
        .endpoint_repo
        .create(endpoint("modern", "http://modern/api", false, false))
        .await
        .unwrap();

    let rule = OrchestrationRule {
        id: "o1".to_string(),
        routing_rule_id: "r1".to_string(),
        legacy_endpoint_id: "legacy".to_string(),
        modern_endpoint_id: "modern".to_string(),
        current_mode: Mode::Parallel,
        transition_config: TransitionConfig {
            auto_transition_enabled: true,
            match_rate_threshold: 0.95,
            stability_period_seconds: 0,
            min_requests_for_transition: 100,
            rollback_threshold: 0.90,
        },
        comparison_config: ComparisonConfig::default(),
        active: true,
    };
    harness.orchestration_repo.create(rule.clone()).await.unwrap();

    for _ in 0..100 {
        harness
            .comparison_repo
            .save(api_bridge_core::models::comparison::ApiComparison {
                id: uuid::Uuid::new_v4().to_string(),
                request_id: "seed".to_string(),
                routing_rule_id: "r1".to_string(),
                legacy_response: None,
                modern_response: None,
                match_rate: 0.97,
                diffs: Vec::new(),
                comparison_duration_ms: 1,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();
    }

    let metrics = Arc::new(MetricsCollector::default());
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(Executor::new(
        Arc::new(ScriptedTransport {
            legacy_body: br#"{"id":1}"#,
            modern_body: br#"{"id":1}"#,
            fail_modern: false,
        }),
        Arc::new(CircuitBreakerRegistry::new(Default::default(), metrics.clone())),
        metrics.clone(),
    ))));
    let engine = OrchestrationEngine::new(
        dispatcher,
        harness.comparison_repo.clone(),
        harness.orchestration_repo.clone(),
        metrics,
    );

    assert!(engine.evaluate_transition(&rule).await);
    engine.execute_transition(&rule, Mode::ModernOnly).await.unwrap();

    let updated = harness.orchestration_repo.find_by_id("o1").await.unwrap().unwrap();
    assert_eq!(updated.current_mode, Mode::ModernOnly);
}

/// Boundary: with `min_requests_for_transition - 1` comparisons available,
/// `evaluate_transition` must return false.
#[tokio::test]
async fn transition_boundary_one_short_of_threshold_does_not_fire() {
    let comparison_repo = Arc::new(InMemoryComparisonRepository::default());
    let orchestration_repo = Arc::new(InMemoryOrchestrationRepository::default());
    let metrics = Arc::new(MetricsCollector::default());
    let executor = Arc::new(Executor::new(
        Arc::new(ScriptedTransport {
            legacy_body: b"{}",
            modern_body: b"{}",
            fail_modern: false,
        }),
        Arc::new(CircuitBreakerRegistry::new(Default::default(), metrics.clone())),
        metrics.clone(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(executor));
    let engine = OrchestrationEngine::new(dispatcher, comparison_repo.clone(), orchestration_repo.clone(), metrics);

    let rule = OrchestrationRule {
        id: "o1".to_string(),
        routing_rule_id: "r1".to_string(),
        legacy_endpoint_id: "legacy".to_string(),
        modern_endpoint_id: "modern".to_string(),
        current_mode: Mode::Parallel,
        transition_config: TransitionConfig {
            auto_transition_enabled: true,
            match_rate_threshold: 0.95,
            stability_period_seconds: 0,
            min_requests_for_transition: 100,
            rollback_threshold: 0.90,
        },
        comparison_config: ComparisonConfig::default(),
        active: true,
    };

    for _ in 0..99 {
        comparison_repo
            .save(api_bridge_core::models::comparison::ApiComparison {
                id: uuid::Uuid::new_v4().to_string(),
                request_id: "seed".to_string(),
                routing_rule_id: "r1".to_string(),
                legacy_response: None,
                modern_response: None,
                match_rate: 0.99,
                diffs: Vec::new(),
                comparison_duration_ms: 1,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();
    }

    assert!(!engine.evaluate_transition(&rule).await);
}
