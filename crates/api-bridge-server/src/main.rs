//! API Bridge server binary.
//!
//! Wires the `api-bridge-core` engine — repositories, resolver, registry,
//! circuit breaker registry, executor, dispatcher, orchestration engine,
//! response cache, request processor — into an Actix Web process exposing
//! the data-plane bridge route, the management CRUD API, and health/metrics
//! probes.

mod routes;

use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use api_bridge_core::config::settings::load_settings;
use api_bridge_core::config::validation::ConfigValidator;
use api_bridge_core::logs::logger::configure_logger;
use api_bridge_core::models::settings::Settings;
use api_bridge_core::repository::in_memory::{
    InMemoryComparisonRepository, InMemoryEndpointRepository, InMemoryOrchestrationRepository,
    InMemoryRoutingRepository,
};
use api_bridge_core::repository::{EndpointRepository, OrchestrationRepository, RoutingRepository};
use api_bridge_core::services::cache::LocalCache;
use api_bridge_core::services::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerRegistry};
use api_bridge_core::services::dispatcher::Dispatcher;
use api_bridge_core::services::executor::Executor;
use api_bridge_core::services::metrics::MetricsCollector;
use api_bridge_core::services::orchestration::OrchestrationEngine;
use api_bridge_core::services::processor::RequestProcessor;
use api_bridge_core::services::registry::EndpointRegistry;
use api_bridge_core::services::resolver::Resolver;
use api_bridge_core::services::transport::{ReqwestTransport, Transport};
use log::{error, info};
use tokio::signal;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    configure_logger();

    let config: Settings = load_settings().expect("failed to load settings");

    info!("starting api-bridge-server v{}", env!("CARGO_PKG_VERSION"));

    let validation_result = ConfigValidator::validate_comprehensive(&config);
    if !validation_result.is_valid {
        error!("configuration validation failed:");
        for e in &validation_result.errors {
            error!("  - {}", e);
        }
        std::process::exit(1);
    }
    info!(
        "configuration validated with {} warnings",
        validation_result.warnings.len()
    );

    let endpoint_repo: Arc<dyn EndpointRepository> =
        Arc::new(InMemoryEndpointRepository::default());
    for endpoint in config.endpoints.clone() {
        if let Err(e) = endpoint.validate() {
            error!("skipping invalid configured endpoint '{}': {}", endpoint.id, e);
            continue;
        }
        endpoint_repo
            .create(endpoint)
            .await
            .expect("in-memory endpoint repository create is infallible");
    }

    let routing_repo: Arc<dyn RoutingRepository> = Arc::new(InMemoryRoutingRepository::default());
    let orchestration_repo: Arc<dyn OrchestrationRepository> =
        Arc::new(InMemoryOrchestrationRepository::default());
    let comparison_repo = Arc::new(InMemoryComparisonRepository::default());

    let metrics = Arc::new(MetricsCollector::default());

    let endpoint_registry = Arc::new(EndpointRegistry::new(endpoint_repo.clone()));
    let resolver = Arc::new(Resolver::with_default_ttl(
        routing_repo.clone(),
        endpoint_registry.clone(),
        metrics.clone(),
    ));

    let breaker_config = CircuitBreakerConfig {
        max_requests: config.circuit_breaker.half_open_max_requests,
        interval: Duration::from_secs(config.circuit_breaker.reset_interval_seconds),
        timeout: Duration::from_secs(config.circuit_breaker.open_timeout_seconds),
    };
    let breakers = Arc::new(CircuitBreakerRegistry::new(breaker_config, metrics.clone()));

    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new());
    let executor = Arc::new(Executor::new(transport, breakers, metrics.clone()));
    let dispatcher = Arc::new(Dispatcher::new(executor.clone()));

    let orchestration_engine = Arc::new(OrchestrationEngine::new(
        dispatcher,
        comparison_repo,
        orchestration_repo.clone(),
        metrics.clone(),
    ));

    let cache = Arc::new(LocalCache::new(Duration::from_secs(60)));

    let processor = Arc::new(RequestProcessor::new(
        resolver.clone(),
        endpoint_registry,
        orchestration_repo.clone(),
        orchestration_engine.clone(),
        executor,
        cache,
        metrics.clone(),
        Duration::from_secs(config.cache.max_ttl_seconds),
    ));

    let host = std::env::var("API_BRIDGE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = config.port;

    info!("starting server on {}:{}", host, port);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(processor.clone()))
            .app_data(web::Data::new(metrics.clone()))
            .app_data(web::Data::new(endpoint_repo.clone()))
            .app_data(web::Data::new(routing_repo.clone()))
            .app_data(web::Data::new(orchestration_repo.clone()))
            .app_data(web::Data::new(orchestration_engine.clone()))
            .app_data(web::Data::new(resolver.clone()))
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#,
            ))
            .wrap(actix_web::middleware::Compress::default())
            .configure(routes::health::configure_health)
            .configure(routes::metrics::configure_metrics)
            .configure(routes::management::configure_management)
            .configure(routes::bridge::configure_bridge)
    })
    .bind((host.as_str(), port))?
    .run();

    tokio::select! {
        result = server => {
            match result {
                Ok(_) => info!("server stopped gracefully"),
                Err(e) => error!("server error: {}", e),
            }
        }
        _ = signal::ctrl_c() => {
            info!("received shutdown signal, stopping server...");
        }
    }

    Ok(())
}
