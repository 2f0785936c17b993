//! Prometheus exposition endpoint.
//!
//! A thin wrapper: `api_bridge_core::services::metrics::MetricsCollector`
//! already owns every counter/histogram/gauge this process needs, so the
//! handler is a thin wrapper over its own `render_prometheus`.

use actix_web::{web, HttpResponse, Responder};
use api_bridge_core::services::metrics::MetricsCollector;
use std::sync::Arc;

pub async fn metrics_endpoint(metrics: web::Data<Arc<MetricsCollector>>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics.render_prometheus())
}

pub fn configure_metrics(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics_endpoint));
}
