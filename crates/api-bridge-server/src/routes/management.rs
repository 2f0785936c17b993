//! REST CRUD surface for endpoints, routing rules and orchestration rules,
//! plus the two orchestration actions (evaluate/execute a transition).
//!
//! One `RouteResponse`-style envelope per resource, validate-then-persist
//! on every write, a `Conflict` on duplicate ids, across three independent
//! repository-backed resources.

use actix_web::{delete, get, post, put, web, HttpResponse, Responder, ResponseError};
use api_bridge_core::models::endpoint::Endpoint;
use api_bridge_core::models::orchestration_rule::{Mode, OrchestrationRule};
use api_bridge_core::models::routing_rule::RoutingRule;
use api_bridge_core::repository::{EndpointRepository, OrchestrationRepository, RoutingRepository};
use api_bridge_core::services::orchestration::OrchestrationEngine;
use api_bridge_core::services::resolver::Resolver;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorBody {
        success: false,
        message: message.into(),
    })
}

fn not_found(message: impl Into<String>) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorBody {
        success: false,
        message: message.into(),
    })
}

fn conflict(message: impl Into<String>) -> HttpResponse {
    HttpResponse::Conflict().json(ErrorBody {
        success: false,
        message: message.into(),
    })
}

// ---------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------

#[get("/api/v1/endpoints")]
pub async fn list_endpoints(repo: web::Data<Arc<dyn EndpointRepository>>) -> impl Responder {
    match repo.find_all().await {
        Ok(endpoints) => HttpResponse::Ok().json(endpoints),
        Err(e) => e.error_response(),
    }
}

#[get("/api/v1/endpoints/{id}")]
pub async fn get_endpoint(
    repo: web::Data<Arc<dyn EndpointRepository>>,
    id: web::Path<String>,
) -> impl Responder {
    match repo.find_by_id(&id).await {
        Ok(Some(endpoint)) => HttpResponse::Ok().json(endpoint),
        Ok(None) => not_found(format!("endpoint not found: {}", id)),
        Err(e) => e.error_response(),
    }
}

#[post("/api/v1/endpoints")]
pub async fn create_endpoint(
    repo: web::Data<Arc<dyn EndpointRepository>>,
    endpoint: web::Json<Endpoint>,
) -> impl Responder {
    if let Err(e) = endpoint.validate() {
        return bad_request(e);
    }
    match repo.find_by_id(&endpoint.id).await {
        Ok(Some(_)) => return conflict(format!("endpoint already exists: {}", endpoint.id)),
        Ok(None) => {}
        Err(e) => return e.error_response(),
    }
    match repo.create(endpoint.into_inner()).await {
        Ok(created) => HttpResponse::Created().json(created),
        Err(e) => e.error_response(),
    }
}

#[put("/api/v1/endpoints/{id}")]
pub async fn update_endpoint(
    repo: web::Data<Arc<dyn EndpointRepository>>,
    id: web::Path<String>,
    endpoint: web::Json<Endpoint>,
) -> impl Responder {
    if *id != endpoint.id {
        return bad_request("path id does not match body id");
    }
    if let Err(e) = endpoint.validate() {
        return bad_request(e);
    }
    match repo.update(endpoint.into_inner()).await {
        Ok(updated) => HttpResponse::Ok().json(updated),
        Err(e) => e.error_response(),
    }
}

#[delete("/api/v1/endpoints/{id}")]
pub async fn delete_endpoint(
    repo: web::Data<Arc<dyn EndpointRepository>>,
    id: web::Path<String>,
) -> impl Responder {
    match repo.delete(&id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => e.error_response(),
    }
}

// ---------------------------------------------------------------------
// Routing rules
// ---------------------------------------------------------------------

#[get("/api/v1/routing-rules")]
pub async fn list_routing_rules(repo: web::Data<Arc<dyn RoutingRepository>>) -> impl Responder {
    match repo.find_all().await {
        Ok(rules) => HttpResponse::Ok().json(rules),
        Err(e) => e.error_response(),
    }
}

#[get("/api/v1/routing-rules/{id}")]
pub async fn get_routing_rule(
    repo: web::Data<Arc<dyn RoutingRepository>>,
    id: web::Path<String>,
) -> impl Responder {
    match repo.find_by_id(&id).await {
        Ok(Some(rule)) => HttpResponse::Ok().json(rule),
        Ok(None) => not_found(format!("routing rule not found: {}", id)),
        Err(e) => e.error_response(),
    }
}

#[post("/api/v1/routing-rules")]
pub async fn create_routing_rule(
    repo: web::Data<Arc<dyn RoutingRepository>>,
    resolver: web::Data<Arc<Resolver>>,
    rule: web::Json<RoutingRule>,
) -> impl Responder {
    if let Err(e) = rule.validate() {
        return bad_request(e);
    }
    if let Err(e) = rule.compile_path_pattern() {
        return bad_request(format!("invalid path_pattern: {}", e));
    }
    match repo.find_by_id(&rule.id).await {
        Ok(Some(_)) => return conflict(format!("routing rule already exists: {}", rule.id)),
        Ok(None) => {}
        Err(e) => return e.error_response(),
    }
    match repo.create(rule.into_inner()).await {
        Ok(created) => {
            resolver.invalidate_all().await;
            HttpResponse::Created().json(created)
        }
        Err(e) => e.error_response(),
    }
}

#[put("/api/v1/routing-rules/{id}")]
pub async fn update_routing_rule(
    repo: web::Data<Arc<dyn RoutingRepository>>,
    resolver: web::Data<Arc<Resolver>>,
    id: web::Path<String>,
    rule: web::Json<RoutingRule>,
) -> impl Responder {
    if *id != rule.id {
        return bad_request("path id does not match body id");
    }
    if let Err(e) = rule.validate() {
        return bad_request(e);
    }
    match repo.update(rule.into_inner()).await {
        Ok(updated) => {
            resolver.invalidate_all().await;
            HttpResponse::Ok().json(updated)
        }
        Err(e) => e.error_response(),
    }
}

#[delete("/api/v1/routing-rules/{id}")]
pub async fn delete_routing_rule(
    repo: web::Data<Arc<dyn RoutingRepository>>,
    resolver: web::Data<Arc<Resolver>>,
    id: web::Path<String>,
) -> impl Responder {
    match repo.delete(&id).await {
        Ok(()) => {
            resolver.invalidate_all().await;
            HttpResponse::NoContent().finish()
        }
        Err(e) => e.error_response(),
    }
}

// ---------------------------------------------------------------------
// Orchestration rules
// ---------------------------------------------------------------------

#[get("/api/v1/orchestration-rules")]
pub async fn list_orchestration_rules(
    repo: web::Data<Arc<dyn OrchestrationRepository>>,
) -> impl Responder {
    match repo.find_all().await {
        Ok(rules) => HttpResponse::Ok().json(rules),
        Err(e) => e.error_response(),
    }
}

#[get("/api/v1/orchestration-rules/{id}")]
pub async fn get_orchestration_rule(
    repo: web::Data<Arc<dyn OrchestrationRepository>>,
    id: web::Path<String>,
) -> impl Responder {
    match repo.find_by_id(&id).await {
        Ok(Some(rule)) => HttpResponse::Ok().json(rule),
        Ok(None) => not_found(format!("orchestration rule not found: {}", id)),
        Err(e) => e.error_response(),
    }
}

#[post("/api/v1/orchestration-rules")]
pub async fn create_orchestration_rule(
    repo: web::Data<Arc<dyn OrchestrationRepository>>,
    rule: web::Json<OrchestrationRule>,
) -> impl Responder {
    if let Err(e) = rule.validate() {
        return bad_request(e);
    }
    match repo.find_by_id(&rule.id).await {
        Ok(Some(_)) => {
            return conflict(format!("orchestration rule already exists: {}", rule.id))
        }
        Ok(None) => {}
        Err(e) => return e.error_response(),
    }
    match repo.create(rule.into_inner()).await {
        Ok(created) => HttpResponse::Created().json(created),
        Err(e) => e.error_response(),
    }
}

#[put("/api/v1/orchestration-rules/{id}")]
pub async fn update_orchestration_rule(
    repo: web::Data<Arc<dyn OrchestrationRepository>>,
    id: web::Path<String>,
    rule: web::Json<OrchestrationRule>,
) -> impl Responder {
    if *id != rule.id {
        return bad_request("path id does not match body id");
    }
    if let Err(e) = rule.validate() {
        return bad_request(e);
    }
    match repo.update(rule.into_inner()).await {
        Ok(updated) => HttpResponse::Ok().json(updated),
        Err(e) => e.error_response(),
    }
}

#[delete("/api/v1/orchestration-rules/{id}")]
pub async fn delete_orchestration_rule(
    repo: web::Data<Arc<dyn OrchestrationRepository>>,
    id: web::Path<String>,
) -> impl Responder {
    match repo.delete(&id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => e.error_response(),
    }
}

#[derive(Serialize)]
struct TransitionEvaluation {
    ready: bool,
}

/// `POST /api/v1/orchestration-rules/{id}/evaluate-transition` — read-only
/// check of whether the rule's comparison history clears its transition
/// policy, without acting on it.
#[post("/api/v1/orchestration-rules/{id}/evaluate-transition")]
pub async fn evaluate_transition(
    repo: web::Data<Arc<dyn OrchestrationRepository>>,
    engine: web::Data<Arc<OrchestrationEngine>>,
    id: web::Path<String>,
) -> impl Responder {
    match repo.find_by_id(&id).await {
        Ok(Some(rule)) => {
            let ready = engine.evaluate_transition(&rule).await;
            HttpResponse::Ok().json(TransitionEvaluation { ready })
        }
        Ok(None) => not_found(format!("orchestration rule not found: {}", id)),
        Err(e) => e.error_response(),
    }
}

#[derive(serde::Deserialize)]
pub struct ExecuteTransitionRequest {
    pub mode: Mode,
}

/// `POST /api/v1/orchestration-rules/{id}/execute-transition` — persists
/// `mode` on the rule and records the transition metric. Used both for the
/// forward `Parallel -> ModernOnly` move and for a manual rollback.
#[post("/api/v1/orchestration-rules/{id}/execute-transition")]
pub async fn execute_transition(
    repo: web::Data<Arc<dyn OrchestrationRepository>>,
    engine: web::Data<Arc<OrchestrationEngine>>,
    id: web::Path<String>,
    body: web::Json<ExecuteTransitionRequest>,
) -> impl Responder {
    match repo.find_by_id(&id).await {
        Ok(Some(rule)) => match engine.execute_transition(&rule, body.mode).await {
            Ok(()) => HttpResponse::Ok().json(ErrorBody {
                success: true,
                message: format!("transitioned to {}", body.mode.as_str()),
            }),
            Err(e) => e.error_response(),
        },
        Ok(None) => not_found(format!("orchestration rule not found: {}", id)),
        Err(e) => e.error_response(),
    }
}

pub fn configure_management(cfg: &mut web::ServiceConfig) {
    cfg.service(list_endpoints)
        .service(get_endpoint)
        .service(create_endpoint)
        .service(update_endpoint)
        .service(delete_endpoint)
        .service(list_routing_rules)
        .service(get_routing_rule)
        .service(create_routing_rule)
        .service(update_routing_rule)
        .service(delete_routing_rule)
        .service(list_orchestration_rules)
        .service(get_orchestration_rule)
        .service(create_orchestration_rule)
        .service(update_orchestration_rule)
        .service(delete_orchestration_rule)
        .service(evaluate_transition)
        .service(execute_transition);
}
