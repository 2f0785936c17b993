//! The bridge's error taxonomy.
//!
//! Each variant carries enough context to log usefully and maps to an HTTP
//! status via `actix_web::ResponseError` for `api-bridge-server`'s
//! data-plane route — one typed taxonomy used throughout the engine instead
//! of ad hoc string errors at each boundary.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("no routing rule matched and no default route is available")]
    RouteNotFound,

    #[error("endpoint '{0}' is inactive")]
    EndpointInactive(String),

    #[error("circuit breaker '{0}' is open")]
    OpenCircuit(String),

    #[error("retryable transport error: {0}")]
    RetryableTransport(String),

    #[error("non-retryable transport error: {0}")]
    NonRetryableTransport(String),

    #[error("both backends failed: legacy={legacy}, modern={modern}")]
    BothBackendsFailed { legacy: String, modern: String },

    #[error("failed to parse response body as json: {0}")]
    ComparisonParseError(String),

    #[error("repository unavailable: {0}")]
    RepositoryTransient(String),
}

impl BridgeError {
    /// The stable string tag used when the error surfaces in a response body
    /// or a log line, independent of the `Display` message.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::ValidationError(_) => "ValidationError",
            BridgeError::RouteNotFound => "RouteNotFound",
            BridgeError::EndpointInactive(_) => "EndpointInactive",
            BridgeError::OpenCircuit(_) => "OpenCircuit",
            BridgeError::RetryableTransport(_) => "RetryableTransport",
            BridgeError::NonRetryableTransport(_) => "NonRetryableTransport",
            BridgeError::BothBackendsFailed { .. } => "BothBackendsFailed",
            BridgeError::ComparisonParseError(_) => "ComparisonParseError",
            BridgeError::RepositoryTransient(_) => "RepositoryTransient",
        }
    }
}

impl ResponseError for BridgeError {
    fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::ValidationError(_) => StatusCode::BAD_REQUEST,
            BridgeError::RouteNotFound => StatusCode::NOT_FOUND,
            BridgeError::EndpointInactive(_) => StatusCode::NOT_FOUND,
            BridgeError::OpenCircuit(_) => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::RetryableTransport(_) => StatusCode::BAD_GATEWAY,
            BridgeError::NonRetryableTransport(_) => StatusCode::BAD_GATEWAY,
            BridgeError::BothBackendsFailed { .. } => StatusCode::BAD_GATEWAY,
            BridgeError::ComparisonParseError(_) => StatusCode::OK,
            BridgeError::RepositoryTransient(_) => StatusCode::OK,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}
