//! The Parallel Dispatcher: fires legacy and modern calls concurrently
//! and waits for both outcomes under per-call deadlines.
//!
//! The two legs are driven with `tokio::join!` over two tagged futures
//! rather than a channel: it waits for both without favoring completion
//! order, and a parent [`CancellationToken`] cancellation still propagates
//! to both child tokens.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::models::endpoint::Endpoint;
use crate::models::error::BridgeError;
use crate::models::request::Request;
use crate::models::response::Response;
use crate::services::executor::Executor;

/// Both legs' outcomes, collected positionally rather than by arrival order.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub legacy: Option<Response>,
    pub modern: Option<Response>,
    pub legacy_err: Option<BridgeError>,
    pub modern_err: Option<BridgeError>,
}

pub struct Dispatcher {
    executor: Arc<Executor>,
}

impl Dispatcher {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }

    /// Spawns two independent legs and waits for both. Cancelling
    /// `parent_cancel` cancels both child tokens; a per-leg timeout is the
    /// caller's responsibility via `endpoint.timeout()` inside the Executor,
    /// already bounded per-call regardless of the other leg's outcome.
    pub async fn dispatch(
        &self,
        parent_cancel: &CancellationToken,
        request: &Request,
        legacy: &Endpoint,
        modern: &Endpoint,
    ) -> DispatchOutcome {
        let legacy_cancel = parent_cancel.child_token();
        let modern_cancel = parent_cancel.child_token();

        let legacy_fut = self.executor.send_with_retry(&legacy_cancel, legacy, request);
        let modern_fut = self.executor.send_with_retry(&modern_cancel, modern, request);

        let (legacy_result, modern_result) = tokio::join!(legacy_fut, modern_fut);

        let (legacy, legacy_err) = split(legacy_result);
        let (modern, modern_err) = split(modern_result);

        DispatchOutcome {
            legacy,
            modern,
            legacy_err,
            modern_err,
        }
    }
}

fn split(result: Result<Response, BridgeError>) -> (Option<Response>, Option<BridgeError>) {
    match result {
        Ok(response) => (Some(response), None),
        Err(error) => (None, Some(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::circuit_breaker::CircuitBreakerRegistry;
    use crate::services::metrics::MetricsCollector;
    use crate::services::transport::{Transport, TransportError, TransportRequest, TransportResponse};
    use chrono::Utc;
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
                Err(TransportError::ConnectionReset)
            } else {
                Ok(TransportResponse {
                    status: 200,
                    headers: vec![],
                    body: b"{\"id\":1}".to_vec(),
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

    #[tokio::test]
    async fn collects_both_outcomes_even_when_one_fails() {
        let executor = Arc::new(Executor::new(
            Arc::new(PerUrlTransport),
            Arc::new(CircuitBreakerRegistry::new(
                Default::default(),
                Arc::new(MetricsCollector::default()),
            )),
            Arc::new(MetricsCollector::default()),
        ));
        let dispatcher = Dispatcher::new(executor);
        let cancel = CancellationToken::new();
        let outcome = dispatcher
            .dispatch(
                &cancel,
                &request(),
                &endpoint("legacy", "http://legacy"),
                &endpoint("modern", "http://modern"),
            )
            .await;

        assert!(outcome.legacy.is_some());
        assert!(outcome.modern.is_none());
        assert!(outcome.modern_err.is_some());
    }
}
