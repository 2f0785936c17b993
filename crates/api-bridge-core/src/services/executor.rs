//! The External Call Executor: issues a single HTTP call through a
//! circuit breaker, with a typed linear-backoff retry policy layered on top.
//!
//! URL construction uses [`crate::utils::path::build_target_url`] /
//! `strip_trailing_slash`. Breaker wrapping reuses
//! [`crate::services::circuit_breaker::CircuitBreakerRegistry`] keyed by
//! `endpoint.base_url`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::models::endpoint::Endpoint;
use crate::models::error::BridgeError;
use crate::models::request::Request;
use crate::models::response::{Response, Source};
use crate::services::circuit_breaker::{CircuitBreakerError, CircuitBreakerRegistry};
use crate::services::metrics::MetricsCollector;
use crate::services::transport::{Transport, TransportError, TransportRequest};
use crate::utils::path::{build_target_url, strip_trailing_slash};

pub struct Executor {
    transport: Arc<dyn Transport>,
    breakers: Arc<CircuitBreakerRegistry>,
    metrics: Arc<MetricsCollector>,
}

impl Executor {
    pub fn new(
        transport: Arc<dyn Transport>,
        breakers: Arc<CircuitBreakerRegistry>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            transport,
            breakers,
            metrics,
        }
    }

    fn build_request(endpoint: &Endpoint, request: &Request) -> TransportRequest {
        let path = strip_trailing_slash(&request.path);
        let url = build_target_url(&endpoint.base_url, path, &request.query_params);
        TransportRequest {
            method: request.method.clone(),
            url,
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            body: request.body.clone(),
        }
    }

    /// Issues a single call against `endpoint`, wrapped by the breaker
    /// scoped to its `base_url`. `cancel` is honored cooperatively: a
    /// cancellation while the call is in flight surfaces as a non-retryable
    /// transport error rather than hanging.
    pub async fn send(
        &self,
        cancel: &CancellationToken,
        endpoint: &Endpoint,
        request: &Request,
    ) -> Result<Response, BridgeError> {
        let start = Instant::now();
        let transport_request = Self::build_request(endpoint, request);
        let breaker = self.breakers.get_or_create(&endpoint.base_url).await;
        let timeout = endpoint.timeout();
        let transport = self.transport.clone();

        let outcome = breaker
            .call(async move {
                tokio::select! {
                    _ = cancel.cancelled() => Err(TransportError::Other("request cancelled".to_string())),
                    result = transport.send(transport_request, timeout) => result,
                }
            })
            .await;

        let duration = start.elapsed();
        self.metrics
            .record_circuit_breaker_execution(&endpoint.base_url, duration);

        match outcome {
            Ok(transport_response) => {
                self.metrics
                    .record_external_api_call(&endpoint.base_url, true, duration);
                Ok(Self::to_response(request, transport_response, duration))
            }
            Err(CircuitBreakerError::Open) => {
                self.metrics
                    .record_external_api_call(&endpoint.base_url, false, duration);
                Err(BridgeError::OpenCircuit(endpoint.base_url.clone()))
            }
            Err(CircuitBreakerError::Failed(transport_error)) => {
                self.metrics
                    .record_external_api_call(&endpoint.base_url, false, duration);
                if transport_error.is_retryable() {
                    Err(BridgeError::RetryableTransport(transport_error.to_string()))
                } else {
                    Err(BridgeError::NonRetryableTransport(
                        transport_error.to_string(),
                    ))
                }
            }
        }
    }

    /// Wraps [`Executor::send`] with the linear-backoff retry policy:
    /// attempts `0..=endpoint.retry_count`, a `n`-second wait before attempt
    /// `n >= 1`, retrying only retryable transport errors. 5xx responses are
    /// returned as a `Response`, never retried.
    pub async fn send_with_retry(
        &self,
        cancel: &CancellationToken,
        endpoint: &Endpoint,
        request: &Request,
    ) -> Result<Response, BridgeError> {
        let mut last_error: Option<BridgeError> = None;
        let total_attempts = endpoint.retry_count + 1;

        for attempt in 0..total_attempts {
            if attempt > 0 {
                if cancel.is_cancelled() {
                    break;
                }
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(std::time::Duration::from_secs(attempt as u64)) => {}
                }
            }

            match self.send(cancel, endpoint, request).await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    let retryable = matches!(error, BridgeError::RetryableTransport(_));
                    last_error = Some(error);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(BridgeError::NonRetryableTransport(format!(
            "request failed after {} attempts: {}",
            total_attempts,
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string())
        )))
    }

    fn to_response(
        request: &Request,
        transport_response: crate::services::transport::TransportResponse,
        duration: std::time::Duration,
    ) -> Response {
        let mut headers = HashMap::with_capacity(transport_response.headers.len());
        for (key, value) in transport_response.headers {
            headers.entry(key).or_insert(value);
        }
        let content_type = headers.get("content-type").cloned();
        Response {
            request_id: request.id.clone(),
            status_code: transport_response.status,
            headers,
            body: transport_response.body,
            content_type,
            timestamp: Utc::now(),
            duration,
            source: Source::ExternalApi,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::transport::TransportResponse;
    use chrono::Utc as ChronoUtc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn endpoint(retry_count: u32) -> Endpoint {
        Endpoint {
            id: "e1".to_string(),
            name: "e1".to_string(),
            base_url: "http://backend".to_string(),
            health_url: None,
            default_method: "GET".to_string(),
            timeout_seconds: 5,
            retry_count,
            active: true,
            is_legacy: true,
            is_default: false,
            created_at: ChronoUtc::now(),
            updated_at: ChronoUtc::now(),
        }
    }

    fn request() -> Request {
        Request {
            id: "req-1".to_string(),
            method: "GET".to_string(),
            path: "/users".to_string(),
            headers: HashMap::new(),
            query_params: Vec::new(),
            body: Vec::new(),
            client_ip: None,
            timestamp: ChronoUtc::now(),
        }
    }

    struct FlakyTransport {
        failures_before_success: usize,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Transport for FlakyTransport {
        async fn send(
            &self,
            _request: TransportRequest,
            _timeout: Duration,
        ) -> Result<TransportResponse, TransportError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(TransportError::ConnectionReset)
            } else {
                Ok(TransportResponse {
                    status: 200,
                    headers: vec![("content-type".to_string(), "application/json".to_string())],
                    body: b"{\"ok\":true}".to_vec(),
                })
            }
        }
    }

    struct AlwaysFails;

    #[async_trait::async_trait]
    impl Transport for AlwaysFails {
        async fn send(
            &self,
            _request: TransportRequest,
            _timeout: Duration,
        ) -> Result<TransportResponse, TransportError> {
            Err(TransportError::ConnectionReset)
        }
    }

    fn executor(transport: Arc<dyn Transport>) -> Executor {
        Executor::new(
            transport,
            Arc::new(CircuitBreakerRegistry::new(
                Default::default(),
                Arc::new(MetricsCollector::default()),
            )),
            Arc::new(MetricsCollector::default()),
        )
    }

    #[tokio::test]
    async fn retries_until_success() {
        let transport = Arc::new(FlakyTransport {
            failures_before_success: 2,
            calls: AtomicUsize::new(0),
        });
        let exec = executor(transport);
        let cancel = CancellationToken::new();
        let response = exec
            .send_with_retry(&cancel, &endpoint(3), &request())
            .await
            .unwrap();
        assert_eq!(response.status_code, 200);
    }

    #[tokio::test]
    async fn gives_up_after_retry_count_exhausted() {
        let exec = executor(Arc::new(AlwaysFails));
        let cancel = CancellationToken::new();
        let result = exec.send_with_retry(&cancel, &endpoint(1), &request()).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("2 attempts"));
    }
}
