//! The thin HTTP transport contract the Executor dispatches through.
//!
//! The same `reqwest::Client` construction shape (idle-pool timeout, max idle connections
//! per host) used to forward a request, pulled out behind a [`Transport`]
//! trait so [`crate::services::executor::Executor`] is testable without real
//! sockets. Error classification keys off a typed
//! [`TransportError`] taxonomy rather than substring-matching an error
//! message.

use std::time::Duration;

/// An outbound call the Executor asks a [`Transport`] to perform. Headers
/// and body are already fully resolved; the transport only serializes them.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// The raw result of a transport call, before the Executor wraps it into a
/// [`crate::models::response::Response`].
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Retry decisions key off
/// these variants instead of matching substrings like `"timeout"` in an
/// error message. Only the first three are retryable.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("network timeout")]
    NetworkTimeout,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("connection reset")]
    ConnectionReset,
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::NetworkTimeout
                | TransportError::ConnectionRefused
                | TransportError::ConnectionReset
        )
    }
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Performs a single call, bounded by `call_timeout`. The timeout is the
    /// transport's own responsibility so a hung connect/read can't outlive
    /// the caller's deadline regardless of how the breaker around it is
    /// configured.
    async fn send(
        &self,
        request: TransportRequest,
        call_timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;
}

/// The default [`Transport`]: a pooled `reqwest::Client`, matching the
/// the same pool settings used elsewhere in this crate's HTTP clients.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(32)
            .build()
            .expect("failed to build reqwest client");
        Self { client }
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: TransportRequest,
        call_timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .unwrap_or(reqwest::Method::GET);
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            if let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(name.as_bytes()),
                reqwest::header::HeaderValue::from_str(value),
            ) {
                builder = builder.header(name, value);
            }
        }
        builder = builder.body(request.body);

        let sent = tokio::time::timeout(call_timeout, builder.send())
            .await
            .map_err(|_| TransportError::NetworkTimeout)?
            .map_err(|e| classify(&e))?;

        let status = sent.status().as_u16();
        let headers = sent
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = sent
            .bytes()
            .await
            .map_err(|e| classify(&e))?
            .to_vec();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Classifies a `reqwest::Error` into the typed taxonomy. `reqwest` itself
/// doesn't distinguish connection-refused from connection-reset at the
/// public API, so that one split falls back to a message check; everything
/// else is classified off `reqwest::Error`'s own typed predicates.
fn classify(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::NetworkTimeout;
    }
    if err.is_connect() {
        return if err.to_string().contains("reset") {
            TransportError::ConnectionReset
        } else {
            TransportError::ConnectionRefused
        };
    }
    TransportError::Other(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_errors_are_retryable() {
        assert!(TransportError::NetworkTimeout.is_retryable());
        assert!(TransportError::ConnectionRefused.is_retryable());
        assert!(TransportError::ConnectionReset.is_retryable());
        assert!(!TransportError::Other("boom".to_string()).is_retryable());
    }
}
