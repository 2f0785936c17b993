//! Persistence contract for [`Endpoint`](crate::models::endpoint::Endpoint).

use crate::models::endpoint::Endpoint;
use crate::models::error::BridgeError;

#[async_trait::async_trait]
pub trait EndpointRepository: Send + Sync {
    async fn create(&self, endpoint: Endpoint) -> Result<Endpoint, BridgeError>;
    async fn update(&self, endpoint: Endpoint) -> Result<Endpoint, BridgeError>;
    async fn delete(&self, id: &str) -> Result<(), BridgeError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Endpoint>, BridgeError>;
    async fn find_all(&self) -> Result<Vec<Endpoint>, BridgeError>;
    async fn find_active(&self) -> Result<Vec<Endpoint>, BridgeError>;
    async fn find_default_legacy(&self) -> Result<Option<Endpoint>, BridgeError>;
    async fn find_default_modern(&self) -> Result<Option<Endpoint>, BridgeError>;
}
