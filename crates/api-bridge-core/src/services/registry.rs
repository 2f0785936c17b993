//! The Endpoint Registry: a thin decorator over
//! [`EndpointRepository`](crate::repository::EndpointRepository) that
//! enforces the "inactive endpoint is indistinguishable from not found"
//! rule, so nothing downstream has to re-check `endpoint.active` itself.

use std::sync::Arc;

use crate::models::endpoint::Endpoint;
use crate::models::error::BridgeError;
use crate::repository::EndpointRepository;

pub struct EndpointRegistry {
    repository: Arc<dyn EndpointRepository>,
}

impl EndpointRegistry {
    pub fn new(repository: Arc<dyn EndpointRepository>) -> Self {
        Self { repository }
    }

    /// Looks up `id`. An endpoint that exists but has `active == false`
    /// surfaces as [`BridgeError::EndpointInactive`], the same error a
    /// genuinely missing id produces — the error table has no separate
    /// not-found variant for endpoints, so callers must not distinguish the
    /// two cases.
    pub async fn find_active(&self, id: &str) -> Result<Endpoint, BridgeError> {
        match self.repository.find_by_id(id).await? {
            Some(endpoint) if endpoint.active => Ok(endpoint),
            _ => Err(BridgeError::EndpointInactive(id.to_string())),
        }
    }

    pub async fn find_default_legacy(&self) -> Result<Option<Endpoint>, BridgeError> {
        let found = self.repository.find_default_legacy().await?;
        Ok(found.filter(|e| e.active))
    }

    pub async fn find_default_modern(&self) -> Result<Option<Endpoint>, BridgeError> {
        let found = self.repository.find_default_modern().await?;
        Ok(found.filter(|e| e.active))
    }
}
