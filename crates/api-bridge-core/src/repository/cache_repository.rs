//! Persistence contract for the response cache fronting the Request
//! Processor's single-API path. See [`crate::services::cache::LocalCache`]
//! for the in-process implementation used by default.

use crate::models::error::BridgeError;
use std::future::Future;
use std::time::Duration;

#[async_trait::async_trait]
pub trait CacheRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BridgeError>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), BridgeError>;
    async fn delete(&self, key: &str) -> Result<(), BridgeError>;
    async fn exists(&self, key: &str) -> Result<bool, BridgeError>;

    /// Reads `key`; on a miss, awaits `producer` and stores its result under
    /// `ttl` before returning it. Layered over `get`/`set` so implementers
    /// only need to provide the four primitives above.
    async fn get_or_set<F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> Result<Vec<u8>, BridgeError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<u8>, BridgeError>> + Send,
    {
        if let Some(value) = self.get(key).await? {
            return Ok(value);
        }
        let value = producer().await?;
        self.set(key, value.clone(), ttl).await?;
        Ok(value)
    }
}
