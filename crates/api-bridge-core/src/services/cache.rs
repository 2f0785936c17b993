//! The Response Cache: a process-local `CacheRepository` with a
//! background sweep that evicts expired entries instead of relying purely on
//! lazy eviction at read time.
//!
//! The sweep task runs on an interval loop; the `Arc::downgrade`/
//! `Weak::upgrade` trick lets it stop cleanly once nothing still holds
//! the cache.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::models::error::BridgeError;
use crate::repository::CacheRepository;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

struct Inner {
    store: RwLock<HashMap<String, Entry>>,
}

/// An in-process [`CacheRepository`] with a background sweep task. Holding
/// a [`LocalCache`] keeps the sweep alive; once the last `Arc` is dropped,
/// the task's next tick finds nothing to upgrade and exits on its own.
pub struct LocalCache {
    inner: Arc<Inner>,
}

impl LocalCache {
    /// Spawns the sweep task at `sweep_interval`. Call once per process;
    /// clone the returned handle (it's cheap, `Arc`-backed) wherever the
    /// cache is needed.
    pub fn new(sweep_interval: Duration) -> Self {
        let inner = Arc::new(Inner {
            store: RwLock::new(HashMap::new()),
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let now = Instant::now();
                inner.store.write().await.retain(|_, entry| entry.expires_at > now);
            }
        });

        Self { inner }
    }

    /// `"api_bridge:<method>:<path>"`, the key format the Processor builds
    /// for cache-enabled routing rules.
    pub fn build_key(method: &str, path: &str) -> String {
        format!("api_bridge:{}:{}", method, path)
    }

    /// Reads `key`; on a miss, awaits `producer` and stores its result under
    /// `ttl` before returning it. `producer` failures propagate and nothing
    /// is cached.
    pub async fn get_or_set<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<Vec<u8>, BridgeError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<u8>, BridgeError>>,
    {
        if let Some(value) = self.get(key).await? {
            return Ok(value);
        }
        let value = producer().await?;
        self.set(key, value.clone(), ttl).await?;
        Ok(value)
    }
}

#[async_trait::async_trait]
impl CacheRepository for LocalCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BridgeError> {
        let store = self.inner.store.read().await;
        Ok(match store.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            _ => None,
        })
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), BridgeError> {
        let mut store = self.inner.store.write().await;
        store.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BridgeError> {
        self.inner.store.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, BridgeError> {
        let store = self.inner.store.read().await;
        Ok(store
            .get(key)
            .map(|e| e.expires_at > Instant::now())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip_and_expiry() {
        let cache = LocalCache::new(Duration::from_millis(10));
        cache.set("k", b"v".to_vec(), Duration::from_millis(30)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_or_set_only_calls_producer_on_miss() {
        let cache = LocalCache::new(Duration::from_secs(60));
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let value = cache
            .get_or_set("k", Duration::from_secs(60), || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(b"computed".to_vec())
                }
            })
            .await
            .unwrap();
        assert_eq!(value, b"computed".to_vec());

        let calls_clone = calls.clone();
        let value2 = cache
            .get_or_set("k", Duration::from_secs(60), || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(b"recomputed".to_vec())
                }
            })
            .await
            .unwrap();
        assert_eq!(value2, b"computed".to_vec());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn key_format() {
        assert_eq!(LocalCache::build_key("GET", "/users"), "api_bridge:GET:/users");
    }
}
