//! In-memory implementations of every repository trait.
//!
//! These are the "any backing implementation satisfies it" proof: enough
//! to run and test the engine end to end
//! without a real database. Each store is a `tokio::sync::RwLock<HashMap<...>>`,
//! the same shared-map idiom the Routing Resolver's cache and the Circuit
//! Breaker Registry use (see [`crate::services::resolver`] and
//! [`crate::services::circuit_breaker`]).

use crate::models::comparison::ApiComparison;
use crate::models::endpoint::Endpoint;
use crate::models::error::BridgeError;
use crate::models::orchestration_rule::OrchestrationRule;
use crate::models::request::Request;
use crate::models::routing_rule::RoutingRule;
use crate::repository::cache_repository::CacheRepository;
use crate::repository::comparison_repository::{ComparisonRepository, ComparisonStatistics};
use crate::repository::endpoint_repository::EndpointRepository;
use crate::repository::orchestration_repository::OrchestrationRepository;
use crate::repository::routing_repository::RoutingRepository;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// In-memory [`EndpointRepository`].
#[derive(Default)]
pub struct InMemoryEndpointRepository {
    store: RwLock<HashMap<String, Endpoint>>,
}

#[async_trait::async_trait]
impl EndpointRepository for InMemoryEndpointRepository {
    async fn create(&self, endpoint: Endpoint) -> Result<Endpoint, BridgeError> {
        let mut store = self.store.write().await;
        store.insert(endpoint.id.clone(), endpoint.clone());
        Ok(endpoint)
    }

    async fn update(&self, endpoint: Endpoint) -> Result<Endpoint, BridgeError> {
        let mut store = self.store.write().await;
        store.insert(endpoint.id.clone(), endpoint.clone());
        Ok(endpoint)
    }

    async fn delete(&self, id: &str) -> Result<(), BridgeError> {
        self.store.write().await.remove(id);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Endpoint>, BridgeError> {
        Ok(self.store.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Endpoint>, BridgeError> {
        Ok(self.store.read().await.values().cloned().collect())
    }

    async fn find_active(&self) -> Result<Vec<Endpoint>, BridgeError> {
        Ok(self
            .store
            .read()
            .await
            .values()
            .filter(|e| e.active)
            .cloned()
            .collect())
    }

    async fn find_default_legacy(&self) -> Result<Option<Endpoint>, BridgeError> {
        Ok(self
            .store
            .read()
            .await
            .values()
            .find(|e| e.is_default && e.is_legacy && e.active)
            .cloned())
    }

    async fn find_default_modern(&self) -> Result<Option<Endpoint>, BridgeError> {
        Ok(self
            .store
            .read()
            .await
            .values()
            .find(|e| e.is_default && !e.is_legacy && e.active)
            .cloned())
    }
}

/// In-memory [`RoutingRepository`]. Matching is linear scan over active
/// rules; fine for the rule counts this engine is expected to hold, and the
/// Resolver's own TTL cache keeps lookups off this path most of the time.
#[derive(Default)]
pub struct InMemoryRoutingRepository {
    store: RwLock<HashMap<String, RoutingRule>>,
}

#[async_trait::async_trait]
impl RoutingRepository for InMemoryRoutingRepository {
    async fn create(&self, rule: RoutingRule) -> Result<RoutingRule, BridgeError> {
        let mut store = self.store.write().await;
        store.insert(rule.id.clone(), rule.clone());
        Ok(rule)
    }

    async fn update(&self, rule: RoutingRule) -> Result<RoutingRule, BridgeError> {
        let mut store = self.store.write().await;
        store.insert(rule.id.clone(), rule.clone());
        Ok(rule)
    }

    async fn delete(&self, id: &str) -> Result<(), BridgeError> {
        self.store.write().await.remove(id);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<RoutingRule>, BridgeError> {
        Ok(self.store.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<RoutingRule>, BridgeError> {
        Ok(self.store.read().await.values().cloned().collect())
    }

    async fn find_matching_rules(&self, request: &Request) -> Result<Vec<RoutingRule>, BridgeError> {
        let store = self.store.read().await;
        let mut matches = Vec::new();
        for rule in store.values() {
            if !rule.active || !rule.matches_method(&request.method) {
                continue;
            }
            match rule.compile_path_pattern() {
                Ok(pattern) => {
                    if pattern.is_match(&request.path) {
                        matches.push(rule.clone());
                    }
                }
                Err(e) => {
                    log::warn!(
                        "routing rule '{}' has an invalid path pattern: {}",
                        rule.id,
                        e
                    );
                }
            }
        }
        Ok(matches)
    }
}

/// In-memory [`OrchestrationRepository`].
#[derive(Default)]
pub struct InMemoryOrchestrationRepository {
    store: RwLock<HashMap<String, OrchestrationRule>>,
}

#[async_trait::async_trait]
impl OrchestrationRepository for InMemoryOrchestrationRepository {
    async fn create(&self, rule: OrchestrationRule) -> Result<OrchestrationRule, BridgeError> {
        let mut store = self.store.write().await;
        store.insert(rule.id.clone(), rule.clone());
        Ok(rule)
    }

    async fn update(&self, rule: OrchestrationRule) -> Result<OrchestrationRule, BridgeError> {
        let mut store = self.store.write().await;
        store.insert(rule.id.clone(), rule.clone());
        Ok(rule)
    }

    async fn delete(&self, id: &str) -> Result<(), BridgeError> {
        self.store.write().await.remove(id);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<OrchestrationRule>, BridgeError> {
        Ok(self.store.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<OrchestrationRule>, BridgeError> {
        Ok(self.store.read().await.values().cloned().collect())
    }

    async fn find_by_routing_rule_id(
        &self,
        routing_rule_id: &str,
    ) -> Result<Option<OrchestrationRule>, BridgeError> {
        Ok(self
            .store
            .read()
            .await
            .values()
            .find(|r| r.routing_rule_id == routing_rule_id && r.active)
            .cloned())
    }
}

/// In-memory [`ComparisonRepository`], keyed by routing rule id with
/// insertion order preserved so `get_recent` can take the tail of the Vec.
#[derive(Default)]
pub struct InMemoryComparisonRepository {
    store: RwLock<HashMap<String, Vec<ApiComparison>>>,
}

#[async_trait::async_trait]
impl ComparisonRepository for InMemoryComparisonRepository {
    async fn save(&self, comparison: ApiComparison) -> Result<(), BridgeError> {
        let mut store = self.store.write().await;
        store
            .entry(comparison.routing_rule_id.clone())
            .or_default()
            .push(comparison);
        Ok(())
    }

    async fn get_recent(
        &self,
        routing_rule_id: &str,
        limit: usize,
    ) -> Result<Vec<ApiComparison>, BridgeError> {
        let store = self.store.read().await;
        let Some(all) = store.get(routing_rule_id) else {
            return Ok(Vec::new());
        };
        Ok(all.iter().rev().take(limit).cloned().collect())
    }

    async fn get_statistics(
        &self,
        routing_rule_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<ComparisonStatistics, BridgeError> {
        let store = self.store.read().await;
        let in_range: Vec<f64> = store
            .get(routing_rule_id)
            .map(|all| {
                all.iter()
                    .filter(|c| c.timestamp >= from && c.timestamp <= to)
                    .map(|c| c.match_rate)
                    .collect()
            })
            .unwrap_or_default();

        if in_range.is_empty() {
            return Ok(ComparisonStatistics {
                routing_rule_id: routing_rule_id.to_string(),
                sample_count: 0,
                mean_match_rate: 0.0,
                min_match_rate: 0.0,
                max_match_rate: 0.0,
            });
        }

        let sum: f64 = in_range.iter().sum();
        let mean = sum / in_range.len() as f64;
        let min = in_range.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = in_range.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        Ok(ComparisonStatistics {
            routing_rule_id: routing_rule_id.to_string(),
            sample_count: in_range.len() as u64,
            mean_match_rate: mean,
            min_match_rate: min,
            max_match_rate: max,
        })
    }
}

struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-memory [`CacheRepository`]. Distinct from
/// [`crate::services::cache::LocalCache`] (the Response Cache's own
/// contract-agnostic implementation): this one exists so a
/// `CacheRepository` trait object is available wherever the management
/// surface or tests need one directly.
#[derive(Default)]
pub struct InMemoryCacheRepository {
    store: RwLock<HashMap<String, CacheEntry>>,
}

#[async_trait::async_trait]
impl CacheRepository for InMemoryCacheRepository {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BridgeError> {
        let store = self.store.read().await;
        match store.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), BridgeError> {
        let mut store = self.store.write().await;
        store.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BridgeError> {
        self.store.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, BridgeError> {
        let store = self.store.read().await;
        Ok(store
            .get(key)
            .map(|e| e.expires_at > Instant::now())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn endpoint(id: &str, is_legacy: bool, is_default: bool) -> Endpoint {
        Endpoint {
            id: id.to_string(),
            name: id.to_string(),
            base_url: "http://example".to_string(),
            health_url: None,
            default_method: "GET".to_string(),
            timeout_seconds: 5,
            retry_count: 0,
            active: true,
            is_legacy,
            is_default,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn finds_default_legacy_and_modern() {
        let repo = InMemoryEndpointRepository::default();
        repo.create(endpoint("legacy", true, true)).await.unwrap();
        repo.create(endpoint("modern", false, true)).await.unwrap();
        repo.create(endpoint("other", false, false)).await.unwrap();

        assert_eq!(
            repo.find_default_legacy().await.unwrap().unwrap().id,
            "legacy"
        );
        assert_eq!(
            repo.find_default_modern().await.unwrap().unwrap().id,
            "modern"
        );
    }

    #[tokio::test]
    async fn inactive_endpoint_excluded_from_defaults() {
        let repo = InMemoryEndpointRepository::default();
        let mut e = endpoint("legacy", true, true);
        e.active = false;
        repo.create(e).await.unwrap();
        assert!(repo.find_default_legacy().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn comparison_get_recent_returns_newest_first() {
        let repo = InMemoryComparisonRepository::default();
        for i in 0..5 {
            repo.save(ApiComparison {
                id: format!("c{i}"),
                request_id: format!("r{i}"),
                routing_rule_id: "rule-1".to_string(),
                legacy_response: None,
                modern_response: None,
                match_rate: i as f64 / 10.0,
                diffs: Vec::new(),
                comparison_duration_ms: 1,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();
        }
        let recent = repo.get_recent("rule-1", 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, "c4");
        assert_eq!(recent[1].id, "c3");
    }

    #[tokio::test]
    async fn cache_roundtrip_and_expiry() {
        let repo = InMemoryCacheRepository::default();
        repo.set("k", b"v".to_vec(), Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(repo.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert!(repo.exists("k").await.unwrap());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(repo.get("k").await.unwrap(), None);
    }
}
