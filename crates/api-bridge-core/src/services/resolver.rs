//! The Routing Resolver: resolves a request to a [`RoutingRule`],
//! backed by a TTL-bounded cache of the repository's candidate lists.
//!
//! A `tokio::sync::RwLock`-guarded `ahash::HashMap` with a lazy per-key TTL,
//! rather than a single global reload tick — the same "ahash for O(1) route
//! lookups" choice the teacher's own static route table makes, applied to
//! this cache's `method:path` keys instead.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::HashMap;
use tokio::sync::RwLock;

use crate::models::request::Request;
use crate::models::routing_rule::RoutingRule;
use crate::repository::RoutingRepository;
use crate::services::metrics::MetricsCollector;
use crate::services::registry::EndpointRegistry;

struct CacheEntry {
    rules: Vec<RoutingRule>,
    fetched_at: Instant,
}

/// Resolves requests to routing rules with a per-key TTL cache in front of
/// [`RoutingRepository::find_matching_rules`]. Never surfaces an error to
/// callers: a repository failure degrades to the same default-route
/// fallback as an empty match list.
pub struct Resolver {
    repository: Arc<dyn RoutingRepository>,
    endpoints: Arc<EndpointRegistry>,
    metrics: Arc<MetricsCollector>,
    cache: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl Resolver {
    pub fn new(
        repository: Arc<dyn RoutingRepository>,
        endpoints: Arc<EndpointRegistry>,
        metrics: Arc<MetricsCollector>,
        ttl: Duration,
    ) -> Self {
        Self {
            repository,
            endpoints,
            metrics,
            cache: RwLock::new(HashMap::default()),
            ttl,
        }
    }

    pub fn with_default_ttl(
        repository: Arc<dyn RoutingRepository>,
        endpoints: Arc<EndpointRegistry>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self::new(repository, endpoints, metrics, Duration::from_secs(60))
    }

    pub async fn resolve(&self, request: &Request) -> RoutingRule {
        let key = request.cache_key();

        if let Some(entry) = self.cache.read().await.get(&key) {
            if entry.fetched_at.elapsed() < self.ttl {
                return self.select(&entry.rules, request).await;
            }
        }

        let rules = match self.repository.find_matching_rules(request).await {
            Ok(rules) => rules,
            Err(e) => {
                log::warn!(
                    "routing repository lookup failed, falling back to default route: {}",
                    flatten(&e.to_string())
                );
                Vec::new()
            }
        };

        self.cache.write().await.insert(
            key,
            CacheEntry {
                rules: rules.clone(),
                fetched_at: Instant::now(),
            },
        );

        self.select(&rules, request).await
    }

    /// Drops every cached candidate list. A routing-rule mutation can
    /// change the matches for any `(method, path)` key, and the resolver
    /// has no reverse index from rule id back to the keys it influenced,
    /// so the repository's write path invalidates the whole cache rather
    /// than the single affected entry the spec's ownership note describes.
    pub async fn invalidate_all(&self) {
        self.cache.write().await.clear();
    }

    /// Picks the numerically smallest priority, tie-broken by id; falls back
    /// to the synthesized default-legacy route when `rules` is empty.
    async fn select(&self, rules: &[RoutingRule], request: &Request) -> RoutingRule {
        if let Some(best) = rules.iter().min_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.id.cmp(&b.id))
        }) {
            return best.clone();
        }

        self.metrics
            .record_default_routing_used(&request.method, &request.path);

        let default_endpoint_id = match self.endpoints.find_default_legacy().await {
            Ok(Some(endpoint)) => endpoint.id,
            _ => String::new(),
        };

        RoutingRule::synthesize_default(&default_endpoint_id, &request.method, &request.path)
    }
}

fn flatten(message: &str) -> String {
    message.replace(['\n', '\t'], " ")
}
