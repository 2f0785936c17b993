//! Persistence contract for [`RoutingRule`](crate::models::routing_rule::RoutingRule).

use crate::models::error::BridgeError;
use crate::models::request::Request;
use crate::models::routing_rule::RoutingRule;

#[async_trait::async_trait]
pub trait RoutingRepository: Send + Sync {
    async fn create(&self, rule: RoutingRule) -> Result<RoutingRule, BridgeError>;
    async fn update(&self, rule: RoutingRule) -> Result<RoutingRule, BridgeError>;
    async fn delete(&self, id: &str) -> Result<(), BridgeError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<RoutingRule>, BridgeError>;
    async fn find_all(&self) -> Result<Vec<RoutingRule>, BridgeError>;

    /// Returns every active rule whose method and path glob match `request`,
    /// in no particular order; the Resolver performs priority selection.
    async fn find_matching_rules(&self, request: &Request) -> Result<Vec<RoutingRule>, BridgeError>;
}
