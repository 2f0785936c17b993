//! Persistence contract for [`OrchestrationRule`](crate::models::orchestration_rule::OrchestrationRule).

use crate::models::error::BridgeError;
use crate::models::orchestration_rule::OrchestrationRule;

#[async_trait::async_trait]
pub trait OrchestrationRepository: Send + Sync {
    async fn create(&self, rule: OrchestrationRule) -> Result<OrchestrationRule, BridgeError>;
    async fn update(&self, rule: OrchestrationRule) -> Result<OrchestrationRule, BridgeError>;
    async fn delete(&self, id: &str) -> Result<(), BridgeError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<OrchestrationRule>, BridgeError>;
    async fn find_all(&self) -> Result<Vec<OrchestrationRule>, BridgeError>;
    async fn find_by_routing_rule_id(
        &self,
        routing_rule_id: &str,
    ) -> Result<Option<OrchestrationRule>, BridgeError>;
}
