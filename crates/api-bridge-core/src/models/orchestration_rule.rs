//! Per-route dispatch mode and transition policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which backend(s) a request is dispatched to for a given routing rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum Mode {
    LegacyOnly,
    Parallel,
    ModernOnly,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::LegacyOnly
    }
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::LegacyOnly => "LegacyOnly",
            Mode::Parallel => "Parallel",
            Mode::ModernOnly => "ModernOnly",
        }
    }
}

/// Auto-transition policy: when to move a rule from `Parallel` to
/// `ModernOnly`, and the threshold at which it should roll back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionConfig {
    pub auto_transition_enabled: bool,
    pub match_rate_threshold: f64,
    pub stability_period_seconds: u64,
    pub min_requests_for_transition: u64,
    pub rollback_threshold: f64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            auto_transition_enabled: false,
            match_rate_threshold: 0.95,
            stability_period_seconds: 24 * 60 * 60,
            min_requests_for_transition: 100,
            rollback_threshold: 0.90,
        }
    }
}

impl TransitionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.match_rate_threshold) {
            return Err("match_rate_threshold must be within [0,1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.rollback_threshold) {
            return Err("rollback_threshold must be within [0,1]".to_string());
        }
        if self.rollback_threshold > self.match_rate_threshold {
            return Err("rollback_threshold must be <= match_rate_threshold".to_string());
        }
        if self.min_requests_for_transition < 1 {
            return Err("min_requests_for_transition must be >= 1".to_string());
        }
        Ok(())
    }

    pub fn stability_period(&self) -> Duration {
        Duration::from_secs(self.stability_period_seconds)
    }
}

/// Comparison policy applied by the JSON comparator for a given rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonConfig {
    pub enabled: bool,
    #[serde(default)]
    pub ignore_fields: Vec<String>,
    pub allowable_difference: f64,
    pub strict_mode: bool,
    pub save_comparison_history: bool,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ignore_fields: Vec::new(),
            allowable_difference: 0.0,
            strict_mode: false,
            save_comparison_history: true,
        }
    }
}

impl ComparisonConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.allowable_difference < 0.0 {
            return Err("allowable_difference must be >= 0".to_string());
        }
        Ok(())
    }
}

/// The per-route policy tying a [`crate::models::routing_rule::RoutingRule`]
/// to a legacy/modern endpoint pair, a dispatch mode, and the transition and
/// comparison policies that govern it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestrationRule {
    pub id: String,
    pub routing_rule_id: String,
    pub legacy_endpoint_id: String,
    pub modern_endpoint_id: String,
    pub current_mode: Mode,
    pub transition_config: TransitionConfig,
    pub comparison_config: ComparisonConfig,
    pub active: bool,
}

impl OrchestrationRule {
    pub fn validate(&self) -> Result<(), String> {
        if self.legacy_endpoint_id.trim().is_empty() || self.modern_endpoint_id.trim().is_empty()
        {
            return Err(
                "orchestration rule requires distinct legacy and modern endpoint ids".to_string(),
            );
        }
        if self.legacy_endpoint_id == self.modern_endpoint_id {
            return Err("legacy_endpoint_id and modern_endpoint_id must be distinct".to_string());
        }
        if self.routing_rule_id.trim().is_empty() {
            return Err("orchestration rule requires a routing_rule_id".to_string());
        }
        self.transition_config.validate()?;
        self.comparison_config.validate()?;
        Ok(())
    }

    /// The ephemeral rule the Processor synthesizes when the Resolver fell
    /// back to the default legacy route and a default modern endpoint also
    /// exists. Never persisted.
    pub fn synthesize_default(legacy_endpoint_id: &str, modern_endpoint_id: &str) -> Self {
        Self {
            id: "default-orchestration-rule".to_string(),
            routing_rule_id: "default-legacy-route".to_string(),
            legacy_endpoint_id: legacy_endpoint_id.to_string(),
            modern_endpoint_id: modern_endpoint_id.to_string(),
            current_mode: Mode::Parallel,
            transition_config: TransitionConfig::default(),
            comparison_config: ComparisonConfig {
                allowable_difference: 0.01,
                ..ComparisonConfig::default()
            },
            active: true,
        }
    }
}
