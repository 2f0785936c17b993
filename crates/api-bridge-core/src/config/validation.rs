//! Configuration validation with detailed error reporting.
//!
//! An errors/warnings/recommendations `ValidationResult` shape covering
//! this crate's `Settings` (endpoints, cache, circuit breaker, external API
//! defaults).

use crate::models::settings::Settings;
use log::{info, warn};
use std::collections::HashSet;

/// Accumulated findings from [`ConfigValidator::validate_comprehensive`]:
/// critical errors that block startup, non-critical warnings, and
/// suggestions for improving the configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            ..Default::default()
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn add_recommendation(&mut self, recommendation: String) {
        self.recommendations.push(recommendation);
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    /// Runs every check below and logs the outcome in a single pass:
    /// collect everything, then log once.
    pub fn validate_comprehensive(settings: &Settings) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Err(e) = settings.validate() {
            result.add_error(e);
        }

        Self::validate_endpoints(settings, &mut result);
        Self::validate_security(settings, &mut result);
        Self::validate_cache(settings, &mut result);

        Self::log_validation_results(&result);
        result
    }

    fn validate_endpoints(settings: &Settings, result: &mut ValidationResult) {
        if settings.endpoints.is_empty() {
            result.add_warning(
                "no endpoints configured - all traffic will fail route resolution until the management surface creates some".to_string(),
            );
        }

        let mut seen_ids = HashSet::new();
        let mut legacy_defaults = 0;
        let mut modern_defaults = 0;
        for endpoint in &settings.endpoints {
            if !seen_ids.insert(&endpoint.id) {
                result.add_error(format!("duplicate endpoint id: {}", endpoint.id));
            }
            if endpoint.is_default && endpoint.is_legacy {
                legacy_defaults += 1;
            } else if endpoint.is_default && !endpoint.is_legacy {
                modern_defaults += 1;
            }
            if endpoint.retry_count > 5 {
                result.add_recommendation(format!(
                    "endpoint '{}' retries {} times - consider a lower count to bound request latency",
                    endpoint.id, endpoint.retry_count
                ));
            }
        }
        if legacy_defaults > 1 {
            result.add_warning(format!(
                "{} endpoints are marked as the default legacy endpoint; only one will be used",
                legacy_defaults
            ));
        }
        if modern_defaults > 1 {
            result.add_warning(format!(
                "{} endpoints are marked as the default modern endpoint; only one will be used",
                modern_defaults
            ));
        }
    }

    fn validate_security(settings: &Settings, result: &mut ValidationResult) {
        let mut http_count = 0;
        let mut https_count = 0;
        for endpoint in &settings.endpoints {
            if endpoint.base_url.starts_with("http://") {
                http_count += 1;
            } else if endpoint.base_url.starts_with("https://") {
                https_count += 1;
            } else {
                result.add_error(format!(
                    "endpoint '{}' base_url must start with http:// or https://",
                    endpoint.id
                ));
            }
        }
        if http_count > 0 && https_count == 0 {
            result.add_warning(
                "all endpoints use plain HTTP - consider HTTPS for production traffic"
                    .to_string(),
            );
        }
    }

    fn validate_cache(settings: &Settings, result: &mut ValidationResult) {
        if settings.cache.max_ttl_seconds == 0 {
            result.add_warning(
                "cache.max_ttl_seconds is zero - every rule's cache_ttl_seconds will be clamped to zero"
                    .to_string(),
            );
        }
        if settings.cache.max_entries > 1_000_000 {
            result.add_recommendation(
                "cache.max_entries is very large - confirm the process has memory headroom"
                    .to_string(),
            );
        }
    }

    fn log_validation_results(result: &ValidationResult) {
        if result.is_valid {
            info!("configuration validation passed");
        } else {
            for error in &result.errors {
                log::error!("validation error: {}", error);
            }
        }
        for warning in &result.warnings {
            warn!("validation warning: {}", warning);
        }
        for recommendation in &result.recommendations {
            info!("recommendation: {}", recommendation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::endpoint::Endpoint;
    use chrono::Utc;

    fn endpoint(id: &str, base_url: &str) -> Endpoint {
        Endpoint {
            id: id.to_string(),
            name: id.to_string(),
            base_url: base_url.to_string(),
            health_url: None,
            default_method: "GET".to_string(),
            timeout_seconds: 5,
            retry_count: 1,
            active: true,
            is_legacy: false,
            is_default: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn flags_duplicate_endpoint_ids() {
        let mut settings = Settings::default();
        settings.endpoints.push(endpoint("e1", "http://a"));
        settings.endpoints.push(endpoint("e1", "http://b"));
        let result = ConfigValidator::validate_comprehensive(&settings);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("duplicate")));
    }

    #[test]
    fn warns_on_empty_endpoints() {
        let settings = Settings::default();
        let result = ConfigValidator::validate_comprehensive(&settings);
        assert!(result.is_valid);
        assert!(result.warnings.iter().any(|w| w.contains("no endpoints")));
    }
}
