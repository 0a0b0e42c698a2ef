//! Service configuration.
//!
//! Configuration is loaded from environment variables with sensible
//! defaults for local development.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use org_events::RetryConfig;

/// How `organization.delete` removes records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Mark the organization deleted and keep its records.
    #[default]
    Logical,
    /// Remove the organization and its satellite documents.
    Physical,
}

impl DeleteMode {
    /// Parse from a configuration string. Unknown values fall back to logical.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "physical" => DeleteMode::Physical,
            _ => DeleteMode::Logical,
        }
    }

    /// String form used in logs and event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteMode::Logical => "logical",
            DeleteMode::Physical => "physical",
        }
    }
}

/// Configuration for the organization service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name used as the event topic prefix.
    pub service_name: String,

    /// Page size applied when a list request omits `limit`.
    pub default_page_size: usize,

    /// Upper bound on requested page sizes.
    pub max_page_size: usize,

    /// Maximum depth of the organization tree, root included.
    pub max_hierarchy_depth: usize,

    /// Per-request deadline in seconds.
    pub request_timeout_secs: u64,

    /// Number of requests processed concurrently before backpressure.
    pub max_concurrent_requests: usize,

    /// Whether deletes are logical or physical.
    pub delete_mode: DeleteMode,

    /// Publish attempts before an event is dead-lettered.
    pub publish_max_attempts: u32,

    /// Delay before the first publish retry, in milliseconds.
    pub publish_initial_delay_ms: u64,

    /// Ceiling on publish retry delays, in milliseconds.
    pub publish_max_delay_ms: u64,
}

impl Default for ServiceConfig {
    /// Returns default configuration suitable for local development.
    fn default() -> Self {
        Self {
            service_name: "org-service".to_string(),
            default_page_size: 20,
            max_page_size: 100,
            max_hierarchy_depth: 10,
            request_timeout_secs: 30,
            max_concurrent_requests: 64,
            delete_mode: DeleteMode::Logical,
            publish_max_attempts: 5,
            publish_initial_delay_ms: 500,
            publish_max_delay_ms: 30_000,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ORG_SERVICE_NAME`: event topic prefix (default: org-service)
    /// - `ORG_SERVICE_DEFAULT_PAGE_SIZE`: default list page size (default: 20)
    /// - `ORG_SERVICE_MAX_PAGE_SIZE`: page size ceiling (default: 100)
    /// - `ORG_SERVICE_MAX_HIERARCHY_DEPTH`: maximum tree depth (default: 10)
    /// - `ORG_SERVICE_REQUEST_TIMEOUT_SECS`: per-request deadline (default: 30)
    /// - `ORG_SERVICE_MAX_CONCURRENT_REQUESTS`: concurrency limit (default: 64)
    /// - `ORG_SERVICE_DELETE_MODE`: `logical` or `physical` (default: logical)
    /// - `ORG_SERVICE_PUBLISH_MAX_ATTEMPTS`: publish attempts (default: 5)
    /// - `ORG_SERVICE_PUBLISH_INITIAL_DELAY_MS`: first retry delay (default: 500)
    /// - `ORG_SERVICE_PUBLISH_MAX_DELAY_MS`: retry delay ceiling (default: 30000)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            service_name: std::env::var("ORG_SERVICE_NAME").unwrap_or(default.service_name),
            default_page_size: std::env::var("ORG_SERVICE_DEFAULT_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.default_page_size),
            max_page_size: std::env::var("ORG_SERVICE_MAX_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_page_size),
            max_hierarchy_depth: std::env::var("ORG_SERVICE_MAX_HIERARCHY_DEPTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_hierarchy_depth),
            request_timeout_secs: std::env::var("ORG_SERVICE_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.request_timeout_secs),
            max_concurrent_requests: std::env::var("ORG_SERVICE_MAX_CONCURRENT_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_concurrent_requests),
            delete_mode: std::env::var("ORG_SERVICE_DELETE_MODE")
                .map(|s| DeleteMode::parse(&s))
                .unwrap_or(default.delete_mode),
            publish_max_attempts: std::env::var("ORG_SERVICE_PUBLISH_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.publish_max_attempts),
            publish_initial_delay_ms: std::env::var("ORG_SERVICE_PUBLISH_INITIAL_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.publish_initial_delay_ms),
            publish_max_delay_ms: std::env::var("ORG_SERVICE_PUBLISH_MAX_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.publish_max_delay_ms),
        }
    }

    /// Get the per-request deadline as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the retry configuration used by the event outbox.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.publish_max_attempts,
            initial_delay: Duration::from_millis(self.publish_initial_delay_ms),
            max_delay: Duration::from_millis(self.publish_max_delay_ms),
            exponential_base: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.service_name, "org-service");
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.max_page_size, 100);
        assert_eq!(config.max_hierarchy_depth, 10);
        assert_eq!(config.delete_mode, DeleteMode::Logical);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_retry_config_mapping() {
        let config = ServiceConfig {
            publish_max_attempts: 7,
            publish_initial_delay_ms: 250,
            publish_max_delay_ms: 4_000,
            ..ServiceConfig::default()
        };

        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 7);
        assert_eq!(retry.initial_delay, Duration::from_millis(250));
        assert_eq!(retry.max_delay, Duration::from_secs(4));
    }

    #[test]
    fn test_delete_mode_parse() {
        assert_eq!(DeleteMode::parse("physical"), DeleteMode::Physical);
        assert_eq!(DeleteMode::parse("PHYSICAL"), DeleteMode::Physical);
        assert_eq!(DeleteMode::parse("logical"), DeleteMode::Logical);
        assert_eq!(DeleteMode::parse("anything"), DeleteMode::Logical);
        assert_eq!(DeleteMode::Physical.as_str(), "physical");
    }
}
