//! `config` crate — the engine's immutable policy object.
//!
//! A [`Config`] bundles every resource ceiling and security toggle the
//! engine enforces. It is validated once at construction time
//! (`Config::new`) and is read-only for the lifetime of an execution —
//! see `ENGINE.md` ordering guarantees in the root spec.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating a [`Config`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: i64 },

    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: i64 },

    #[error("MaxHTTPRedirects ({max_redirects}) exceeds a sane ceiling of 100")]
    TooManyRedirects { max_redirects: u32 },

    #[error("per-request timeout must not exceed 60s, got {0:?}")]
    RequestTimeoutTooLarge(Duration),
}

/// Immutable policy controlling limits and security toggles.
///
/// Defaults match spec.md §6 exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub max_execution_time: Duration,
    pub max_node_execution_time: Duration,
    pub max_iterations: u64,
    pub max_http_calls_per_exec: u64,
    pub max_response_size: u64,
    pub max_payload_size: u64,
    pub max_nodes: usize,
    pub max_edges: usize,
    pub max_http_redirects: u32,
    pub default_cache_ttl: Duration,
    pub max_cache_size: usize,
    pub allow_http: bool,
    pub allow_private_ips: bool,
    pub allow_localhost: bool,
    pub allow_link_local: bool,
    pub allow_cloud_metadata: bool,
    pub allowed_domains: Vec<String>,
    pub blocked_domains: Vec<String>,
    pub default_max_attempts: u32,
    pub default_backoff: Duration,
    /// Hard ceiling on total node executions for this run.
    pub max_node_executions: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_execution_time: Duration::from_secs(5 * 60),
            max_node_execution_time: Duration::from_secs(30),
            max_iterations: 10_000,
            max_http_calls_per_exec: 100,
            max_response_size: 10 * 1024 * 1024,
            max_payload_size: 10 * 1024 * 1024,
            max_nodes: 1_000,
            max_edges: 5_000,
            max_http_redirects: 10,
            default_cache_ttl: Duration::from_secs(60 * 60),
            max_cache_size: 1_000,
            allow_http: false,
            allow_private_ips: false,
            allow_localhost: false,
            allow_link_local: false,
            allow_cloud_metadata: false,
            allowed_domains: Vec::new(),
            blocked_domains: Vec::new(),
            default_max_attempts: 3,
            default_backoff: Duration::from_secs(1),
            max_node_executions: 10_000,
        }
    }
}

impl Config {
    /// Build and validate a `Config`, rejecting nonsensical policy values
    /// before they ever reach an `Engine`.
    pub fn new() -> Result<Self, ConfigError> {
        let cfg = Self::default();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate this configuration's invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nodes == 0 {
            return Err(ConfigError::NotPositive { field: "MaxNodes", value: 0 });
        }
        if self.max_edges == 0 {
            return Err(ConfigError::NotPositive { field: "MaxEdges", value: 0 });
        }
        if self.max_payload_size == 0 {
            return Err(ConfigError::NotPositive { field: "MaxPayloadSize", value: 0 });
        }
        if self.max_response_size == 0 {
            return Err(ConfigError::NotPositive { field: "MaxResponseSize", value: 0 });
        }
        if self.max_node_executions == 0 {
            return Err(ConfigError::NotPositive { field: "MaxNodeExecutions", value: 0 });
        }
        if self.max_http_redirects > 100 {
            return Err(ConfigError::TooManyRedirects { max_redirects: self.max_http_redirects });
        }
        if self.max_node_execution_time > Duration::from_secs(60) {
            return Err(ConfigError::RequestTimeoutTooLarge(self.max_node_execution_time));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_max_nodes_is_rejected() {
        let mut cfg = Config::default();
        cfg.max_nodes = 0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NotPositive { field: "MaxNodes", value: 0 })
        );
    }

    #[test]
    fn excessive_redirects_rejected() {
        let mut cfg = Config::default();
        cfg.max_http_redirects = 101;
        assert!(matches!(cfg.validate(), Err(ConfigError::TooManyRedirects { .. })));
    }

    #[test]
    fn node_execution_timeout_capped_at_60s() {
        let mut cfg = Config::default();
        cfg.max_node_execution_time = Duration::from_secs(61);
        assert!(matches!(cfg.validate(), Err(ConfigError::RequestTimeoutTooLarge(_))));
    }
}
