//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the switch.
//! All types derive Serde traits for deserialization from the TOML file.

use std::collections::HashMap;
use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener, auth and request-path defaults.
    pub server: ServerConfig,

    /// Circuit breaking settings.
    pub health: HealthConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Upstream platforms, in configuration order.
    pub platforms: Vec<PlatformConfig>,

    /// Per-group overrides keyed by group name.
    pub groups: HashMap<String, GroupConfig>,
}

impl ProxyConfig {
    /// Look up the override block for a group, ignoring case.
    ///
    /// `validate_config` rejects keys that differ only by case, so at most one block matches.
    pub fn group_override(&self, group: &str) -> Option<&GroupConfig> {
        self.groups.get(group).or_else(|| {
            self.groups
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(group))
                .map(|(_, config)| config)
        })
    }

    /// Strategy name in force for a group.
    pub fn effective_strategy<'a>(&'a self, group: Option<&'a GroupConfig>) -> &'a str {
        group
            .and_then(|g| g.strategy.as_deref())
            .unwrap_or(&self.server.strategy)
    }

    /// Per-attempt timeout in force for a group.
    pub fn effective_timeout(&self, group: Option<&GroupConfig>) -> Duration {
        let secs = group
            .and_then(|g| g.timeout_seconds)
            .unwrap_or(self.server.timeout_seconds);
        Duration::from_secs(secs)
    }

    /// Maximum number of platforms tried per request for a group.
    pub fn effective_max_failover(&self, group: Option<&GroupConfig>) -> usize {
        group
            .and_then(|g| g.max_failover)
            .unwrap_or(self.server.max_failover)
    }
}

/// Server-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, with or without an `http://` prefix.
    pub listen: String,

    /// Shared secret clients present as `Authorization: Bearer <auth_key>`.
    pub auth_key: String,

    /// Group used when the first path segment names no known group.
    pub default_group: String,

    /// Default load-balancing strategy (`weighted` or `failover`).
    pub strategy: String,

    /// Upstream attempt timeout in seconds.
    pub timeout_seconds: u64,

    /// Maximum platforms tried per request.
    pub max_failover: usize,

    /// Largest request body buffered for replay, in bytes.
    pub max_request_body_bytes: usize,
}

impl ServerConfig {
    /// Parse `listen`, tolerating a URL-style `http://host:port/` value.
    pub fn listen_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let trimmed = self.listen.trim();
        let without_scheme = trimmed.strip_prefix("http://").unwrap_or(trimmed);
        without_scheme.trim_end_matches('/').parse()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:7085".to_string(),
            auth_key: String::new(),
            default_group: "default".to_string(),
            strategy: "weighted".to_string(),
            timeout_seconds: 600,
            max_failover: 2,
            max_request_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Circuit breaking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Consecutive failures that trip a platform's circuit.
    pub failure_threshold: u32,

    /// Base cooldown in seconds; doubles with every consecutive trip.
    pub cooldown_seconds: u64,
}

impl HealthConfig {
    pub fn base_cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 2,
            cooldown_seconds: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) used when `RUST_LOG` is unset.
    pub log_level: String,

    /// `pretty` or `json`.
    pub log_format: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Upstream platform definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformConfig {
    /// Display name used in logs; generated when blank.
    #[serde(default)]
    pub name: String,

    /// Base URL; the forwarded path is appended to its path.
    pub base_url: String,

    /// Credential injected into upstream requests. Empty disables injection.
    #[serde(default)]
    pub api_key: String,

    /// Group this platform belongs to; blank means the default group.
    #[serde(default)]
    pub group: String,

    /// Weight for weighted selection (higher = more traffic).
    #[serde(default = "default_weight")]
    pub weight: u32,

    /// Priority for failover (lower = preferred).
    #[serde(default)]
    pub priority: i32,

    /// Credential preset: `openai`, `claude`/`anthropic` or `gemini`.
    #[serde(default)]
    pub key_type: Option<String>,

    /// Header the credential is injected into.
    #[serde(default)]
    pub key_header: Option<String>,

    /// Prefix placed before the credential (e.g. `"Bearer "`).
    #[serde(default)]
    pub key_prefix: Option<String>,

    /// Disabled platforms are never selected.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl PlatformConfig {
    /// Convenience constructor used by tests and tooling.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: String::new(),
            group: String::new(),
            weight: default_weight(),
            priority: 0,
            key_type: None,
            key_header: None,
            key_prefix: None,
            enabled: default_enabled(),
        }
    }
}

fn default_weight() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

/// Per-group overrides of the server defaults.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GroupConfig {
    pub strategy: Option<String>,
    pub max_failover: Option<usize>,
    pub timeout_seconds: Option<u64>,
}
