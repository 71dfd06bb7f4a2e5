//! Configuration normalization and validation.
//!
//! # Responsibilities
//! - Fill blank or out-of-range values with their defaults
//! - Resolve credential presets (`key_type`) into header/prefix pairs
//! - Semantic validation (serde handles syntactic)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - `validate_config` is a pure function: &ProxyConfig → Result<(), Vec<ValidationError>>
//! - Unknown strategy names are not errors; selection falls back to weighted

use std::collections::{HashMap, HashSet};

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::{GroupConfig, ProxyConfig, ServerConfig};

/// Header used when a platform names neither a preset nor a header.
pub const DEFAULT_KEY_HEADER: &str = "Authorization";

/// Prefix used when a platform names neither a preset nor a prefix.
pub const DEFAULT_KEY_PREFIX: &str = "Bearer ";

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.auth_key is required")]
    MissingAuthKey,

    #[error("server.listen `{0}` is not a valid socket address")]
    InvalidListen(String),

    #[error("at least one platform is required")]
    NoPlatforms,

    #[error("platforms[{index}].base_url is required")]
    MissingBaseUrl { index: usize },

    #[error("platforms[{index}].base_url `{url}` is invalid: {reason}")]
    InvalidBaseUrl {
        index: usize,
        url: String,
        reason: String,
    },

    #[error("platforms[{index}].key_type `{key_type}` is unknown (expected openai, claude, anthropic or gemini)")]
    UnknownKeyType { index: usize, key_type: String },

    #[error("platforms[{index}].key_header `{header}` is not a valid header name")]
    InvalidKeyHeader { index: usize, header: String },

    #[error("platforms[{index}] credential cannot be sent as a header value")]
    InvalidCredential { index: usize },

    #[error("platform name `{0}` is used more than once")]
    DuplicatePlatformName(String),

    #[error("group `{0}` is configured more than once (group names are case-insensitive)")]
    DuplicateGroup(String),
}

/// Header and prefix a credential preset implies.
pub fn credential_preset(key_type: &str) -> Option<(&'static str, &'static str)> {
    match key_type.trim().to_ascii_lowercase().as_str() {
        "openai" => Some(("Authorization", "Bearer ")),
        "claude" | "anthropic" => Some(("x-api-key", "")),
        "gemini" => Some(("x-goog-api-key", "")),
        _ => None,
    }
}

/// Apply defaults in place. Runs before [`validate_config`].
pub fn normalize(config: &mut ProxyConfig) {
    let defaults = ServerConfig::default();
    let server = &mut config.server;

    if server.listen.trim().is_empty() {
        server.listen = defaults.listen;
    }
    if server.default_group.trim().is_empty() {
        server.default_group = defaults.default_group;
    }
    if server.strategy.trim().is_empty() {
        server.strategy = defaults.strategy;
    }
    if server.timeout_seconds == 0 {
        server.timeout_seconds = defaults.timeout_seconds;
    }
    if server.max_failover == 0 {
        server.max_failover = 1;
    }
    if server.max_request_body_bytes == 0 {
        server.max_request_body_bytes = defaults.max_request_body_bytes;
    }

    if config.health.failure_threshold == 0 {
        config.health.failure_threshold = 2;
    }
    if config.health.cooldown_seconds == 0 {
        config.health.cooldown_seconds = 30;
    }

    let default_group = config.server.default_group.clone();
    for (i, platform) in config.platforms.iter_mut().enumerate() {
        if platform.name.trim().is_empty() {
            platform.name = format!("platform-{}", i + 1);
        }
        if platform.group.trim().is_empty() {
            platform.group = default_group.clone();
        }
        if platform.weight == 0 {
            platform.weight = 1;
        }

        let preset = match platform.key_type.as_deref() {
            Some(key_type) => credential_preset(key_type),
            None => Some((DEFAULT_KEY_HEADER, DEFAULT_KEY_PREFIX)),
        };
        // Unknown presets are left untouched and reported by `validate_config`.
        if let Some((header, prefix)) = preset {
            platform.key_header.get_or_insert_with(|| header.to_string());
            platform.key_prefix.get_or_insert_with(|| prefix.to_string());
        }
    }

    let groups: HashMap<String, GroupConfig> = std::mem::take(&mut config.groups)
        .into_iter()
        .map(|(name, group)| {
            if name.trim().is_empty() {
                (default_group.clone(), group)
            } else {
                (name, group)
            }
        })
        .collect();
    config.groups = groups;

    for group in config.groups.values_mut() {
        if group.max_failover == Some(0) {
            group.max_failover = Some(1);
        }
        if group.timeout_seconds == Some(0) {
            group.timeout_seconds = None;
        }
        if group.strategy.as_deref().is_some_and(|s| s.trim().is_empty()) {
            group.strategy = None;
        }
    }
}

/// Validate a normalized configuration, collecting every problem.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.auth_key.trim().is_empty() {
        errors.push(ValidationError::MissingAuthKey);
    }
    if config.server.listen_addr().is_err() {
        errors.push(ValidationError::InvalidListen(config.server.listen.clone()));
    }
    if config.platforms.is_empty() {
        errors.push(ValidationError::NoPlatforms);
    }

    let mut seen = HashSet::new();
    for (index, platform) in config.platforms.iter().enumerate() {
        if !seen.insert(platform.name.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicatePlatformName(platform.name.clone()));
        }

        if platform.base_url.trim().is_empty() {
            errors.push(ValidationError::MissingBaseUrl { index });
        } else if let Err(reason) = check_base_url(&platform.base_url) {
            errors.push(ValidationError::InvalidBaseUrl {
                index,
                url: platform.base_url.clone(),
                reason,
            });
        }

        if let Some(key_type) = &platform.key_type {
            if credential_preset(key_type).is_none() {
                errors.push(ValidationError::UnknownKeyType {
                    index,
                    key_type: key_type.clone(),
                });
            }
        }

        let header = platform.key_header.as_deref().unwrap_or(DEFAULT_KEY_HEADER);
        if HeaderName::from_bytes(header.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidKeyHeader {
                index,
                header: header.to_string(),
            });
        }

        if !platform.api_key.is_empty() {
            let prefix = platform.key_prefix.as_deref().unwrap_or_default();
            if HeaderValue::from_str(&format!("{}{}", prefix, platform.api_key)).is_err() {
                errors.push(ValidationError::InvalidCredential { index });
            }
        }
    }

    let mut group_names: Vec<&String> = config.groups.keys().collect();
    group_names.sort();
    let mut seen_groups = HashSet::new();
    for name in group_names {
        if !seen_groups.insert(name.trim().to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateGroup(name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_base_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme `{}`", other)),
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::PlatformConfig;

    fn base_config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.server.auth_key = "secret".into();
        config
            .platforms
            .push(PlatformConfig::new("", "https://api.example.com/v1"));
        config
    }

    #[test]
    fn test_normalize_fills_defaults() {
        let mut config = base_config();
        config.server.default_group = " ".into();
        config.server.max_failover = 0;
        config.health.failure_threshold = 0;
        config.platforms[0].weight = 0;
        config.groups.insert(String::new(), GroupConfig::default());

        normalize(&mut config);

        assert_eq!(config.server.default_group, "default");
        assert_eq!(config.server.max_failover, 1);
        assert_eq!(config.health.failure_threshold, 2);

        let platform = &config.platforms[0];
        assert_eq!(platform.name, "platform-1");
        assert_eq!(platform.group, "default");
        assert_eq!(platform.weight, 1);
        assert_eq!(platform.key_header.as_deref(), Some("Authorization"));
        assert_eq!(platform.key_prefix.as_deref(), Some("Bearer "));
        assert!(config.groups.contains_key("default"));

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_key_type_presets_and_overrides() {
        let mut config = base_config();
        config.platforms[0].key_type = Some("Claude".into());
        let mut gemini = PlatformConfig::new("g", "https://gemini.example.com");
        gemini.key_type = Some("gemini".into());
        gemini.key_prefix = Some("Key ".into());
        config.platforms.push(gemini);

        normalize(&mut config);

        assert_eq!(config.platforms[0].key_header.as_deref(), Some("x-api-key"));
        assert_eq!(config.platforms[0].key_prefix.as_deref(), Some(""));
        assert_eq!(config.platforms[1].key_header.as_deref(), Some("x-goog-api-key"));
        assert_eq!(config.platforms[1].key_prefix.as_deref(), Some("Key "));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.server.listen = "not-an-address".into();
        let mut bad = PlatformConfig::new("a", "ftp://files.example.com");
        bad.key_type = Some("mystery".into());
        config.platforms.push(bad);
        config.platforms.push(PlatformConfig::new("A", ""));

        normalize(&mut config);
        let errors = validate_config(&config).unwrap_err();

        assert!(errors.contains(&ValidationError::MissingAuthKey));
        assert!(errors.contains(&ValidationError::InvalidListen("not-an-address".into())));
        assert!(errors.contains(&ValidationError::MissingBaseUrl { index: 1 }));
        assert!(errors.contains(&ValidationError::DuplicatePlatformName("A".into())));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidBaseUrl { index: 0, .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnknownKeyType { index: 0, .. })));
    }

    #[test]
    fn test_rejects_case_colliding_groups() {
        let mut config = base_config();
        config.groups.insert("Claude".into(), GroupConfig::default());
        config.groups.insert("claude".into(), GroupConfig::default());
        config.groups.insert("gemini".into(), GroupConfig::default());

        normalize(&mut config);
        let errors = validate_config(&config).unwrap_err();

        // Sorted order: "Claude" is kept, "claude" is the duplicate.
        assert_eq!(errors, vec![ValidationError::DuplicateGroup("claude".into())]);
    }

    #[test]
    fn test_rejects_no_platforms() {
        let mut config = ProxyConfig::default();
        config.server.auth_key = "secret".into();
        normalize(&mut config);
        assert_eq!(validate_config(&config), Err(vec![ValidationError::NoPlatforms]));
    }
}
