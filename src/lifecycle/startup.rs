//! Startup reporting.
//!
//! # Responsibilities
//! - Log the effective server settings once configuration is loaded
//! - Log every platform and every group with its resolved policy
//!
//! # Design Decisions
//! - Credentials are never logged, only whether one is configured
//! - Unknown strategy names are warned about here; selection treats them as weighted

use std::collections::BTreeMap;

use crate::config::ProxyConfig;
use crate::load_balancer::Policy;

/// Per-group settings after applying overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub name: String,
    pub strategy: String,
    pub policy: Policy,
    pub platforms: usize,
    pub enabled: usize,
    pub max_failover: usize,
    pub timeout_seconds: u64,
}

/// Effective settings of every group that has platforms or an override block.
pub fn group_summaries(config: &ProxyConfig) -> Vec<GroupSummary> {
    let mut names: BTreeMap<String, String> = BTreeMap::new();
    for name in config
        .platforms
        .iter()
        .map(|p| p.group.as_str())
        .chain(config.groups.keys().map(String::as_str))
    {
        names
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| name.to_string());
    }

    names
        .into_values()
        .map(|name| {
            let group = config.group_override(&name);
            let members = config
                .platforms
                .iter()
                .filter(|p| p.group.eq_ignore_ascii_case(&name));
            let strategy = config.effective_strategy(group).to_string();
            GroupSummary {
                policy: Policy::from_name(&strategy),
                strategy,
                platforms: members.clone().count(),
                enabled: members.filter(|p| p.enabled).count(),
                max_failover: config.effective_max_failover(group),
                timeout_seconds: config.effective_timeout(group).as_secs(),
                name,
            }
        })
        .collect()
}

/// Log the loaded configuration.
pub fn report(config: &ProxyConfig) {
    tracing::info!(
        listen = %config.server.listen,
        default_group = %config.server.default_group,
        strategy = %config.server.strategy,
        timeout_seconds = config.server.timeout_seconds,
        max_failover = config.server.max_failover,
        max_request_body_bytes = config.server.max_request_body_bytes,
        failure_threshold = config.health.failure_threshold,
        cooldown_seconds = config.health.cooldown_seconds,
        "Configuration loaded"
    );

    for platform in &config.platforms {
        tracing::info!(
            name = %platform.name,
            group = %platform.group,
            base_url = %platform.base_url,
            weight = platform.weight,
            priority = platform.priority,
            enabled = platform.enabled,
            key_header = platform.key_header.as_deref().unwrap_or_default(),
            credential = !platform.api_key.is_empty(),
            "Platform"
        );
    }

    for group in group_summaries(config) {
        if !Policy::is_known(&group.strategy) {
            tracing::warn!(
                group = %group.name,
                strategy = %group.strategy,
                "Unknown strategy, using weighted"
            );
        }
        tracing::info!(
            group = %group.name,
            policy = group.policy.as_str(),
            platforms = group.platforms,
            enabled = group.enabled,
            max_failover = group.max_failover,
            timeout_seconds = group.timeout_seconds,
            "Group"
        );
    }
}
