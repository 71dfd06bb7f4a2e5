//! Platform directory.
//!
//! # Responsibilities
//! - Build one runtime [`Platform`] per configured platform, once, at startup
//! - Group platforms by (case-insensitive) group name, preserving config order
//! - Serve lock-free lookups to every request

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::PlatformConfig;
use crate::load_balancer::platform::{BuildError, Platform};

/// Immutable map of group name → platforms in configuration order.
#[derive(Debug, Default)]
pub struct PlatformDirectory {
    groups: HashMap<String, Vec<Arc<Platform>>>,
    all: Vec<Arc<Platform>>,
}

impl PlatformDirectory {
    /// Build the directory from (normalized) platform configurations.
    pub fn new(configs: &[PlatformConfig]) -> Result<Self, BuildError> {
        let mut groups: HashMap<String, Vec<Arc<Platform>>> = HashMap::new();
        let mut all = Vec::with_capacity(configs.len());

        for (id, config) in configs.iter().enumerate() {
            let platform = Arc::new(Platform::new(id, config.clone())?);
            groups
                .entry(platform.group().to_ascii_lowercase())
                .or_default()
                .push(platform.clone());
            all.push(platform);
        }

        Ok(Self { groups, all })
    }

    /// Platforms in a group (enabled or not), in configuration order.
    pub fn group(&self, name: &str) -> &[Arc<Platform>] {
        self.groups
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Find a platform by name, ignoring case.
    pub fn platform(&self, name: &str) -> Option<&Arc<Platform>> {
        self.all.iter().find(|p| p.name().eq_ignore_ascii_case(name))
    }

    /// Every platform, in configuration order.
    pub fn all(&self) -> &[Arc<Platform>] {
        &self.all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(name: &str, group: &str) -> PlatformConfig {
        let mut config = PlatformConfig::new(name, "http://127.0.0.1:1");
        config.group = group.into();
        config
    }

    #[test]
    fn test_groups_are_case_insensitive_and_ordered() {
        let directory = PlatformDirectory::new(&[
            platform("a", "Chat"),
            platform("b", "embed"),
            platform("c", "chat"),
        ])
        .unwrap();

        let names: Vec<_> = directory.group("CHAT").iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert!(directory.group("missing").is_empty());
        assert_eq!(directory.platform("B").unwrap().id(), 1);
        assert_eq!(directory.all().len(), 3);
    }
}
