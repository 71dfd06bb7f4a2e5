//! Group resolution from the request path.
//!
//! # Responsibilities
//! - Know every group name: default group, platform groups, override keys
//! - Match the first path segment against them (case-insensitive)
//! - Produce the group and the path forwarded upstream
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - A matched segment is stripped; an empty remainder forwards `/`
//! - Unmatched paths go to the default group untouched

use std::collections::HashMap;

use crate::config::ProxyConfig;

/// Result of resolving a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    /// Group name in its configured spelling.
    pub group: String,
    /// Path sent upstream (always starts with `/`).
    pub forward_path: String,
}

/// Maps the first path segment to a known group.
#[derive(Debug, Clone)]
pub struct GroupRouter {
    default_group: String,
    /// Lowercased name → configured spelling.
    known: HashMap<String, String>,
}

impl GroupRouter {
    pub fn from_config(config: &ProxyConfig) -> Self {
        let default_group = config.server.default_group.clone();
        let mut known = HashMap::new();

        let names = std::iter::once(default_group.as_str())
            .chain(config.platforms.iter().map(|p| p.group.as_str()))
            .chain(config.groups.keys().map(String::as_str));
        for name in names.filter(|n| !n.trim().is_empty()) {
            known
                .entry(name.to_ascii_lowercase())
                .or_insert_with(|| name.to_string());
        }

        Self {
            default_group,
            known,
        }
    }

    pub fn default_group(&self) -> &str {
        &self.default_group
    }

    /// Known group names in their configured spelling, sorted.
    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = self.known.values().map(String::as_str).collect();
        groups.sort_by_key(|g| g.to_ascii_lowercase());
        groups
    }

    /// Resolve `path` (the URI path, without query).
    pub fn resolve(&self, path: &str) -> ResolvedRoute {
        let trimmed = path.trim_start_matches('/');
        if trimmed.is_empty() {
            return self.to_default("/");
        }

        let (segment, rest) = match trimmed.find('/') {
            Some(index) => trimmed.split_at(index),
            None => (trimmed, ""),
        };

        match self.known.get(&segment.to_ascii_lowercase()) {
            Some(group) => ResolvedRoute {
                group: group.clone(),
                forward_path: if rest.is_empty() {
                    "/".to_string()
                } else {
                    rest.to_string()
                },
            },
            None => self.to_default(path),
        }
    }

    fn to_default(&self, path: &str) -> ResolvedRoute {
        ResolvedRoute {
            group: self.default_group.clone(),
            forward_path: if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{}", path)
            },
        }
    }
}
