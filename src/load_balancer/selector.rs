//! Candidate selection.
//!
//! Produces the ordered list of platforms a request will try:
//!
//! - **weighted**: one primary picked by smooth weighted round-robin over all
//!   healthy platforms, then the rest by ascending priority, descending weight.
//! - **failover**: priority tiers in ascending order. Within the most preferred
//!   tier a primary is picked by smooth weighted round-robin (keyed per tier) and
//!   the rest follow by descending weight then name; later tiers are appended
//!   whole in the same order.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use dashmap::DashMap;
use thiserror::Error;

use crate::config::{GroupConfig, ServerConfig};
use crate::load_balancer::platform::Platform;
use crate::load_balancer::pool::PlatformDirectory;
use crate::load_balancer::weighted::SmoothWeighted;
use crate::load_balancer::Policy;

/// Why no candidate could be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("no upstream configured for this group")]
    NoUpstreamConfigured,

    #[error("no currently healthy upstream for this group")]
    NoHealthyUpstream,
}

/// Identity of one smooth weighted state. Weighted and failover never share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectionKey {
    Group(String),
    FailoverTier { group: String, priority: i32 },
}

/// Orders healthy candidates per request according to the group's policy.
#[derive(Debug)]
pub struct CandidateSelector {
    directory: Arc<PlatformDirectory>,
    states: DashMap<SelectionKey, Arc<Mutex<SmoothWeighted>>>,
}

impl CandidateSelector {
    pub fn new(directory: Arc<PlatformDirectory>) -> Self {
        Self {
            directory,
            states: DashMap::new(),
        }
    }

    pub fn directory(&self) -> &Arc<PlatformDirectory> {
        &self.directory
    }

    /// Ordered candidates for `group` at `now`.
    pub fn get_candidates(
        &self,
        group: &str,
        group_override: Option<&GroupConfig>,
        defaults: &ServerConfig,
        now: Instant,
    ) -> Result<Vec<Arc<Platform>>, SelectError> {
        let enabled: Vec<Arc<Platform>> = self
            .directory
            .group(group)
            .iter()
            .filter(|p| p.enabled())
            .cloned()
            .collect();
        if enabled.is_empty() {
            return Err(SelectError::NoUpstreamConfigured);
        }

        let healthy: Vec<Arc<Platform>> = enabled
            .into_iter()
            .filter(|p| p.health().is_healthy(now))
            .collect();
        if healthy.is_empty() {
            return Err(SelectError::NoHealthyUpstream);
        }

        let strategy = group_override
            .and_then(|g| g.strategy.as_deref())
            .unwrap_or(&defaults.strategy);
        let group_key = group.to_ascii_lowercase();

        Ok(match Policy::from_name(strategy) {
            Policy::Weighted => self.weighted_order(healthy, group_key),
            Policy::Failover => self.failover_order(healthy, group_key),
        })
    }

    fn weighted_order(&self, healthy: Vec<Arc<Platform>>, group: String) -> Vec<Arc<Platform>> {
        if healthy.len() == 1 {
            return healthy;
        }

        let mut rest = healthy;
        let primary = self.pick_primary(SelectionKey::Group(group), &mut rest);
        rest.sort_by(|a, b| {
            a.priority()
                .cmp(&b.priority())
                .then_with(|| b.weight().cmp(&a.weight()))
        });

        let mut ordered = Vec::with_capacity(rest.len() + 1);
        ordered.push(primary);
        ordered.extend(rest);
        ordered
    }

    fn failover_order(&self, healthy: Vec<Arc<Platform>>, group: String) -> Vec<Arc<Platform>> {
        let mut tiers: BTreeMap<i32, Vec<Arc<Platform>>> = BTreeMap::new();
        for platform in healthy {
            tiers.entry(platform.priority()).or_default().push(platform);
        }

        let mut ordered = Vec::new();
        for (position, (priority, mut tier)) in tiers.into_iter().enumerate() {
            if position == 0 && tier.len() > 1 {
                let key = SelectionKey::FailoverTier {
                    group: group.clone(),
                    priority,
                };
                let primary = self.pick_primary(key, &mut tier);
                ordered.push(primary);
            }
            tier.sort_by(by_weight_then_name);
            ordered.extend(tier);
        }
        ordered
    }

    /// Remove and return the smooth-weighted pick for `key` from `candidates`.
    fn pick_primary(&self, key: SelectionKey, candidates: &mut Vec<Arc<Platform>>) -> Arc<Platform> {
        // Release the map guard before taking the per-key lock.
        let state = self.states.entry(key).or_default().clone();
        let index = state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .select(candidates)
            .unwrap_or(0);
        candidates.remove(index)
    }
}

fn by_weight_then_name(a: &Arc<Platform>, b: &Arc<Platform>) -> Ordering {
    b.weight().cmp(&a.weight()).then_with(|| {
        a.name()
            .to_ascii_lowercase()
            .cmp(&b.name().to_ascii_lowercase())
    })
}
