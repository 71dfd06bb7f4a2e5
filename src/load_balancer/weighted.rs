//! Smooth weighted round-robin.
//!
//! Each call adds every candidate's weight to its running accumulator, picks
//! the largest accumulator (first seen wins ties) and subtracts the total
//! weight from the winner. Over `total` picks each candidate is chosen exactly
//! `weight` times, and repeated picks of one candidate are interleaved with the
//! others instead of clustered.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::load_balancer::platform::Platform;

/// Accumulators for one selection key, indexed by platform id.
#[derive(Debug, Default)]
pub struct SmoothWeighted {
    current: HashMap<usize, i64>,
}

impl SmoothWeighted {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick one candidate, returning its index in `candidates`.
    ///
    /// Callers pass candidates in a stable order to keep tie-breaking deterministic.
    pub fn select(&mut self, candidates: &[Arc<Platform>]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }

        let mut total: i64 = 0;
        let mut best: Option<(usize, i64)> = None;

        for (index, platform) in candidates.iter().enumerate() {
            let weight = i64::from(platform.weight());
            total += weight;

            let current = self.current.entry(platform.id()).or_insert(0);
            *current += weight;

            if best.map_or(true, |(_, best_weight)| *current > best_weight) {
                best = Some((index, *current));
            }
        }

        let (selected, _) = best?;
        if let Some(current) = self.current.get_mut(&candidates[selected].id()) {
            *current -= total;
        }

        if self.current.len() > candidates.len() {
            let active: HashSet<usize> = candidates.iter().map(|p| p.id()).collect();
            self.current.retain(|id, _| active.contains(id));
        }

        Some(selected)
    }

    /// Number of tracked accumulators.
    pub fn tracked(&self) -> usize {
        self.current.len()
    }
}
