//! Per-platform health and circuit state.
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: consecutive failures reach the threshold (trip)
//! Unhealthy → Healthy: the cooldown deadline passes, or a success is reported
//! ```
//!
//! Health is derived from the deadline at the moment of each check and never
//! cached. Every trip increments a trip counter that is never reset, so repeated
//! trips cool down for exponentially longer.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::resilience::backoff::{cooldown_for_trip, deadline_after};

/// Returned by [`PlatformHealth::report_failure`] when the circuit trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakEvent {
    /// How long the platform is excluded.
    pub cooldown: Duration,
    /// When the platform becomes eligible again.
    pub until: Instant,
    /// Number of trips so far, this one included.
    pub trip_count: u32,
}

/// Point-in-time copy of a platform's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HealthSnapshot {
    pub consecutive_failures: u32,
    pub trip_count: u32,
    pub unhealthy_until: Option<Instant>,
}

/// Mutable health record for one platform.
#[derive(Debug, Default)]
pub struct PlatformHealth {
    inner: Mutex<HealthSnapshot>,
}

impl PlatformHealth {
    pub fn new() -> Self {
        Self::default()
    }

    // Guarded data is plain counters, so a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, HealthSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True iff no cooldown deadline is in force at `now`.
    pub fn is_healthy(&self, now: Instant) -> bool {
        match self.lock().unhealthy_until {
            Some(until) => until <= now,
            None => true,
        }
    }

    /// Clear the failure counter and any cooldown deadline.
    pub fn report_success(&self) {
        let mut state = self.lock();
        state.consecutive_failures = 0;
        state.unhealthy_until = None;
    }

    /// Count a failure; trips the circuit once `threshold` consecutive failures accumulate.
    pub fn report_failure(
        &self,
        threshold: u32,
        base_cooldown: Duration,
        now: Instant,
    ) -> Option<CircuitBreakEvent> {
        let mut state = self.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        if state.consecutive_failures < threshold.max(1) {
            return None;
        }

        state.consecutive_failures = 0;
        state.trip_count = state.trip_count.saturating_add(1);
        let cooldown = cooldown_for_trip(base_cooldown, state.trip_count);
        let until = deadline_after(now, cooldown);
        state.unhealthy_until = Some(until);

        Some(CircuitBreakEvent {
            cooldown,
            until,
            trip_count: state.trip_count,
        })
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        *self.lock()
    }
}
