//! Passive health tracking.
//!
//! # Responsibilities
//! - Observe request outcomes and feed them into each platform's state
//! - Own the configured threshold and base cooldown so callers never do cooldown math
//!
//! # Design Decisions
//! - Any upstream status >= 400 counts as a failure, as do timeouts and transport errors
//! - Client aborts are never reported

use std::time::{Duration, Instant};

use axum::http::StatusCode;

use crate::config::HealthConfig;
use crate::health::state::CircuitBreakEvent;
use crate::load_balancer::platform::Platform;

#[derive(Debug, Clone)]
pub struct HealthTracker {
    failure_threshold: u32,
    base_cooldown: Duration,
}

impl HealthTracker {
    pub fn new(config: &HealthConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            base_cooldown: config.base_cooldown(),
        }
    }

    pub fn is_healthy(&self, platform: &Platform, now: Instant) -> bool {
        platform.health().is_healthy(now)
    }

    pub fn report_success(&self, platform: &Platform) {
        platform.health().report_success();
    }

    pub fn report_failure(&self, platform: &Platform, now: Instant) -> Option<CircuitBreakEvent> {
        platform
            .health()
            .report_failure(self.failure_threshold, self.base_cooldown, now)
    }

    /// Whether an upstream status counts as a failed attempt.
    pub fn is_failure_status(status: StatusCode) -> bool {
        status.as_u16() >= 400
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatformConfig;

    #[test]
    fn test_tracker_applies_configured_threshold() {
        let config = HealthConfig {
            failure_threshold: 2,
            cooldown_seconds: 10,
        };
        let tracker = HealthTracker::new(&config);
        let platform = Platform::new(0, PlatformConfig::new("a", "http://127.0.0.1:1")).unwrap();
        let now = Instant::now();

        assert!(tracker.report_failure(&platform, now).is_none());
        let event = tracker.report_failure(&platform, now).unwrap();
        assert_eq!(event.cooldown, Duration::from_secs(10));
        assert!(!tracker.is_healthy(&platform, now));

        tracker.report_success(&platform);
        assert!(tracker.is_healthy(&platform, now));
    }

    #[test]
    fn test_failure_statuses() {
        assert!(!HealthTracker::is_failure_status(StatusCode::OK));
        assert!(!HealthTracker::is_failure_status(StatusCode::FOUND));
        assert!(HealthTracker::is_failure_status(StatusCode::BAD_REQUEST));
        assert!(HealthTracker::is_failure_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(HealthTracker::is_failure_status(StatusCode::BAD_GATEWAY));
    }
}
