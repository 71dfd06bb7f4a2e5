//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber (pretty or JSON)
//! - Emit one record per upstream attempt and one per circuit trip
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - Records are `tracing` events with typed fields, not preformatted lines
//! - Timestamps are wall-clock milliseconds since the Unix epoch

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::health::CircuitBreakEvent;

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.trim()));
    let registry = tracing_subscriber::registry().with(filter);

    if config.log_format.trim().eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    }
}

fn unix_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(millis)
        .unwrap_or_default()
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Outcome of one upstream attempt.
#[derive(Debug, Clone)]
pub struct AttemptRecord<'a> {
    pub timestamp: SystemTime,
    pub group: &'a str,
    pub platform: &'a str,
    pub method: &'a str,
    /// Original request path and query.
    pub path: &'a str,
    pub status: u16,
    pub elapsed: Duration,
    pub success: bool,
    /// One-based.
    pub attempt: usize,
    pub attempt_limit: usize,
    pub error: Option<&'a str>,
}

/// A platform's circuit tripped.
#[derive(Debug, Clone)]
pub struct CircuitBreakRecord<'a> {
    pub timestamp: SystemTime,
    pub group: &'a str,
    pub platform: &'a str,
    /// Status code, `timeout` or the transport error message.
    pub reason: &'a str,
    pub cooldown: Duration,
    /// Wall-clock end of the cooldown.
    pub until: SystemTime,
    pub trip_count: u32,
}

impl<'a> CircuitBreakRecord<'a> {
    pub fn from_event(
        group: &'a str,
        platform: &'a str,
        reason: &'a str,
        event: &CircuitBreakEvent,
    ) -> Self {
        let timestamp = SystemTime::now();
        let remaining = event.until.saturating_duration_since(Instant::now());
        Self {
            timestamp,
            group,
            platform,
            reason,
            cooldown: event.cooldown,
            until: timestamp.checked_add(remaining).unwrap_or(timestamp),
            trip_count: event.trip_count,
        }
    }
}

/// Sink for attempt and circuit-break records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger;

impl RequestLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn log_attempt(&self, record: &AttemptRecord<'_>) {
        let timestamp = unix_millis(record.timestamp);
        let elapsed_ms = millis(record.elapsed);

        if record.success {
            tracing::info!(
                timestamp,
                group = record.group,
                platform = record.platform,
                method = record.method,
                path = record.path,
                status = record.status,
                elapsed_ms,
                attempt = record.attempt,
                attempt_limit = record.attempt_limit,
                "upstream attempt succeeded"
            );
        } else {
            tracing::warn!(
                timestamp,
                group = record.group,
                platform = record.platform,
                method = record.method,
                path = record.path,
                status = record.status,
                elapsed_ms,
                attempt = record.attempt,
                attempt_limit = record.attempt_limit,
                error = record.error.unwrap_or(""),
                "upstream attempt failed"
            );
        }
    }

    pub fn log_circuit_break(&self, record: &CircuitBreakRecord<'_>) {
        tracing::error!(
            timestamp = unix_millis(record.timestamp),
            group = record.group,
            platform = record.platform,
            reason = record.reason,
            cooldown_secs = record.cooldown.as_secs(),
            until = unix_millis(record.until),
            trip_count = record.trip_count,
            "circuit opened"
        );
    }
}
