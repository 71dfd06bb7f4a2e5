//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define switch metrics (attempts, latency, circuit trips, rejections)
//! - Expose a Prometheus-compatible scrape endpoint
//! - Track per-group and per-platform outcomes
//!
//! # Metrics
//! - `api_switch_attempts_total` (counter): upstream attempts by group, platform, outcome
//! - `api_switch_attempt_duration_seconds` (histogram): attempt latency (through the relayed body for successes)
//! - `api_switch_circuit_breaks_total` (counter): circuit trips by group, platform
//! - `api_switch_rejections_total` (counter): requests answered by the switch itself, by reason
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Labels are bounded by configuration (groups, platforms, fixed reasons)

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const ATTEMPTS_TOTAL: &str = "api_switch_attempts_total";
pub const ATTEMPT_DURATION: &str = "api_switch_attempt_duration_seconds";
pub const CIRCUIT_BREAKS_TOTAL: &str = "api_switch_circuit_breaks_total";
pub const REJECTIONS_TOTAL: &str = "api_switch_rejections_total";

/// Outcome label of an upstream attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    FailureStatus,
    Timeout,
    TransportError,
    /// The upstream body broke after a success status was relayed.
    BodyError,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::FailureStatus => "failure_status",
            AttemptOutcome::Timeout => "timeout",
            AttemptOutcome::TransportError => "transport_error",
            AttemptOutcome::BodyError => "body_error",
        }
    }
}

/// Install the Prometheus recorder and its HTTP listener on `addr`.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(ATTEMPTS_TOTAL, Unit::Count, "Upstream attempts by outcome");
    describe_histogram!(ATTEMPT_DURATION, Unit::Seconds, "Upstream attempt latency");
    describe_counter!(CIRCUIT_BREAKS_TOTAL, Unit::Count, "Platform circuit trips");
    describe_counter!(REJECTIONS_TOTAL, Unit::Count, "Requests rejected by the switch");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_attempt(group: &str, platform: &str, outcome: AttemptOutcome, elapsed: Duration) {
    counter!(
        ATTEMPTS_TOTAL,
        "group" => group.to_owned(),
        "platform" => platform.to_owned(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!(
        ATTEMPT_DURATION,
        "group" => group.to_owned(),
        "platform" => platform.to_owned()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_circuit_break(group: &str, platform: &str) {
    counter!(
        CIRCUIT_BREAKS_TOTAL,
        "group" => group.to_owned(),
        "platform" => platform.to_owned()
    )
    .increment(1);
}

/// `reason` is one of `unauthorized`, `no_upstream`, `no_healthy_upstream`,
/// `exhausted`, `bad_request`, `shutdown`.
pub fn record_rejection(reason: &'static str) {
    counter!(REJECTIONS_TOTAL, "reason" => reason).increment(1);
}
