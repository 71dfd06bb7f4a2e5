//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy orchestrator produces:
//!     → logging.rs (attempt records, circuit-break records)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID is attached by the HTTP layer's trace span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, AttemptRecord, CircuitBreakRecord, RequestLogger};
