//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt against a platform:
//!     → timeouts.rs (deadline vs. inbound cancellation vs. dispatch)
//!     → On failure: retries.rs (attempts left? body replayable?)
//!     → backoff.rs (cooldown length when the platform's circuit trips)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream attempt has a deadline
//! - Retries move to another platform instead of waiting
//! - Cooldowns grow exponentially with a bounded multiplier

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{attempt_limit, can_retry, AttemptError};
pub use timeouts::{run_attempt, Interrupted};
