//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Group resolved
//!     → pool.rs (enabled platforms of the group, config order)
//!     → health filter (platforms whose cooldown has passed)
//!     → selector.rs, by policy:
//!         - weighted: smooth weighted primary + deterministic fallback order
//!         - failover: priority tiers, smooth weighted tie-break in the best tier
//!     → ordered candidate list for the attempt loop
//! ```
//!
//! # Design Decisions
//! - The directory is immutable; only health and selection counters mutate
//! - One smooth weighted state per selection key, each behind its own lock
//! - Policies are a closed enum, not a plugin trait

pub mod platform;
pub mod pool;
pub mod selector;
pub mod weighted;

pub use platform::{BuildError, Platform};
pub use pool::PlatformDirectory;
pub use selector::{CandidateSelector, SelectError};

/// Load-balancing policy of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Weighted,
    Failover,
}

impl Policy {
    /// Case-insensitive parse; anything unrecognized is weighted.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "failover" => Policy::Failover,
            _ => Policy::Weighted,
        }
    }

    /// Whether `name` is one of the recognized policy names.
    pub fn is_known(name: &str) -> bool {
        matches!(
            name.trim().to_ascii_lowercase().as_str(),
            "weighted" | "failover"
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Weighted => "weighted",
            Policy::Failover => "failover",
        }
    }
}
