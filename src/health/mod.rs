//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Passive health checks (passive.rs):
//!     Attempt outcome observed
//!     → Increment failure count
//!     → Trip the circuit in state.rs once the threshold is reached
//!
//! State machine (state.rs):
//!     Healthy → Unhealthy (cooldown) → Healthy
//!     Cooldown doubles with every trip, capped at ×1024
//! ```
//!
//! # Design Decisions
//! - Health state is per-platform, each record behind its own lock
//! - Locks are held only for the read-modify-write, never across I/O
//! - No cross-platform coupling or global failure budget

pub mod passive;
pub mod state;

pub use passive::HealthTracker;
pub use state::{CircuitBreakEvent, HealthSnapshot, PlatformHealth};
