//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (first segment vs. known groups)
//!     → Return: group + forward path (default group when nothing matches)
//! ```
//!
//! # Design Decisions
//! - Groups are known at startup, immutable at runtime
//! - Deterministic: same path always resolves to the same group
//! - Never a no-match: unknown prefixes belong to the default group

pub mod router;

pub use router::{GroupRouter, ResolvedRoute};
