//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → auth.rs (shared-secret bearer check, 401 on failure)
//!     → [routing + selection]
//!     → headers.rs (strip hop-by-hop and client credentials, inject platform credential)
//!     → Upstream
//! ```
//!
//! # Design Decisions
//! - Fail closed: a missing or wrong secret never reaches an upstream
//! - A client credential is never forwarded to any platform

pub mod auth;
pub mod headers;

pub use auth::{check_bearer, AuthError};
pub use headers::{forward_request_headers, relay_response_headers};
