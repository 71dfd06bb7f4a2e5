//! Shared-secret bearer authorization.
//!
//! Clients present `Authorization: Bearer <auth_key>`. The scheme is matched
//! case-insensitively, the token byte for byte.

use axum::http::{header, HeaderMap};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing bearer credential")]
    Missing,

    #[error("bearer credential does not match")]
    Mismatch,
}

/// Check the inbound `Authorization` header against `secret`.
pub fn check_bearer(headers: &HeaderMap, secret: &str) -> Result<(), AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::Missing)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::Missing)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Missing);
    }

    if !secret.is_empty() && token == secret {
        Ok(())
    } else {
        Err(AuthError::Mismatch)
    }
}
