//! Retry decisions.
//!
//! # Responsibilities
//! - Bound the number of platforms tried per request
//! - Decide whether a failed attempt may move on to the next platform
//! - Classify attempt failures for logs and health reasons
//!
//! # Design Decisions
//! - Any upstream status >= 400 is retryable; there is no status allow-list
//! - No backoff between attempts: the next attempt goes to a different platform
//! - A body that cannot be replayed is never sent twice

use thiserror::Error;

/// Failure of a single attempt that produced no upstream response.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("timeout")]
    Timeout,

    #[error("{0}")]
    Transport(String),
}

impl AttemptError {
    /// Status reported in attempt logs for this failure.
    pub fn log_status(&self) -> u16 {
        match self {
            AttemptError::Timeout => 504,
            AttemptError::Transport(_) => 502,
        }
    }
}

/// Number of attempts a request may make.
pub fn attempt_limit(max_failover: usize, candidates: usize) -> usize {
    max_failover.min(candidates).max(1)
}

/// Whether attempt `attempt` (zero-based) may be followed by another one.
pub fn can_retry(attempt: usize, limit: usize, body_retryable: bool) -> bool {
    body_retryable && attempt + 1 < limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_limit() {
        assert_eq!(attempt_limit(2, 5), 2);
        assert_eq!(attempt_limit(5, 3), 3);
        assert_eq!(attempt_limit(0, 3), 1);
        assert_eq!(attempt_limit(3, 0), 1);
    }

    #[test]
    fn test_can_retry() {
        assert!(can_retry(0, 2, true));
        assert!(!can_retry(1, 2, true));
        assert!(!can_retry(0, 2, false));
        assert!(!can_retry(0, 1, true));
    }

    #[test]
    fn test_attempt_error_reason() {
        assert_eq!(AttemptError::Timeout.to_string(), "timeout");
        assert_eq!(AttemptError::Timeout.log_status(), 504);
        let transport = AttemptError::Transport("connection refused".into());
        assert_eq!(transport.to_string(), "connection refused");
        assert_eq!(transport.log_status(), 502);
    }
}
