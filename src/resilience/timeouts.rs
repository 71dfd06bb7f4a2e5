//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound every upstream attempt by the effective per-group timeout
//! - Abort the attempt when the inbound side goes away
//! - Report which of the two fired
//!
//! # Design Decisions
//! - Uses Tokio's timer and `select!`; the inbound cancellation is polled first
//! - A cancellation is never attributed to the platform, a deadline always is

use std::future::Future;
use std::time::Duration;

/// Why an attempt stopped before the dispatch completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    /// The inbound cancellation fired (server shutting down).
    Cancelled,
    /// The per-attempt deadline elapsed first.
    DeadlineElapsed,
}

/// Run `dispatch` until it completes, `timeout` elapses or `cancelled` resolves.
pub async fn run_attempt<F, C>(
    dispatch: F,
    timeout: Duration,
    cancelled: C,
) -> Result<F::Output, Interrupted>
where
    F: Future,
    C: Future<Output = ()>,
{
    tokio::select! {
        biased;
        _ = cancelled => Err(Interrupted::Cancelled),
        _ = tokio::time::sleep(timeout) => Err(Interrupted::DeadlineElapsed),
        output = dispatch => Ok(output),
    }
}
