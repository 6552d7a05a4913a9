//! # Resilient Fetch
//!
//! One logical request, issued with bounded retries, a hard timeout per attempt
//! and a linear backoff between attempts.
//!
//! The retry rules are asymmetric:
//! - a transport failure is retried until the attempt budget is spent, waiting
//!   `backoff_step × attempt` in between;
//! - a timed-out attempt ends the whole call at once with
//!   [`FetchError::Timeout`], even when attempts remain.
//!
//! Cancellation is cooperative. The caller passes a `CancellationToken`; when it
//! fires, the pending attempt (or backoff wait) is dropped and the call returns
//! [`FetchError::Cancelled`].

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

/// A non-timeout failure reported by a data source or the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered with a non-success status code.
    #[error("HTTP {0}")]
    Status(u16),
    /// The request never produced a response (DNS, connect, reset...).
    #[error("network error: {0}")]
    Network(String),
    /// The response body could not be decoded.
    #[error("invalid payload: {0}")]
    Decode(String),
    /// A data source reported a failure of its own.
    #[error("{0}")]
    Source(String),
}

/// Outcome of a failed [`fetch_with_retry`] call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The last attempt failed at the transport level.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// An attempt exceeded its deadline. Never retried.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    /// The caller's token fired before the call finished.
    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Attempt budget and timing for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_retries: u32,
    /// Deadline for each individual attempt.
    pub timeout: Duration,
    /// Backoff unit; the wait after attempt `n` is `backoff_step * n`.
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_millis(5000),
            backoff_step: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, timeout: Duration) -> Self {
        Self {
            max_retries,
            timeout,
            ..Self::default()
        }
    }

    pub fn with_backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    /// Delay inserted after the failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// # Fetch With Retry
///
/// Drives `attempt` until it succeeds, times out, exhausts the policy or the
/// token is cancelled. `attempt` receives the 1-based attempt number and must
/// build a fresh future for every call.
///
/// A policy with `max_retries == 0` still performs one attempt.
///
/// # Errors
/// - [`FetchError::Timeout`] as soon as any attempt exceeds `policy.timeout`.
/// - [`FetchError::Transport`] carrying the final attempt's error.
/// - [`FetchError::Cancelled`] if `cancel` fires first.
pub async fn fetch_with_retry<T, F, Fut>(
    mut attempt: F,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = policy.max_retries.max(1);
    let mut attempt_no: u32 = 0;

    loop {
        attempt_no += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            res = timeout(policy.timeout, attempt(attempt_no)) => res,
        };

        let err = match outcome {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => err,
            Err(_elapsed) => {
                return Err(FetchError::Timeout {
                    timeout_ms: policy.timeout_ms(),
                })
            }
        };

        if attempt_no >= max_attempts {
            return Err(err.into());
        }

        log::warn!("Attempt {} failed ({}). Retrying...", attempt_no, err);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = sleep(policy.backoff_for(attempt_no)) => {}
        }
    }
}
