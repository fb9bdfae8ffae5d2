//! Fixed-delay retry loop shared by resolution and transfer.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// How many times to retry a failed operation and how long to wait between
/// attempts. The delay is fixed, not exponential.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// What the operation closure decided about its own outcome.
pub enum RetryAction<T, E> {
    Success(T),
    /// Retryable failure; the loop sleeps and tries again.
    Retry(E),
    /// Fatal failure; returned immediately.
    Fail(E),
}

/// Run `operation` until it succeeds, fails fatally, or exhausts the policy.
///
/// `cancelled` produces the error returned when `token` fires, letting each
/// caller keep its own error type.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    cancelled: impl Fn() -> E,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = RetryAction<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        if token.is_cancelled() {
            return Err(cancelled());
        }

        match operation(attempt).await {
            RetryAction::Success(value) => return Ok(value),
            RetryAction::Fail(err) => return Err(err),
            RetryAction::Retry(err) => {
                if attempt >= policy.max_retries {
                    return Err(err);
                }
                warn!(
                    attempt = attempt + 1,
                    max = policy.max_retries + 1,
                    error = %err,
                    "attempt failed, retrying"
                );
                tokio::select! {
                    _ = token.cancelled() => return Err(cancelled()),
                    _ = tokio::time::sleep(policy.delay) => {}
                }
                attempt += 1;
            }
        }
    }
}
