use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Policy {
    /// Total number of calls, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub delay: Duration,
    /// Keep retrying errors that report themselves as non-transient.
    pub retry_permanent: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            retry_permanent: true,
        }
    }
}

/// Classifies an error for [`retry`].
pub(crate) trait Transient {
    fn is_transient(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum RetryError<E> {
    #[error("after {attempts} attempts, last error: {last}")]
    Exhausted { attempts: u32, last: E },
    #[error("not retried after attempt {attempt}: {error}")]
    Permanent { attempt: u32, error: E },
}

impl<E> RetryError<E> {
    pub(crate) fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Permanent { attempt, .. } => *attempt,
        }
    }

    /// The error from the final attempt.
    pub(crate) fn last(&self) -> &E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Permanent { error, .. } => error,
        }
    }
}

/// Call `operation` until it succeeds or the policy's attempt budget is spent.
/// Attempts are spaced by a fixed delay, without backoff or jitter.
pub(crate) async fn retry<T, E, F, Fut>(policy: Policy, mut operation: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if !policy.retry_permanent && !error.is_transient() => {
                return Err(RetryError::Permanent { attempt, error });
            }
            Err(last) if attempt >= max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last,
                });
            }
            Err(error) => {
                tracing::warn!(attempt, max_attempts, "Attempt failed: {error}");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
