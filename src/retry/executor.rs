//! Retry Executor Module
//!
//! Runs a caller-supplied operation under a retry policy, classifying each
//! failure before scheduling another attempt.

use std::future::Future;

use tracing::{debug, info, warn};

use crate::error::{BackstopError, Result};
use crate::retry::RetryPolicy;

// == Retry Executor ==
/// Executes operations with automatic retries and backoff.
///
/// The executor itself is stateless; all behavior comes from the policy.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    // == Constructor ==
    /// Creates an executor for the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy driving this executor.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    // == Execute ==
    /// Invokes `operation` until it succeeds, fails non-retryably, or the
    /// attempt budget is exhausted.
    ///
    /// Attempt indices run `0..max_attempts`. A failure classified as
    /// non-retryable propagates immediately with no further attempts; a
    /// retryable failure on any attempt but the last suspends the caller
    /// for the policy's backoff delay before the next attempt. Exhaustion
    /// fails with the last observed error.
    ///
    /// # Arguments
    /// * `context` - Label describing the operation, used in logs
    /// * `operation` - The operation to run; invoked once per attempt
    pub async fn execute<T, F, Fut>(&self, context: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut last_error = None;

        for attempt in 0..max_attempts {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(
                            "{}: succeeded on attempt {} of {}",
                            context,
                            attempt + 1,
                            max_attempts
                        );
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if !err.is_retryable() {
                        debug!(
                            "{}: non-retryable failure on attempt {}: {}",
                            context,
                            attempt + 1,
                            err
                        );
                        return Err(err);
                    }

                    if attempt + 1 < max_attempts {
                        let delay = self.policy.delay_for_attempt(attempt);
                        warn!(
                            "{}: attempt {} of {} failed ({}), retrying in {:?}",
                            context,
                            attempt + 1,
                            max_attempts,
                            err,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                    }

                    last_error = Some(err);
                }
            }
        }

        // max_attempts >= 1, so at least one failure was recorded
        Err(last_error.unwrap_or_else(|| {
            BackstopError::Unclassified(format!("{}: retry budget exhausted", context))
        }))
    }
}
