//! Circuit Breaker Module
//!
//! Three-state guard that fails fast when an upstream is judged unhealthy,
//! and probes it with a single trial call after a cooldown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{BackstopError, Result};

// == Circuit State ==
/// The breaker's position in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Operations execute normally
    Closed,
    /// Operations fail fast without being invoked
    Open,
    /// A single trial call decides the next state
    HalfOpen,
}

// == Circuit Breaker Config ==
/// Thresholds governing the breaker's transitions.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit (minimum 1)
    pub failure_threshold: u32,
    /// How long the circuit stays open before allowing a trial call
    pub reset_timeout: Duration,
}

impl CircuitBreakerConfig {
    /// Builds breaker thresholds from the toolkit configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            reset_timeout: Duration::from_millis(config.reset_timeout_ms),
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

/// Mutable breaker state; only operation outcomes touch it.
#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

// == Circuit Breaker ==
/// Wraps operations and fails fast while the upstream is unhealthy.
///
/// Cloning shares the underlying state, so one breaker can guard an
/// upstream across callers. The internal lock is held only around state
/// inspection and update, never across the wrapped operation.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    inner: Arc<Mutex<BreakerState>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    // == Constructor ==
    /// Creates a breaker in the Closed state.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let config = CircuitBreakerConfig {
            failure_threshold: config.failure_threshold.max(1),
            ..config
        };
        Self {
            inner: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            })),
            config,
        }
    }

    /// The thresholds this breaker was built with.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    // == Observation ==
    /// Current state of the circuit.
    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Consecutive failures observed since the last success.
    pub async fn consecutive_failures(&self) -> u32 {
        self.inner.lock().await.consecutive_failures
    }

    // == Call ==
    /// Runs `operation` through the breaker.
    ///
    /// While Open and within the reset timeout, the call fails with
    /// `CircuitOpen` and the operation is never invoked. Once the timeout
    /// elapses the circuit moves to HalfOpen before evaluating the call,
    /// and the operation runs as a trial: success closes the circuit,
    /// failure re-opens it and restarts the cooldown.
    ///
    /// # Arguments
    /// * `context` - Label describing the guarded upstream, used in logs
    /// * `operation` - The operation to guard
    pub async fn call<T, F, Fut>(&self, context: &str, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        {
            let mut inner = self.inner.lock().await;
            if inner.state == CircuitState::Open {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.config.reset_timeout {
                    inner.state = CircuitState::HalfOpen;
                    info!("{}: reset timeout elapsed, allowing trial call", context);
                } else {
                    return Err(BackstopError::CircuitOpen(format!(
                        "{}: upstream cooling off for another {:?}",
                        context,
                        self.config.reset_timeout - elapsed
                    )));
                }
            }
        }

        let result = operation().await;

        let mut inner = self.inner.lock().await;
        match &result {
            Ok(_) => {
                if inner.state == CircuitState::HalfOpen {
                    info!("{}: trial call succeeded, circuit closed", context);
                }
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
            }
            Err(err) => {
                if inner.state == CircuitState::HalfOpen {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    warn!("{}: trial call failed ({}), circuit re-opened", context, err);
                } else {
                    inner.consecutive_failures += 1;
                    if inner.consecutive_failures >= self.config.failure_threshold {
                        inner.state = CircuitState::Open;
                        inner.opened_at = Some(Instant::now());
                        warn!(
                            "{}: {} consecutive failures, circuit opened",
                            context, inner.consecutive_failures
                        );
                    }
                }
            }
        }

        result
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_breaker(threshold: u32, reset_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            reset_timeout: Duration::from_millis(reset_ms),
        })
    }

    async fn fail(breaker: &CircuitBreaker) -> Result<String> {
        breaker
            .call("test", || async {
                Err(BackstopError::Upstream("boom".to_string()))
            })
            .await
    }

    async fn succeed(breaker: &CircuitBreaker) -> Result<String> {
        breaker.call("test", || async { Ok("ok".to_string()) }).await
    }

    #[tokio::test]
    async fn test_breaker_starts_closed() {
        let breaker = test_breaker(3, 1000);
        assert_eq!(breaker.state().await, CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures().await, 0);
    }

    #[tokio::test]
    async fn test_breaker_success_resets_failure_count() {
        let breaker = test_breaker(3, 1000);

        let _ = fail(&breaker).await;
        let _ = fail(&breaker).await;
        assert_eq!(breaker.consecutive_failures().await, 2);

        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.consecutive_failures().await, 0);
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_breaker_opens_at_threshold() {
        let breaker = test_breaker(3, 1000);

        for _ in 0..3 {
            let _ = fail(&breaker).await;
        }

        assert_eq!(breaker.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_breaker_open_fails_fast_without_invoking() {
        let breaker = test_breaker(1, 60_000);
        let _ = fail(&breaker).await;
        assert_eq!(breaker.state().await, CircuitState::Open);

        let calls = AtomicU32::new(0);
        let result = breaker
            .call("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok("never".to_string()) }
            })
            .await;

        assert!(matches!(result, Err(BackstopError::CircuitOpen(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_breaker_trial_success_closes_circuit() {
        let breaker = test_breaker(3, 100);

        for _ in 0..3 {
            let _ = fail(&breaker).await;
        }
        assert_eq!(breaker.state().await, CircuitState::Open);

        // Wait out the reset timeout; the next call is the trial
        tokio::time::sleep(Duration::from_millis(150)).await;

        let calls = AtomicU32::new(0);
        let result = breaker
            .call("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok("recovered".to_string()) }
            })
            .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(breaker.state().await, CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures().await, 0);
    }

    #[tokio::test]
    async fn test_breaker_trial_failure_reopens_circuit() {
        let breaker = test_breaker(1, 100);

        let _ = fail(&breaker).await;
        assert_eq!(breaker.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(150)).await;

        // Trial fails; cooldown restarts
        let _ = fail(&breaker).await;
        assert_eq!(breaker.state().await, CircuitState::Open);

        // Still within the restarted cooldown
        let result = succeed(&breaker).await;
        assert!(matches!(result, Err(BackstopError::CircuitOpen(_))));
    }

    #[tokio::test]
    async fn test_breaker_threshold_clamped_to_one() {
        let breaker = test_breaker(0, 1000);

        let _ = fail(&breaker).await;
        assert_eq!(breaker.state().await, CircuitState::Open);
    }

    #[test]
    fn test_breaker_config_from_toolkit_config() {
        let config = CircuitBreakerConfig::from_config(&Config::default());
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.reset_timeout, Duration::from_millis(30_000));
    }

    #[tokio::test]
    async fn test_breaker_clones_share_state() {
        let breaker = test_breaker(1, 60_000);
        let clone = breaker.clone();

        let _ = fail(&breaker).await;

        assert_eq!(clone.state().await, CircuitState::Open);
    }
}
