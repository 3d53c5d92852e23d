//! Retry Policy Module
//!
//! Pure retry configuration: a backoff strategy plus attempt and delay
//! bounds. Policies are immutable data; the executor interprets them.

use std::time::Duration;

// == Backoff Strategy ==
/// The backoff strategy for retry delays.
///
/// Modeled as a tagged variant so strategy handling is exhaustive at
/// compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Delay grows linearly: base * (attempt + 1).
    Linear,
    /// Delay doubles each attempt: base * 2^attempt, with jitter.
    Exponential,
    /// Delay follows the Fibonacci sequence: base * fib(attempt).
    Fibonacci,
    /// Delay comes from an explicit table; past the end, max_delay applies.
    Custom(Vec<Duration>),
}

/// Fibonacci multipliers; attempts past the table clamp to the last term.
const FIBONACCI: [u32; 12] = [1, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144];

// == Retry Policy ==
/// Describes how a failed operation is retried.
///
/// `max_attempts` counts the initial try plus retries and is always at
/// least 1. Every computed delay is clamped to `[0, max_delay]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    strategy: BackoffStrategy,
}

impl RetryPolicy {
    const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

    // == Constructors ==
    /// Creates a policy with linearly increasing delay.
    pub fn linear(base_delay: Duration) -> Self {
        Self::with_strategy(base_delay, BackoffStrategy::Linear)
    }

    /// Creates a policy with exponentially increasing delay.
    ///
    /// Each delay carries jitter drawn uniformly from [0, computed / 10).
    pub fn exponential(base_delay: Duration) -> Self {
        Self::with_strategy(base_delay, BackoffStrategy::Exponential)
    }

    /// Creates a policy with Fibonacci-sequenced delay.
    pub fn fibonacci(base_delay: Duration) -> Self {
        Self::with_strategy(base_delay, BackoffStrategy::Fibonacci)
    }

    /// Creates a policy with an explicit delay table.
    ///
    /// Attempts beyond the table fall back to the max delay.
    pub fn custom(delays: Vec<Duration>) -> Self {
        Self::with_strategy(Duration::ZERO, BackoffStrategy::Custom(delays))
    }

    fn with_strategy(base_delay: Duration, strategy: BackoffStrategy) -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            base_delay,
            max_delay: Self::DEFAULT_MAX_DELAY,
            strategy,
        }
    }

    /// Sets the total attempt budget (initial try included, minimum 1).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the delay cap applied to every strategy.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    // == Accessors ==
    /// Total attempt budget, initial try included.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Base delay the strategy scales from.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Cap applied to every computed delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// The configured backoff strategy.
    pub fn strategy(&self) -> &BackoffStrategy {
        &self.strategy
    }

    // == Delay Calculation ==
    /// Computes the delay before the retry following `attempt` (zero-based).
    ///
    /// The exponential strategy adds jitter drawn uniformly from
    /// [0, computed / 10). The final value is clamped to `[0, max_delay]`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let computed = match &self.strategy {
            BackoffStrategy::Exponential => {
                let raw = self.raw_delay_for_attempt(attempt);
                raw.saturating_add(exponential_jitter(raw))
            }
            _ => self.raw_delay_for_attempt(attempt),
        };

        computed.min(self.max_delay)
    }

    /// The strategy's delay before jitter and clamping.
    fn raw_delay_for_attempt(&self, attempt: u32) -> Duration {
        match &self.strategy {
            BackoffStrategy::Linear => {
                self.base_delay.saturating_mul(attempt.saturating_add(1))
            }
            BackoffStrategy::Exponential => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(attempt)),
            BackoffStrategy::Fibonacci => {
                let index = (attempt as usize).min(FIBONACCI.len() - 1);
                self.base_delay.saturating_mul(FIBONACCI[index])
            }
            BackoffStrategy::Custom(delays) => delays
                .get(attempt as usize)
                .copied()
                .unwrap_or(self.max_delay),
        }
    }
}

/// Uniform jitter in [0, computed / 10); zero when the range is empty.
fn exponential_jitter(computed: Duration) -> Duration {
    use rand::Rng;

    let cap_ms = computed.as_millis() as u64 / 10;
    if cap_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..cap_ms))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::linear(Duration::from_millis(100)).with_max_attempts(5);

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_exponential_raw_delays() {
        let policy = RetryPolicy::exponential(Duration::from_millis(1000))
            .with_max_delay(Duration::from_millis(10_000));

        // Base values before jitter/clamp: 1000, 2000, 4000, 8000
        assert_eq!(
            policy.raw_delay_for_attempt(0),
            Duration::from_millis(1000)
        );
        assert_eq!(
            policy.raw_delay_for_attempt(1),
            Duration::from_millis(2000)
        );
        assert_eq!(
            policy.raw_delay_for_attempt(2),
            Duration::from_millis(4000)
        );
        assert_eq!(
            policy.raw_delay_for_attempt(3),
            Duration::from_millis(8000)
        );
    }

    #[test]
    fn test_exponential_jitter_bounds() {
        let policy = RetryPolicy::exponential(Duration::from_millis(1000))
            .with_max_delay(Duration::from_millis(10_000));

        for _ in 0..50 {
            let delay = policy.delay_for_attempt(2);
            // 4000ms plus jitter in [0, 400)
            assert!(delay >= Duration::from_millis(4000));
            assert!(delay < Duration::from_millis(4400));
        }
    }

    #[test]
    fn test_exponential_clamped_to_max_delay() {
        let policy = RetryPolicy::exponential(Duration::from_millis(1000))
            .with_max_delay(Duration::from_millis(10_000));

        // 2^5 * 1000 = 32000ms, clamped
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(10_000));
    }

    #[test]
    fn test_fibonacci_delays() {
        let policy = RetryPolicy::fibonacci(Duration::from_millis(100)).with_max_attempts(6);

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(800));
    }

    #[test]
    fn test_fibonacci_index_clamps_to_last_term() {
        let policy = RetryPolicy::fibonacci(Duration::from_millis(1))
            .with_max_delay(Duration::from_secs(3600));

        // Attempts past the table reuse the last multiplier (144)
        assert_eq!(policy.delay_for_attempt(11), Duration::from_millis(144));
        assert_eq!(policy.delay_for_attempt(50), Duration::from_millis(144));
    }

    #[test]
    fn test_fibonacci_clamped_to_max_delay() {
        let policy = RetryPolicy::fibonacci(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(400));

        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(400));
    }

    #[test]
    fn test_custom_table() {
        let policy = RetryPolicy::custom(vec![
            Duration::from_millis(50),
            Duration::from_millis(250),
        ])
        .with_max_delay(Duration::from_millis(1000));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(50));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(250));
        // Exhausted table falls back to max_delay
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1000));
    }

    #[test]
    fn test_custom_table_entries_clamped() {
        let policy = RetryPolicy::custom(vec![Duration::from_secs(60)])
            .with_max_delay(Duration::from_secs(5));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(5));
    }

    #[test]
    fn test_max_attempts_minimum_is_one() {
        let policy = RetryPolicy::linear(Duration::from_millis(10)).with_max_attempts(0);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_policy_is_immutable_value() {
        let policy = RetryPolicy::exponential(Duration::from_millis(100))
            .with_max_attempts(4)
            .with_max_delay(Duration::from_secs(5));
        let cloned = policy.clone();

        assert_eq!(policy, cloned);
        assert_eq!(cloned.max_attempts(), 4);
        assert_eq!(cloned.base_delay(), Duration::from_millis(100));
        assert_eq!(cloned.max_delay(), Duration::from_secs(5));
        assert!(matches!(cloned.strategy(), BackoffStrategy::Exponential));
    }
}
