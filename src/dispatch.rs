//! Policy Dispatch Module
//!
//! Maps error categories to named retry policies and runs operations under
//! the selected policy, optionally guarded by a shared circuit breaker.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::error::{ErrorCategory, Result};
use crate::retry::{RetryExecutor, RetryPolicy};

// == Policy Registry ==
/// Registry of retry policies keyed by error category.
///
/// Re-registering a category overwrites its policy (last write wins).
/// Lookups for unmapped categories fall back to the network default.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    policies: HashMap<ErrorCategory, RetryPolicy>,
    fallback: RetryPolicy,
}

impl PolicyRegistry {
    // == Constructor ==
    /// Creates a registry seeded with the default policies.
    ///
    /// Defaults: network failures back off exponentially from 1s (3
    /// attempts, 10s cap); upstream failures from 2s (3 attempts, 30s
    /// cap); rate limits wait linearly from 5s (4 attempts, 60s cap).
    pub fn with_defaults() -> Self {
        let fallback = Self::network_default();
        let mut policies = HashMap::new();

        policies.insert(ErrorCategory::Network, Self::network_default());
        policies.insert(
            ErrorCategory::Upstream,
            RetryPolicy::exponential(Duration::from_secs(2))
                .with_max_attempts(3)
                .with_max_delay(Duration::from_secs(30)),
        );
        policies.insert(
            ErrorCategory::RateLimited,
            RetryPolicy::linear(Duration::from_secs(5))
                .with_max_attempts(4)
                .with_max_delay(Duration::from_secs(60)),
        );

        Self { policies, fallback }
    }

    /// The default policy for network failures, also the lookup fallback.
    pub fn network_default() -> RetryPolicy {
        RetryPolicy::exponential(Duration::from_secs(1))
            .with_max_attempts(3)
            .with_max_delay(Duration::from_secs(10))
    }

    // == Register ==
    /// Maps a category to a policy, overwriting any existing mapping.
    pub fn register(&mut self, category: ErrorCategory, policy: RetryPolicy) {
        self.policies.insert(category, policy);
    }

    // == Lookup ==
    /// Returns the policy for a category, falling back to the network
    /// default when the category is unmapped.
    pub fn lookup(&self, category: ErrorCategory) -> &RetryPolicy {
        self.policies
            .get(&category)
            .or_else(|| self.policies.get(&ErrorCategory::Network))
            .unwrap_or(&self.fallback)
    }

    /// Number of registered mappings.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns true when no mappings are registered.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// == Policy Dispatcher ==
/// Selects a retry policy per error category and runs operations under it.
///
/// A breaker configured via [`PolicyDispatcher::with_breaker`] guards
/// every dispatched operation inside the retry loop: the executor retries
/// around the breaker, so open-circuit fast-fails ride the backoff until
/// the reset timeout elapses.
#[derive(Debug, Clone)]
pub struct PolicyDispatcher {
    registry: PolicyRegistry,
    breaker: Option<CircuitBreaker>,
}

impl PolicyDispatcher {
    // == Constructor ==
    /// Creates a dispatcher with the default policy registry.
    pub fn new() -> Self {
        Self {
            registry: PolicyRegistry::with_defaults(),
            breaker: None,
        }
    }

    /// Guards dispatched operations with a circuit breaker.
    pub fn with_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker = Some(CircuitBreaker::new(config));
        self
    }

    /// The shared breaker, when one is configured.
    pub fn breaker(&self) -> Option<&CircuitBreaker> {
        self.breaker.as_ref()
    }

    /// The registry backing this dispatcher.
    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    // == Register Policy ==
    /// Maps a category to a policy, overwriting any existing mapping.
    pub fn register_policy(&mut self, category: ErrorCategory, policy: RetryPolicy) {
        self.registry.register(category, policy);
    }

    // == Execute ==
    /// Runs `operation` under the policy registered for `category`.
    ///
    /// Unmapped categories use the network default. When a breaker is
    /// configured, each attempt passes through it.
    ///
    /// # Arguments
    /// * `category` - The error category the caller expects from this upstream
    /// * `context` - Label describing the operation, used in logs
    /// * `operation` - The operation to run; invoked once per attempt
    pub async fn execute<T, F, Fut>(
        &self,
        category: ErrorCategory,
        context: &str,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let policy = self.registry.lookup(category).clone();
        debug!(
            "{}: dispatching under {:?} policy ({} attempts)",
            context,
            category,
            policy.max_attempts()
        );
        let executor = RetryExecutor::new(policy);

        match &self.breaker {
            Some(breaker) => {
                executor
                    .execute(context, || {
                        let breaker = breaker.clone();
                        let context = context.to_string();
                        let fut = operation();
                        async move { breaker.call(&context, move || fut).await }
                    })
                    .await
            }
            None => executor.execute(context, operation).await,
        }
    }
}

impl Default for PolicyDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
