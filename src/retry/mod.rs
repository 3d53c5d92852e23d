//! Retry Module
//!
//! Provides retry policies with pluggable backoff strategies and an
//! executor that runs operations under them.
//!
//! Policies are pure data: they describe the backoff curve and the attempt
//! budget without executing anything, which keeps them easy to test, clone,
//! and register with the policy dispatcher.
//!
//! # Strategies
//! - Linear: delay grows by the base each attempt
//! - Exponential: delay doubles each attempt, with jitter
//! - Fibonacci: delay follows the Fibonacci sequence
//! - Custom: delay comes from an explicit table

mod executor;
mod policy;

pub use executor::RetryExecutor;
pub use policy::{BackoffStrategy, RetryPolicy};
