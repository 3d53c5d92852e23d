//! Error types for the resilience toolkit
//!
//! Provides unified error handling using thiserror, plus the error
//! classification used by the retry executor and policy dispatcher.

use thiserror::Error;

// == Backstop Error Enum ==
/// Unified error type for the resilience toolkit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackstopError {
    /// Connection-level failure reaching the upstream
    #[error("Network failure: {0}")]
    Network(String),

    /// The upstream answered but reported an API-level failure
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Input rejected before any call was made
    #[error("Validation failure: {0}")]
    Validation(String),

    /// Missing or invalid credentials
    #[error("Authentication failure: {0}")]
    Auth(String),

    /// Authenticated but not allowed
    #[error("Permission denied: {0}")]
    Permission(String),

    /// The upstream throttled the caller
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Failure carrying an HTTP-like status code
    #[error("Status {status}: {message}")]
    Status { status: u16, message: String },

    /// The circuit breaker refused the call without invoking the operation
    #[error("Circuit open: {0}")]
    CircuitOpen(String),

    /// Operation attempted on a destroyed store
    #[error("Store destroyed: {0}")]
    Destroyed(String),

    /// The caller cancelled the in-flight operation
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key has expired
    #[error("Key expired: {0}")]
    Expired(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Failure that fits no other category
    #[error("Unclassified failure: {0}")]
    Unclassified(String),
}

// == Error Category Enum ==
/// Coarse category labels used as policy-registry keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Network,
    Upstream,
    Validation,
    Auth,
    Permission,
    RateLimited,
    CircuitOpen,
    Lifecycle,
    Cancelled,
    Unclassified,
}

impl BackstopError {
    // == Category ==
    /// Maps the error onto its dispatch category.
    ///
    /// Cache-surface variants fold into the closest category:
    /// `InvalidRequest` is a validation failure, `Destroyed` a lifecycle
    /// failure, and `NotFound`/`Expired` are unclassified (they are cache
    /// misses, not upstream outcomes).
    pub fn category(&self) -> ErrorCategory {
        match self {
            BackstopError::Network(_) => ErrorCategory::Network,
            BackstopError::Upstream(_) => ErrorCategory::Upstream,
            BackstopError::Validation(_) => ErrorCategory::Validation,
            BackstopError::Auth(_) => ErrorCategory::Auth,
            BackstopError::Permission(_) => ErrorCategory::Permission,
            BackstopError::RateLimited(_) => ErrorCategory::RateLimited,
            BackstopError::Status { status, .. } => match status {
                429 => ErrorCategory::RateLimited,
                400..=499 => ErrorCategory::Validation,
                _ => ErrorCategory::Upstream,
            },
            BackstopError::CircuitOpen(_) => ErrorCategory::CircuitOpen,
            BackstopError::Destroyed(_) => ErrorCategory::Lifecycle,
            BackstopError::Cancelled(_) => ErrorCategory::Cancelled,
            BackstopError::InvalidRequest(_) => ErrorCategory::Validation,
            BackstopError::NotFound(_)
            | BackstopError::Expired(_)
            | BackstopError::Unclassified(_) => ErrorCategory::Unclassified,
        }
    }

    // == Is Retryable ==
    /// Decides whether the retry executor may attempt the operation again.
    ///
    /// Validation, authentication, permission, lifecycle and cancellation
    /// failures never retry. A status in [400, 500) never retries except
    /// 429. Everything else (network, upstream, rate limits, open circuits,
    /// 5xx, unclassified) retries per policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackstopError::Validation(_)
            | BackstopError::Auth(_)
            | BackstopError::Permission(_)
            | BackstopError::InvalidRequest(_)
            | BackstopError::Destroyed(_)
            | BackstopError::Cancelled(_) => false,
            BackstopError::Status { status, .. } => {
                !(400..500).contains(status) || *status == 429
            }
            _ => true,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the resilience toolkit.
pub type Result<T> = std::result::Result<T, BackstopError>;
