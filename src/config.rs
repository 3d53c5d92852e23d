//! Configuration Module
//!
//! Handles loading and managing toolkit configuration from environment variables.

use std::env;

/// Resilience toolkit configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold (None = unbounded)
    pub max_entries: Option<usize>,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Background sweep task interval in seconds
    pub sweep_interval: u64,
    /// Consecutive failures before the circuit breaker opens
    pub failure_threshold: u32,
    /// Milliseconds the breaker stays open before allowing a trial call
    pub reset_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 1)
    /// - `FAILURE_THRESHOLD` - Breaker failure threshold (default: 5)
    /// - `RESET_TIMEOUT_MS` - Breaker reset timeout in ms (default: 30000)
    pub fn from_env() -> Self {
        Self {
            max_entries: Some(
                env::var("MAX_ENTRIES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1000),
            ),
            default_ttl: env::var("DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            sweep_interval: env::var("SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            failure_threshold: env::var("FAILURE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            reset_timeout_ms: env::var("RESET_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30_000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: Some(1000),
            default_ttl: 300,
            sweep_interval: 1,
            failure_threshold: 5,
            reset_timeout_ms: 30_000,
        }
    }
}
