//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and tag support.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last successful read timestamp (Unix milliseconds)
    pub last_accessed_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Tags for bulk invalidation (may be empty)
    pub tags: HashSet<String>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with the given TTL.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl_seconds` - TTL in seconds
    pub fn new(value: String, ttl_seconds: u64) -> Self {
        Self::with_tags(value, ttl_seconds, HashSet::new())
    }

    /// Creates a new cache entry carrying a tag set.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl_seconds` - TTL in seconds
    /// * `tags` - Tags for bulk invalidation
    pub fn with_tags(value: String, ttl_seconds: u64, tags: HashSet<String>) -> Self {
        let now = current_timestamp_ms();

        Self {
            value,
            created_at: now,
            last_accessed_at: now,
            expires_at: now + ttl_seconds * 1000,
            tags,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is live while the elapsed time since
    /// creation is less than or equal to the TTL, so an entry read at the
    /// exact expiration instant is still live.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() > self.expires_at
    }

    // == Touch ==
    /// Records a successful read by updating the last access timestamp.
    pub fn touch(&mut self) {
        self.last_accessed_at = current_timestamp_ms();
    }

    // == Has Tag ==
    /// Checks whether the entry carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds.
    ///
    /// # Returns
    /// - `0` if the entry has expired (TTL elapsed)
    /// - remaining milliseconds otherwise
    pub fn ttl_remaining_ms(&self) -> u64 {
        let now = current_timestamp_ms();
        self.expires_at.saturating_sub(now)
    }

    /// Returns remaining TTL in seconds.
    pub fn ttl_remaining(&self) -> u64 {
        self.ttl_remaining_ms() / 1000
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("test_value".to_string(), 60);

        assert_eq!(entry.value, "test_value");
        assert_eq!(entry.created_at, entry.last_accessed_at);
        assert!(!entry.is_expired());
        assert!(entry.tags.is_empty());
    }

    #[test]
    fn test_entry_creation_with_tags() {
        let tags: HashSet<String> = ["users".to_string(), "profiles".to_string()]
            .into_iter()
            .collect();
        let entry = CacheEntry::with_tags("test_value".to_string(), 60, tags);

        assert!(entry.has_tag("users"));
        assert!(entry.has_tag("profiles"));
        assert!(!entry.has_tag("sessions"));
    }

    #[test]
    fn test_entry_expiration() {
        // Create entry with 1 second TTL
        let entry = CacheEntry::new("test_value".to_string(), 1);

        assert!(!entry.is_expired());

        // Wait for expiration
        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_entry_touch_updates_access_time() {
        let mut entry = CacheEntry::new("test_value".to_string(), 60);
        let initial_access = entry.last_accessed_at;

        sleep(Duration::from_millis(10));
        entry.touch();

        assert!(entry.last_accessed_at > initial_access);
        // Creation time is untouched
        assert!(entry.created_at <= entry.last_accessed_at);
    }

    #[test]
    fn test_ttl_remaining_seconds() {
        let entry = CacheEntry::new("test_value".to_string(), 10);

        let remaining = entry.ttl_remaining();
        assert!(remaining <= 10);
        assert!(remaining >= 9);
    }

    #[test]
    fn test_ttl_remaining_ms() {
        let entry = CacheEntry::new("test_value".to_string(), 10);

        let remaining_ms = entry.ttl_remaining_ms();
        assert!(remaining_ms <= 10_000);
        assert!(remaining_ms >= 9_000);
    }

    #[test]
    fn test_ttl_remaining_expired() {
        // Create entry with very short TTL
        let entry = CacheEntry::new("test_value".to_string(), 1);

        // Wait for expiration
        sleep(Duration::from_millis(1100));

        // TTL remaining should be 0 when expired
        assert_eq!(entry.ttl_remaining(), 0);
        assert_eq!(entry.ttl_remaining_ms(), 0);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        // Construct entries straddling a known expiration instant
        let now = current_timestamp_ms();
        let at_boundary = CacheEntry {
            value: "test".to_string(),
            created_at: now,
            last_accessed_at: now,
            expires_at: now + 60_000,
            tags: HashSet::new(),
        };
        let past_boundary = CacheEntry {
            value: "test".to_string(),
            created_at: now - 60_001,
            last_accessed_at: now - 60_001,
            expires_at: now - 1,
            tags: HashSet::new(),
        };

        assert!(!at_boundary.is_expired(), "Entry within TTL should be live");
        assert!(
            past_boundary.is_expired(),
            "Entry past its expiration instant should be expired"
        );
    }
}
