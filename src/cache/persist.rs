//! Persistent Tier Module
//!
//! Defines the key-value collaborator interface used by the hybrid cache
//! tier, the serialized entry envelope mirrored into it, and an in-memory
//! implementation for tests.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;

/// Namespace prefix for mirrored cache entries.
pub const PERSIST_PREFIX: &str = "cache:";

// == Key-Value Store Trait ==
/// Abstract persistent key-value collaborator for the hybrid cache tier.
///
/// Implementations store opaque strings; the cache mirrors entries as JSON
/// envelopes carrying the original timestamps, so TTL checks survive a
/// round-trip through the collaborator.
pub trait KeyValueStore {
    /// Returns the stored string for a key, if present.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Stores a string under a key, replacing any previous value.
    fn set_item(&mut self, key: &str, value: String);

    /// Removes a key. Removing an absent key is a no-op.
    fn remove_item(&mut self, key: &str);

    /// Returns a snapshot of every stored key.
    fn list_keys(&self) -> Vec<String>;
}

// == Persisted Entry Envelope ==
/// Serialized form of a cache entry mirrored into the collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedEntry {
    /// The stored value
    pub value: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Tags for bulk invalidation
    #[serde(default)]
    pub tags: HashSet<String>,
}

impl PersistedEntry {
    /// Builds the envelope for a cache entry.
    pub fn from_entry(entry: &CacheEntry) -> Self {
        Self {
            value: entry.value.clone(),
            created_at: entry.created_at,
            expires_at: entry.expires_at,
            tags: entry.tags.clone(),
        }
    }

    /// Reconstructs a cache entry, keeping the original expiry.
    ///
    /// The promoted entry counts as freshly accessed.
    pub fn into_entry(self) -> CacheEntry {
        let now = super::entry::current_timestamp_ms();
        CacheEntry {
            value: self.value,
            created_at: self.created_at,
            last_accessed_at: now,
            expires_at: self.expires_at,
            tags: self.tags,
        }
    }

    /// Checks expiry against the stored timestamps.
    pub fn is_expired(&self) -> bool {
        super::entry::current_timestamp_ms() > self.expires_at
    }

    /// Serializes the envelope to its stored string form.
    pub fn encode(&self) -> String {
        // A struct of strings and integers cannot fail to serialize
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parses a stored string; undecodable payloads yield None.
    pub fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

// == Key Namespace Helpers ==
/// Maps a cache key to its collaborator key.
pub fn persist_key(key: &str) -> String {
    format!("{}{}", PERSIST_PREFIX, key)
}

/// Recovers the cache key from a collaborator key, if it is one of ours.
pub fn cache_key(persist_key: &str) -> Option<&str> {
    persist_key.strip_prefix(PERSIST_PREFIX)
}

// == In-Memory Implementation ==
/// HashMap-backed collaborator used by tests and examples.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    items: HashMap<String, String>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.items.insert(key.to_string(), value);
    }

    fn remove_item(&mut self, key: &str) {
        self.items.remove(key);
    }

    fn list_keys(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }
}
