//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking, TTL
//! expiration, tag-based invalidation, and an optional persistent tier.

use std::collections::{HashMap, HashSet};

use crate::cache::persist::{cache_key, persist_key, KeyValueStore, PersistedEntry};
use crate::cache::{CacheEntry, CacheStats, LruTracker, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::error::{BackstopError, Result};

// == Cache Store ==
/// Main cache storage with LRU eviction, TTL support, and tag invalidation.
///
/// An optional [`KeyValueStore`] collaborator turns the store into a hybrid
/// tier: entries are mirrored on write and consulted on read when the
/// in-memory copy is absent, with the same TTL check applied to the
/// timestamps stored alongside the serialized value.
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed (None = unbounded)
    max_entries: Option<usize>,
    /// Default TTL in seconds for entries without explicit TTL
    default_ttl: u64,
    /// Set once by destroy(); every later operation fails
    destroyed: bool,
    /// Optional persistent collaborator for the hybrid tier
    persistent: Option<Box<dyn KeyValueStore + Send + Sync>>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .field("default_ttl", &self.default_ttl)
            .field("destroyed", &self.destroyed)
            .field("persistent", &self.persistent.is_some())
            .finish()
    }
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries, or None for unbounded
    /// * `default_ttl` - Default TTL in seconds for entries without explicit TTL
    pub fn new(max_entries: Option<usize>, default_ttl: u64) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries,
            default_ttl,
            destroyed: false,
            persistent: None,
        }
    }

    /// Attaches a persistent key-value collaborator, enabling the hybrid tier.
    pub fn with_persistent(mut self, store: Box<dyn KeyValueStore + Send + Sync>) -> Self {
        self.persistent = Some(store);
        self
    }

    // == Lifecycle Guard ==
    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed {
            Err(BackstopError::Destroyed(
                "cache store has been destroyed".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    // == Set ==
    /// Stores a key-value pair with optional TTL.
    ///
    /// If the key already exists, the value is overwritten and TTL is reset.
    /// If the cache is at capacity, expired entries are purged first and the
    /// least recently used entry is evicted if the bound is still exceeded.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL in seconds (uses default_ttl if None)
    pub fn set(&mut self, key: String, value: String, ttl: Option<u64>) -> Result<()> {
        self.set_with_tags(key, value, Vec::new(), ttl)
    }

    // == Set With Tags ==
    /// Stores a key-value pair carrying tags for bulk invalidation.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `tags` - Tags this entry belongs to (may be empty)
    /// * `ttl` - Optional TTL in seconds (uses default_ttl if None)
    pub fn set_with_tags(
        &mut self,
        key: String,
        value: String,
        tags: Vec<String>,
        ttl: Option<u64>,
    ) -> Result<()> {
        self.ensure_alive()?;

        // Validate key length
        if key.len() > MAX_KEY_LENGTH {
            return Err(BackstopError::InvalidRequest(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        // Validate value size
        if value.len() > MAX_VALUE_SIZE {
            return Err(BackstopError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        let effective_ttl = ttl.unwrap_or(self.default_ttl);
        let entry = CacheEntry::with_tags(value, effective_ttl, tags.into_iter().collect());

        self.insert_entry(key, entry, true);
        Ok(())
    }

    /// Inserts an entry, enforcing the capacity bound first.
    ///
    /// Expired entries are purged before a live entry is evicted. Mirroring
    /// is skipped for promotions from the persistent tier, which already
    /// hold their envelope there.
    fn insert_entry(&mut self, key: String, entry: CacheEntry, mirror: bool) {
        let is_overwrite = self.entries.contains_key(&key);

        if let Some(max) = self.max_entries {
            if !is_overwrite && self.entries.len() >= max {
                self.purge_expired_memory();
            }
            // Evict the least recently used entry while still over the bound.
            // The mirror copy stays: the persistent tier is the second chance
            // for capacity-evicted entries.
            while !is_overwrite && !self.entries.is_empty() && self.entries.len() >= max {
                if let Some(evicted) = self.lru.evict_oldest() {
                    self.entries.remove(&evicted);
                    self.stats.record_eviction();
                } else {
                    break;
                }
            }
        }

        if mirror {
            self.mirror_set(&key, &entry);
        }
        self.entries.insert(key.clone(), entry);
        self.lru.touch(&key);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns the value if found and not expired; a live hit refreshes the
    /// entry's access time. Expired entries are removed as a side effect of
    /// the read. When the in-memory entry is absent, the persistent tier is
    /// consulted and a live envelope is promoted back into memory.
    ///
    /// # Arguments
    /// * `key` - The key to retrieve
    pub fn get(&mut self, key: &str) -> Result<String> {
        self.ensure_alive()?;

        if let Some(entry) = self.entries.get_mut(key) {
            if entry.is_expired() {
                // Remove expired entry everywhere
                self.entries.remove(key);
                self.lru.remove(key);
                self.mirror_remove(key);
                self.stats.set_total_entries(self.entries.len());
                self.stats.record_expirations(1);
                self.stats.record_miss();
                return Err(BackstopError::Expired(key.to_string()));
            }

            // Entry exists and is valid - refresh access time, record hit
            entry.touch();
            let value = entry.value.clone();
            self.stats.record_hit();
            self.lru.touch(key);
            return Ok(value);
        }

        self.promote_from_persistent(key)
    }

    /// Consults the persistent tier for a key absent from memory.
    fn promote_from_persistent(&mut self, key: &str) -> Result<String> {
        let raw = self
            .persistent
            .as_ref()
            .and_then(|p| p.get_item(&persist_key(key)));

        let Some(raw) = raw else {
            self.stats.record_miss();
            return Err(BackstopError::NotFound(key.to_string()));
        };

        match PersistedEntry::decode(&raw) {
            Some(env) if env.is_expired() => {
                self.mirror_remove(key);
                self.stats.record_expirations(1);
                self.stats.record_miss();
                Err(BackstopError::Expired(key.to_string()))
            }
            Some(env) => {
                let entry = env.into_entry();
                let value = entry.value.clone();
                self.insert_entry(key.to_string(), entry, false);
                self.stats.record_hit();
                Ok(value)
            }
            None => {
                // Undecodable payloads are treated as absent and dropped
                self.mirror_remove(key);
                self.stats.record_miss();
                Err(BackstopError::NotFound(key.to_string()))
            }
        }
    }

    // == Delete ==
    /// Removes an entry by key from memory and the persistent tier.
    ///
    /// # Arguments
    /// * `key` - The key to delete
    pub fn delete(&mut self, key: &str) -> Result<()> {
        self.ensure_alive()?;

        let in_memory = self.entries.remove(key).is_some();
        let mirrored = self.mirror_get(key).is_some();
        if in_memory {
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
        }
        if mirrored {
            self.mirror_remove(key);
        }

        if in_memory || mirrored {
            Ok(())
        } else {
            Err(BackstopError::NotFound(key.to_string()))
        }
    }

    // == Clear ==
    /// Removes every entry from memory and the persistent tier.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_alive()?;

        self.entries.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);

        if let Some(persistent) = self.persistent.as_mut() {
            for key in persistent.list_keys() {
                if cache_key(&key).is_some() {
                    persistent.remove_item(&key);
                }
            }
        }
        Ok(())
    }

    // == Keys ==
    /// Returns a snapshot of the in-memory keys (order unspecified).
    pub fn keys(&self) -> Result<Vec<String>> {
        self.ensure_alive()?;
        Ok(self.entries.keys().cloned().collect())
    }

    // == Invalidate By Tag ==
    /// Removes every entry (live or expired) carrying the given tag.
    ///
    /// Both memory and the persistent tier are scanned, so entries that
    /// survive only as mirror copies are invalidated too. Returns the number
    /// of distinct keys removed.
    pub fn invalidate_by_tag(&mut self, tag: &str) -> Result<usize> {
        self.ensure_alive()?;

        let tagged: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.has_tag(tag))
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed: HashSet<String> = HashSet::new();
        for key in tagged {
            self.entries.remove(&key);
            self.lru.remove(&key);
            self.mirror_remove(&key);
            removed.insert(key);
        }
        self.stats.set_total_entries(self.entries.len());

        // Mirror-only entries carrying the tag
        if let Some(persistent) = self.persistent.as_mut() {
            let candidates: Vec<String> = persistent
                .list_keys()
                .into_iter()
                .filter(|k| {
                    cache_key(k).map_or(false, |cached| !removed.contains(cached))
                })
                .collect();

            for store_key in candidates {
                let tagged = persistent
                    .get_item(&store_key)
                    .and_then(|raw| PersistedEntry::decode(&raw))
                    .map_or(false, |env| env.tags.contains(tag));
                if tagged {
                    persistent.remove_item(&store_key);
                    if let Some(cached) = cache_key(&store_key) {
                        removed.insert(cached.to_string());
                    }
                }
            }
        }

        Ok(removed.len())
    }

    // == Sweep ==
    /// Removes all expired entries from memory and the persistent tier.
    ///
    /// Safe to call on demand; the background task drives it periodically.
    /// Returns the number of entries removed.
    pub fn sweep(&mut self) -> Result<usize> {
        self.ensure_alive()?;

        let mut count = self.purge_expired_memory();

        // Expired mirror-only envelopes
        if let Some(persistent) = self.persistent.as_mut() {
            let candidates: Vec<String> = persistent
                .list_keys()
                .into_iter()
                .filter(|k| cache_key(k).is_some())
                .collect();

            for store_key in candidates {
                let expired = persistent
                    .get_item(&store_key)
                    .and_then(|raw| PersistedEntry::decode(&raw))
                    .map_or(true, |env| env.is_expired());
                let in_memory = cache_key(&store_key)
                    .map_or(false, |cached| self.entries.contains_key(cached));
                if expired && !in_memory {
                    persistent.remove_item(&store_key);
                    count += 1;
                }
            }
        }

        self.stats.record_expirations(count as u64);
        Ok(count)
    }

    /// Drops expired in-memory entries and their mirror copies.
    fn purge_expired_memory(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();

        for key in expired_keys {
            self.entries.remove(&key);
            self.lru.remove(&key);
            self.mirror_remove(&key);
        }

        self.stats.set_total_entries(self.entries.len());
        count
    }

    // == Destroy ==
    /// Discards all entries and marks the store destroyed.
    ///
    /// Idempotent. Every subsequent operation fails with a lifecycle error.
    /// The persistent collaborator is left untouched; it outlives the store.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.entries.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);
        self.destroyed = true;
    }

    /// Returns true once the store has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of in-memory entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Mirror Helpers ==
    fn mirror_set(&mut self, key: &str, entry: &CacheEntry) {
        if let Some(persistent) = self.persistent.as_mut() {
            let envelope = PersistedEntry::from_entry(entry);
            persistent.set_item(&persist_key(key), envelope.encode());
        }
    }

    fn mirror_remove(&mut self, key: &str) {
        if let Some(persistent) = self.persistent.as_mut() {
            persistent.remove_item(&persist_key(key));
        }
    }

    fn mirror_get(&self, key: &str) -> Option<PersistedEntry> {
        self.persistent
            .as_ref()
            .and_then(|p| p.get_item(&persist_key(key)))
            .and_then(|raw| PersistedEntry::decode(&raw))
    }
}
