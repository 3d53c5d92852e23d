//! Cache Handle Module
//!
//! Async facade over the cache engine: owns the shared store, runs the
//! background sweep for the lifetime of the cache, and provides the
//! read-through `get_with_fallback` operation.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{CacheStats, CacheStore};
use crate::config::Config;
use crate::error::{BackstopError, Result};
use crate::tasks::spawn_sweep_task;

// == Cache ==
/// Shared, TTL-swept cache with an explicit lifecycle.
///
/// Construction spawns the periodic sweep task; [`Cache::destroy`] cancels
/// it and discards all entries. Access to the engine is serialized through
/// a read-write lock, so sequential operations by one caller observe a
/// consistent view.
#[derive(Debug)]
pub struct Cache {
    /// Thread-safe cache store
    store: Arc<RwLock<CacheStore>>,
    /// Background sweep task, aborted on destroy
    sweep_handle: JoinHandle<()>,
}

impl Cache {
    // == Constructors ==
    /// Creates a cache with the given capacity, default TTL, and sweep interval.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries, or None for unbounded
    /// * `default_ttl` - Default TTL in seconds
    /// * `sweep_interval` - Seconds between background sweep runs
    pub fn new(max_entries: Option<usize>, default_ttl: u64, sweep_interval: u64) -> Self {
        Self::with_store(CacheStore::new(max_entries, default_ttl), sweep_interval)
    }

    /// Wraps an already-configured engine (e.g. one with a persistent tier).
    pub fn with_store(store: CacheStore, sweep_interval: u64) -> Self {
        let store = Arc::new(RwLock::new(store));
        let sweep_handle = spawn_sweep_task(store.clone(), sweep_interval);

        Self {
            store,
            sweep_handle,
        }
    }

    /// Creates a cache from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_entries, config.default_ttl, config.sweep_interval)
    }

    // == Get ==
    /// Retrieves a value by key. See [`CacheStore::get`].
    pub async fn get(&self, key: &str) -> Result<String> {
        self.store.write().await.get(key)
    }

    // == Set ==
    /// Stores a key-value pair with optional TTL. See [`CacheStore::set`].
    pub async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<()> {
        self.store
            .write()
            .await
            .set(key.to_string(), value.to_string(), ttl)
    }

    // == Set With Tags ==
    /// Stores a key-value pair carrying tags for bulk invalidation.
    pub async fn set_with_tags(
        &self,
        key: &str,
        value: &str,
        tags: Vec<String>,
        ttl: Option<u64>,
    ) -> Result<()> {
        self.store
            .write()
            .await
            .set_with_tags(key.to_string(), value.to_string(), tags, ttl)
    }

    // == Get With Fallback ==
    /// Returns the cached value if live; otherwise awaits `loader`, caches
    /// its result, and returns it. Loader failures propagate and cache
    /// nothing.
    ///
    /// The loader runs without the store lock held. Concurrent calls for
    /// the same absent key each invoke their own loader; loads are not
    /// coalesced, and the last writer wins.
    pub async fn get_with_fallback<F, Fut>(
        &self,
        key: &str,
        loader: F,
        ttl: Option<u64>,
    ) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        {
            let mut store = self.store.write().await;
            match store.get(key) {
                Ok(value) => return Ok(value),
                Err(BackstopError::NotFound(_)) | Err(BackstopError::Expired(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let value = loader().await?;

        let mut store = self.store.write().await;
        store.set(key.to_string(), value.clone(), ttl)?;
        Ok(value)
    }

    // == Delete ==
    /// Removes an entry by key. See [`CacheStore::delete`].
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.store.write().await.delete(key)
    }

    // == Clear ==
    /// Removes every entry. See [`CacheStore::clear`].
    pub async fn clear(&self) -> Result<()> {
        self.store.write().await.clear()
    }

    // == Keys ==
    /// Returns a snapshot of the in-memory keys (order unspecified).
    pub async fn keys(&self) -> Result<Vec<String>> {
        self.store.read().await.keys()
    }

    // == Invalidate By Tag ==
    /// Removes every entry carrying the given tag; returns the count removed.
    pub async fn invalidate_by_tag(&self, tag: &str) -> Result<usize> {
        self.store.write().await.invalidate_by_tag(tag)
    }

    // == Sweep ==
    /// Runs an on-demand sweep of expired entries.
    pub async fn sweep(&self) -> Result<usize> {
        self.store.write().await.sweep()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    // == Length ==
    /// Returns the current number of in-memory entries.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Returns true if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    // == Destroy ==
    /// Cancels the sweep task and discards all entries.
    ///
    /// Idempotent: aborting an already-finished task and destroying an
    /// already-destroyed store are both no-ops. Subsequent operations fail
    /// with a lifecycle error.
    pub async fn destroy(&self) {
        self.sweep_handle.abort();
        let mut store = self.store.write().await;
        if !store.is_destroyed() {
            info!("Destroying cache: sweep cancelled, entries discarded");
        }
        store.destroy();
    }
}
