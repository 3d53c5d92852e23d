//! TTL Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task sleeps for the specified interval between sweeps, acquiring a
/// write lock on the store for each run. It exits on its own once the store
/// reports a lifecycle error (the cache was destroyed); destroy also aborts
/// the returned handle, and aborting is idempotent.
///
/// # Arguments
/// * `store` - Shared reference to the cache store
/// * `sweep_interval_secs` - Interval in seconds between sweep runs
///
/// # Returns
/// A JoinHandle for the spawned task, aborted by `Cache::destroy`.
pub fn spawn_sweep_task(
    store: Arc<RwLock<CacheStore>>,
    sweep_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting TTL sweep task with interval of {} seconds",
            sweep_interval_secs
        );

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(interval).await;

            // Acquire write lock and sweep expired entries
            let swept = {
                let mut guard = store.write().await;
                guard.sweep()
            };

            match swept {
                Ok(0) => debug!("TTL sweep: no expired entries found"),
                Ok(removed) => info!("TTL sweep: removed {} expired entries", removed),
                Err(_) => {
                    debug!("TTL sweep: store destroyed, stopping");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let store = Arc::new(RwLock::new(CacheStore::new(Some(100), 300)));

        // Add an entry with very short TTL
        {
            let mut guard = store.write().await;
            guard
                .set("expire_soon".to_string(), "value".to_string(), Some(1))
                .unwrap();
        }

        // Spawn sweep task with 1 second interval
        let handle = spawn_sweep_task(store.clone(), 1);

        // Wait for entry to expire and a sweep to run
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // Verify entry was removed without a read triggering it
        {
            let guard = store.read().await;
            assert_eq!(guard.len(), 0, "Expired entry should have been swept");
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let store = Arc::new(RwLock::new(CacheStore::new(Some(100), 300)));

        // Add an entry with long TTL
        {
            let mut guard = store.write().await;
            guard
                .set("long_lived".to_string(), "value".to_string(), Some(3600))
                .unwrap();
        }

        let handle = spawn_sweep_task(store.clone(), 1);

        // Wait for a sweep to run
        tokio::time::sleep(Duration::from_millis(1500)).await;

        {
            let mut guard = store.write().await;
            let result = guard.get("long_lived");
            assert!(result.is_ok(), "Valid entry should not be removed");
            assert_eq!(result.unwrap(), "value");
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_stops_after_destroy() {
        let store = Arc::new(RwLock::new(CacheStore::new(Some(100), 300)));

        let handle = spawn_sweep_task(store.clone(), 1);

        {
            let mut guard = store.write().await;
            guard.destroy();
        }

        // The next sweep hits the lifecycle error and the task exits
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(handle.is_finished(), "Task should stop once the store is destroyed");
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let store = Arc::new(RwLock::new(CacheStore::new(Some(100), 300)));

        let handle = spawn_sweep_task(store, 1);

        // Abort immediately, twice (abort is idempotent)
        handle.abort();
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
