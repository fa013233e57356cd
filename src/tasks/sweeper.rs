//! Expiry Sweeper Task
//!
//! Background task that periodically drops expired items from a [`MemoryStore`].
//! Reads already ignore expired items; sweeping only reclaims their memory.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::MemoryStore;

/// Spawns a task purging expired items every `interval_secs` seconds.
///
/// The purge holds the store lock, so it runs on the blocking pool.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let store = MemoryStore::new(10_000);
/// let sweeper = spawn_sweeper(store.clone(), 1);
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_sweeper(store: MemoryStore, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!("Starting expiry sweeper with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let store = store.clone();
            match tokio::task::spawn_blocking(move || store.purge_expired()).await {
                Ok(Ok(0)) => debug!("Sweep: no expired items found"),
                Ok(Ok(removed)) => info!("Sweep: removed {} expired items", removed),
                Ok(Err(err)) => warn!("Sweep failed: {}", err),
                Err(err) => warn!("Sweep task panicked: {}", err),
            }
        }
    })
}
