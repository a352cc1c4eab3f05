//! Registry sync - on-chain registry into the local cache
//!
//! A sync lists the registry, stamps every entry with the current time and
//! hands the whole snapshot to the store in one call. A read or write
//! failure surfaces to the caller and leaves the cache as it was.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::DiscoveryError;
use crate::registry::{OrchestratorRegistry, RegisteredOrchestrator};
use crate::storage::{OrchestratorRecord, RegistryStore};

/// Reconciles the registry cache with the registry
pub struct RegistrySync {
    registry: Arc<dyn OrchestratorRegistry>,
    store: Arc<RegistryStore>,
    prune: bool,
}

impl RegistrySync {
    pub fn new(registry: Arc<dyn OrchestratorRegistry>, store: Arc<RegistryStore>) -> Self {
        Self {
            registry,
            store,
            prune: false,
        }
    }

    /// Also delete cached orchestrators the registry no longer lists
    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    pub fn registry(&self) -> &Arc<dyn OrchestratorRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<RegistryStore> {
        &self.store
    }

    /// Pull the registry and write it to the cache.
    ///
    /// Returns the number of distinct orchestrators written. Safe to call
    /// repeatedly.
    pub async fn sync(&self) -> Result<usize, DiscoveryError> {
        let orchestrators = self
            .registry
            .list_registered_orchestrators()
            .await
            .map_err(DiscoveryError::RegistryReadFailure)?;

        let now = chrono::Utc::now().timestamp();
        let records: Vec<OrchestratorRecord> = orchestrators
            .into_iter()
            .map(|orch| to_record(orch, now))
            .collect();

        let written = self
            .store
            .replace_all(&records, self.prune)
            .map_err(DiscoveryError::CacheWriteFailure)?;

        info!(orchestrators = written, prune = self.prune, "Registry cache synced");
        Ok(written)
    }
}

fn to_record(orch: RegisteredOrchestrator, updated_at: i64) -> OrchestratorRecord {
    OrchestratorRecord {
        address: orch.address,
        service_uri: orch.service_uri,
        updated_at,
    }
}

/// Background task running a sync on a fixed interval
pub struct SyncLoop {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl SyncLoop {
    /// Start syncing now and then every `interval`.
    pub fn start(sync: Arc<RegistrySync>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        info!(interval_secs = interval.as_secs(), "Starting registry sync loop");
        let handle = tokio::spawn(run_sync_loop(sync, interval, shutdown_rx));

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stop the loop and wait for it to exit
    pub async fn stop(self) {
        info!("Stopping registry sync loop");
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.handle.await {
            error!(error = %e, "Registry sync loop panicked");
        }
    }
}

async fn run_sync_loop(
    sync: Arc<RegistrySync>,
    interval: Duration,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                match sync.sync().await {
                    Ok(count) => debug!(count, "Periodic sync complete"),
                    Err(e) => error!(error = %e, "Periodic sync failed, keeping previous cache"),
                }
            }
        }
    }
}
