//! Orchestrator discovery and selection
//!
//! Handles:
//! - Candidate ordering (selection strategies)
//! - Concurrent probing with early return (pools)
//! - Keeping the registry cache current (sync)
//!
//! [`Discovery`] ties these to the node's store, registry and probe client
//! and exposes the three ways a broadcaster builds a pool.

pub mod cached;
pub mod pool;
pub mod selection;
pub mod sync;

pub use cached::CachedOrchestratorPool;
pub use pool::{OrchestratorPool, DEFAULT_PROBE_TIMEOUT};
pub use selection::{RandomSelection, SeededSelection, SeededStream, SelectionStrategy};
pub use sync::{RegistrySync, SyncLoop};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::net::{OrchestratorInfo, ProbeClient};
use crate::registry::RegistryError;
use crate::storage::StoreError;

/// Call-level discovery errors. Individual probe failures never end up here.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Registry read failed: {0}")]
    RegistryReadFailure(#[source] RegistryError),

    #[error("Cache write failed: {0}")]
    CacheWriteFailure(#[source] StoreError),

    #[error("Cache read failed: {0}")]
    CacheReadFailure(#[source] StoreError),
}

/// Anything a broadcaster can select orchestrators from
#[async_trait]
pub trait OrchestratorSource: Send + Sync {
    /// Number of candidates
    fn size(&self) -> usize;

    /// Up to `count` responsive orchestrators, fastest first
    async fn get_orchestrators(&self, count: usize)
        -> Result<Vec<OrchestratorInfo>, DiscoveryError>;
}

#[async_trait]
impl OrchestratorSource for OrchestratorPool {
    fn size(&self) -> usize {
        OrchestratorPool::size(self)
    }

    async fn get_orchestrators(
        &self,
        count: usize,
    ) -> Result<Vec<OrchestratorInfo>, DiscoveryError> {
        OrchestratorPool::get_orchestrators(self, count).await
    }
}

#[async_trait]
impl OrchestratorSource for CachedOrchestratorPool {
    fn size(&self) -> usize {
        CachedOrchestratorPool::size(self)
    }

    async fn get_orchestrators(
        &self,
        count: usize,
    ) -> Result<Vec<OrchestratorInfo>, DiscoveryError> {
        CachedOrchestratorPool::get_orchestrators(self, count).await
    }
}

/// Broadcaster-side discovery wiring
pub struct Discovery {
    sync: Arc<RegistrySync>,
    probe: Arc<dyn ProbeClient>,
    strategy: Arc<dyn SelectionStrategy>,
    probe_timeout: Duration,
}

impl Discovery {
    pub fn new(sync: Arc<RegistrySync>, probe: Arc<dyn ProbeClient>) -> Self {
        Self {
            sync,
            probe,
            strategy: Arc::new(RandomSelection),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Replace the default random ordering
    pub fn with_strategy(mut self, strategy: Arc<dyn SelectionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn registry_sync(&self) -> &Arc<RegistrySync> {
        &self.sync
    }

    /// Pool over an explicit address list
    pub fn static_pool<S: AsRef<str>>(&self, addresses: &[S]) -> OrchestratorPool {
        OrchestratorPool::new(addresses, self.probe.clone(), self.strategy.as_ref())
            .with_probe_timeout(self.probe_timeout)
    }

    /// Pool over the registry cache
    pub async fn cached_pool(&self) -> Result<CachedOrchestratorPool, DiscoveryError> {
        let pool =
            CachedOrchestratorPool::new(&self.sync, self.probe.clone(), self.strategy.as_ref())
                .await?;
        Ok(pool.with_probe_timeout(self.probe_timeout))
    }

    /// Pool over a fresh registry read, bypassing the cache
    pub async fn onchain_pool(&self) -> Result<OrchestratorPool, DiscoveryError> {
        let orchestrators = self
            .sync
            .registry()
            .list_registered_orchestrators()
            .await
            .map_err(DiscoveryError::RegistryReadFailure)?;

        info!(count = orchestrators.len(), "Building pool from registry read");

        let addresses: Vec<&str> = orchestrators
            .iter()
            .map(|o| o.service_uri.as_str())
            .collect();
        Ok(self.static_pool(&addresses))
    }

    /// Run one registry sync
    pub async fn sync(&self) -> Result<usize, DiscoveryError> {
        self.sync.sync().await
    }
}
