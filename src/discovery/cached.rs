//! Pool over the cached registry snapshot

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use super::pool::OrchestratorPool;
use super::selection::SelectionStrategy;
use super::sync::RegistrySync;
use super::DiscoveryError;
use crate::net::{OrchestratorInfo, ProbeClient};
use crate::storage::OrchestratorRecord;

/// Orchestrator pool whose candidates come from the registry cache.
///
/// The candidate list is read once at construction. Build a new one to see
/// a later sync.
pub struct CachedOrchestratorPool {
    pool: OrchestratorPool,
}

impl CachedOrchestratorPool {
    /// Build from the current cache contents.
    ///
    /// An empty cache triggers one sync first. If that sync fails the pool
    /// is built from the (empty) snapshot and the failure is only logged.
    pub async fn new(
        sync: &RegistrySync,
        probe: Arc<dyn ProbeClient>,
        strategy: &dyn SelectionStrategy,
    ) -> Result<Self, DiscoveryError> {
        let store = sync.store();
        let mut records = store.select_all().map_err(DiscoveryError::CacheReadFailure)?;

        if records.is_empty() {
            debug!("Registry cache empty, syncing before building pool");
            match sync.sync().await {
                Ok(_) => {
                    records = store.select_all().map_err(DiscoveryError::CacheReadFailure)?;
                }
                Err(e) => warn!(error = %e, "On-demand registry sync failed"),
            }
        }

        Ok(Self::from_records(&records, probe, strategy))
    }

    /// Build from an already read snapshot
    pub fn from_records(
        records: &[OrchestratorRecord],
        probe: Arc<dyn ProbeClient>,
        strategy: &dyn SelectionStrategy,
    ) -> Self {
        let addresses: Vec<&str> = records.iter().map(|r| r.service_uri.as_str()).collect();
        Self {
            pool: OrchestratorPool::new(&addresses, probe, strategy),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.pool = self.pool.with_probe_timeout(timeout);
        self
    }

    /// Candidates in the snapshot taken at construction
    pub fn size(&self) -> usize {
        self.pool.size()
    }

    pub fn uris(&self) -> &[Url] {
        self.pool.uris()
    }

    pub async fn get_orchestrators(
        &self,
        count: usize,
    ) -> Result<Vec<OrchestratorInfo>, DiscoveryError> {
        self.pool.get_orchestrators(count).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::selection::RandomSelection;
    use crate::net::ProbeError;
    use crate::registry::{
        OrchestratorRegistry, RegisteredOrchestrator, RegistryError, StaticRegistry,
    };
    use crate::storage::RegistryStore;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct EchoProbe;

    #[async_trait]
    impl ProbeClient for EchoProbe {
        async fn get_orchestrator_info(
            &self,
            endpoint: &Url,
        ) -> Result<OrchestratorInfo, ProbeError> {
            Ok(OrchestratorInfo::new(endpoint.as_str()))
        }
    }

    struct DownRegistry;

    #[async_trait]
    impl OrchestratorRegistry for DownRegistry {
        async fn list_registered_orchestrators(
            &self,
        ) -> Result<Vec<RegisteredOrchestrator>, RegistryError> {
            Err(RegistryError::Network("timeout".into()))
        }
    }

    fn stub_orchestrators() -> Vec<RegisteredOrchestrator> {
        vec![
            RegisteredOrchestrator::new("0x01", "https://127.0.0.1:8936"),
            RegisteredOrchestrator::new("0x02", "https://127.0.0.1:8937"),
            RegisteredOrchestrator::new("0x03", "https://127.0.0.1:8938"),
        ]
    }

    #[tokio::test]
    async fn test_empty_registry_gives_empty_pool() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RegistryStore::open(dir.path()).unwrap());
        let sync = RegistrySync::new(Arc::new(StaticRegistry::default()), store);

        let pool = CachedOrchestratorPool::new(&sync, Arc::new(EchoProbe), &RandomSelection)
            .await
            .unwrap();
        assert_eq!(pool.size(), 0);
        assert!(pool.get_orchestrators(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_size_reflects_snapshot_after_sync() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RegistryStore::open(dir.path()).unwrap());

        let empty = RegistrySync::new(Arc::new(StaticRegistry::default()), store.clone());
        let before = CachedOrchestratorPool::new(&empty, Arc::new(EchoProbe), &RandomSelection)
            .await
            .unwrap();
        assert_eq!(before.size(), 0);

        let sync = RegistrySync::new(Arc::new(StaticRegistry::new(stub_orchestrators())), store);
        sync.sync().await.unwrap();

        // The earlier pool keeps its snapshot
        assert_eq!(before.size(), 0);

        let after = CachedOrchestratorPool::new(&sync, Arc::new(EchoProbe), &RandomSelection)
            .await
            .unwrap();
        assert_eq!(after.size(), 3);
        assert_eq!(after.get_orchestrators(3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_cache_syncs_on_demand() {
        let store = Arc::new(RegistryStore::open_in_memory().unwrap());
        let sync = RegistrySync::new(Arc::new(StaticRegistry::new(stub_orchestrators())), store.clone());

        let pool = CachedOrchestratorPool::new(&sync, Arc::new(EchoProbe), &RandomSelection)
            .await
            .unwrap();
        assert_eq!(pool.size(), 3);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failed_on_demand_sync_is_not_fatal() {
        let store = Arc::new(RegistryStore::open_in_memory().unwrap());
        let sync = RegistrySync::new(Arc::new(DownRegistry), store);

        let pool = CachedOrchestratorPool::new(&sync, Arc::new(EchoProbe), &RandomSelection)
            .await
            .unwrap();
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn test_from_records_drops_bad_uris() {
        let records = vec![
            OrchestratorRecord {
                address: "0x01".into(),
                service_uri: "https://127.0.0.1:8936".into(),
                updated_at: 0,
            },
            OrchestratorRecord {
                address: "0x02".into(),
                service_uri: "not-a-uri".into(),
                updated_at: 0,
            },
        ];
        let pool = CachedOrchestratorPool::from_records(&records, Arc::new(EchoProbe), &RandomSelection);
        assert_eq!(pool.size(), 1);
    }
}
