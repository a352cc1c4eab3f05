//! Fixed registry for off-chain deployments and tests

use async_trait::async_trait;

use super::{OrchestratorRegistry, RegisteredOrchestrator, RegistryError};

/// Registry that always lists the same orchestrators
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    orchestrators: Vec<RegisteredOrchestrator>,
}

impl StaticRegistry {
    pub fn new(orchestrators: Vec<RegisteredOrchestrator>) -> Self {
        Self { orchestrators }
    }
}

#[async_trait]
impl OrchestratorRegistry for StaticRegistry {
    async fn list_registered_orchestrators(
        &self,
    ) -> Result<Vec<RegisteredOrchestrator>, RegistryError> {
        Ok(self.orchestrators.clone())
    }
}
