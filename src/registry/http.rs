//! Registry read through an HTTP indexer
//!
//! The indexer answers `GET <url>` with a JSON array of
//! `{ "address": ..., "service_uri": ... }` objects mirroring chain state.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{OrchestratorRegistry, RegisteredOrchestrator, RegistryError};

/// Registry client backed by an HTTP/JSON indexer
pub struct HttpRegistry {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpRegistry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl OrchestratorRegistry for HttpRegistry {
    async fn list_registered_orchestrators(
        &self,
    ) -> Result<Vec<RegisteredOrchestrator>, RegistryError> {
        debug!(url = %self.url, "Listing registered orchestrators");

        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RegistryError::Network(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let orchestrators: Vec<RegisteredOrchestrator> = response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

        info!(count = orchestrators.len(), "Fetched registered orchestrators");
        Ok(orchestrators)
    }
}
