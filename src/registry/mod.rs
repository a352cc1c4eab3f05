//! On-chain orchestrator registry - read side
//!
//! The registry is the source of truth for which orchestrators are
//! registered and where they claim to be reachable. Reads are slow and may
//! fail, which is why selection goes through the local cache.

pub mod http;
pub mod static_list;

pub use http::HttpRegistry;
pub use static_list::StaticRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An orchestrator as listed by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredOrchestrator {
    /// Chain address identifying the orchestrator
    pub address: String,

    /// Service URI the orchestrator registered
    pub service_uri: String,
}

impl RegisteredOrchestrator {
    pub fn new(address: impl Into<String>, service_uri: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            service_uri: service_uri.into(),
        }
    }
}

/// Read-only view of the registry.
#[async_trait]
pub trait OrchestratorRegistry: Send + Sync {
    async fn list_registered_orchestrators(&self)
        -> Result<Vec<RegisteredOrchestrator>, RegistryError>;
}

/// Registry read errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
