//! Remote probe client
//!
//! One bounded call against one candidate endpoint. Implementations must be
//! safe to call concurrently from many tasks against distinct endpoints.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{OrchestratorInfo, OrchestratorRequest, ProbeError, PROBE_PATH};

/// Asks a candidate endpoint whether it is available and on what terms.
#[async_trait]
pub trait ProbeClient: Send + Sync {
    async fn get_orchestrator_info(&self, endpoint: &Url) -> Result<OrchestratorInfo, ProbeError>;
}

/// Probe client speaking JSON over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpProbeClient {
    client: reqwest::Client,
    broadcaster: Option<String>,
}

impl HttpProbeClient {
    /// Build a client whose every call is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Unreachable(format!("building HTTP client: {}", e)))?;

        Ok(Self {
            client,
            broadcaster: None,
        })
    }

    /// Identify the calling broadcaster in every probe request.
    pub fn with_broadcaster(mut self, address: Option<String>) -> Self {
        self.broadcaster = address;
        self
    }
}

#[async_trait]
impl ProbeClient for HttpProbeClient {
    async fn get_orchestrator_info(&self, endpoint: &Url) -> Result<OrchestratorInfo, ProbeError> {
        let url = endpoint
            .join(PROBE_PATH)
            .map_err(|e| ProbeError::Unreachable(format!("bad endpoint {}: {}", endpoint, e)))?;

        let request = OrchestratorRequest {
            broadcaster: self.broadcaster.clone(),
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            return Err(ProbeError::Protocol(format!("HTTP {}", response.status())));
        }

        let info: OrchestratorInfo = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout
            } else {
                ProbeError::Protocol(e.to_string())
            }
        })?;

        debug!(%endpoint, transcoder = %info.transcoder, "Probe succeeded");
        Ok(info)
    }
}

fn classify(e: reqwest::Error) -> ProbeError {
    if e.is_timeout() {
        ProbeError::Timeout
    } else if e.is_decode() {
        ProbeError::Protocol(e.to_string())
    } else {
        ProbeError::Unreachable(e.to_string())
    }
}
