//! Probe RPC - broadcaster to orchestrator
//!
//! Handles:
//! - Wire types for the "are you available, what are your terms" call
//! - Client side probing of a single candidate endpoint
//! - Orchestrator side handler answering probes

pub mod probe;
pub mod server;

pub use probe::{HttpProbeClient, ProbeClient};

use serde::{Deserialize, Serialize};

/// Path of the probe call on an orchestrator's service URI
pub const PROBE_PATH: &str = "/orchestrator/info";

/// Probe request sent by a broadcaster
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorRequest {
    /// Calling broadcaster's address, if it wants to identify itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcaster: Option<String>,
}

/// Probe response, self-reported by the orchestrator.
///
/// Nothing in here is verified. It is advisory data about the remote worker
/// and is never used as the orchestrator's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorInfo {
    /// Transcoder descriptor (name of the worker offering capacity)
    pub transcoder: String,

    /// Address the orchestrator claims to operate under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Opaque terms payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<serde_json::Value>,
}

impl OrchestratorInfo {
    pub fn new(transcoder: impl Into<String>) -> Self {
        Self {
            transcoder: transcoder.into(),
            address: None,
            terms: None,
        }
    }
}

/// Per-probe failures. These never fail a selection call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("Probe timed out")]
    Timeout,

    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ProbeError {
    /// Short label used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Timeout => "timeout",
            ProbeError::Unreachable(_) => "unreachable",
            ProbeError::Protocol(_) => "protocol",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_without_optional_fields() {
        let info: OrchestratorInfo =
            serde_json::from_str(r#"{"transcoder":"gpu-rig-1"}"#).unwrap();
        assert_eq!(info, OrchestratorInfo::new("gpu-rig-1"));

        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(json, r#"{"transcoder":"gpu-rig-1"}"#);
    }

    #[test]
    fn test_info_keeps_opaque_terms() {
        let info: OrchestratorInfo = serde_json::from_str(
            r#"{"transcoder":"t","terms":{"pricePerUnit":7,"pixelsPerUnit":1}}"#,
        )
        .unwrap();
        let terms = info.terms.unwrap();
        assert_eq!(terms["pricePerUnit"], 7);
    }

    #[test]
    fn test_probe_error_kinds() {
        assert_eq!(ProbeError::Timeout.kind(), "timeout");
        assert_eq!(ProbeError::Unreachable("refused".into()).kind(), "unreachable");
        assert_eq!(ProbeError::Protocol("bad json".into()).kind(), "protocol");
    }
}
