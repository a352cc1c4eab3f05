//! Node configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::registry::RegisteredOrchestrator;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory (holds the registry cache)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Broadcaster address sent along with probes
    #[serde(default)]
    pub broadcaster_address: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            broadcaster_address: None,
        }
    }
}

/// Orchestrator selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Static orchestrator addresses. When set, selection skips the registry.
    #[serde(default)]
    pub orch_addrs: Vec<String>,

    /// Per-probe deadline in milliseconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Registry sync interval in seconds (0 = on demand only)
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Delete cached orchestrators the registry stopped listing
    #[serde(default)]
    pub prune_deregistered: bool,

    /// How many orchestrators a selection asks for
    #[serde(default = "default_select_count")]
    pub select_count: usize,
}

impl DiscoveryConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn sync_interval(&self) -> Option<Duration> {
        match self.sync_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            orch_addrs: vec![],
            probe_timeout_ms: default_probe_timeout(),
            sync_interval_secs: default_sync_interval(),
            prune_deregistered: false,
            select_count: default_select_count(),
        }
    }
}

/// Where the registry is read from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Indexer URL returning registered orchestrators as JSON
    #[serde(default)]
    pub url: Option<String>,

    /// Fixed registry entries, used when no URL is set
    #[serde(default)]
    pub orchestrators: Vec<RegisteredOrchestrator>,
}

/// Probe server (orchestrator role)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Transcoder descriptor reported to broadcasters
    #[serde(default = "default_transcoder")]
    pub transcoder: String,

    /// Address reported to broadcasters
    #[serde(default)]
    pub address: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            transcoder: default_transcoder(),
            address: None,
        }
    }
}

// Defaults
fn default_data_dir() -> PathBuf { PathBuf::from("/var/lib/orch-discovery") }
fn default_probe_timeout() -> u64 { 3000 }
fn default_sync_interval() -> u64 { 3600 }
fn default_select_count() -> usize { 1 }
fn default_listen() -> SocketAddr { SocketAddr::from(([0, 0, 0, 0], 8935)) }
fn default_transcoder() -> String { "local".to_string() }

impl Config {
    /// Parse a TOML config document
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
