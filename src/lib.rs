//! orch-discovery: orchestrator discovery and selection for broadcaster nodes
//!
//! A broadcaster needs a handful of responsive orchestrators out of a
//! network-sized candidate list. This crate provides:
//! - Concurrent probing of candidate endpoints with early return
//! - Randomized, injectable candidate ordering
//! - A SQLite cache of the on-chain orchestrator registry and its sync
//! - The orchestrator side of the probe call

pub mod config;
pub mod discovery;
pub mod net;
pub mod registry;
pub mod storage;

pub use config::Config;
pub use discovery::{
    CachedOrchestratorPool, Discovery, DiscoveryError, OrchestratorPool, OrchestratorSource,
    RegistrySync, SelectionStrategy, SyncLoop,
};
pub use net::{HttpProbeClient, OrchestratorInfo, ProbeClient, ProbeError};
pub use registry::{OrchestratorRegistry, RegisteredOrchestrator, RegistryError};
pub use storage::{OrchestratorRecord, RegistryStore, StoreError};
