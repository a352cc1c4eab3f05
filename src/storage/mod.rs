//! Storage layer - local registry cache
//!
//! Handles:
//! - SQLite persistence of the last synced registry snapshot
//! - Atomic replace of the snapshot on sync

pub mod registry;

pub use registry::{OrchestratorRecord, RegistryStore};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}
