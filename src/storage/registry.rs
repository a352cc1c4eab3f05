//! Registry cache store
//!
//! SQLite-backed mirror of the on-chain registry. One row per orchestrator
//! identity. Rows are only ever written by a sync, and a sync is applied in a
//! single transaction so a failed write leaves the previous snapshot as it
//! was.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::StoreError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS orchestrators (
    ethereum_address TEXT PRIMARY KEY CHECK (length(ethereum_address) > 0),
    service_uri TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);";

/// Cached registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorRecord {
    /// Orchestrator identity, unique in the table
    pub address: String,
    /// Last known service URI
    pub service_uri: String,
    /// Unix seconds of the sync that wrote this row
    pub updated_at: i64,
}

/// Persisted table of registry records.
///
/// The connection sits behind a mutex, so a reader either sees the snapshot
/// from before a replace or the one after it, never a mix.
pub struct RegistryStore {
    conn: Mutex<Connection>,
}

impl RegistryStore {
    /// Open or create the cache database under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| StoreError::Io(format!("creating {}: {}", data_dir.display(), e)))?;
        let db_path = data_dir.join("orchestrators.db");
        let conn = Connection::open(&db_path)?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), "Registry cache opened");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Read every cached record, in insertion order.
    pub fn select_all(&self) -> Result<Vec<OrchestratorRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT ethereum_address, service_uri, updated_at
             FROM orchestrators ORDER BY rowid",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(OrchestratorRecord {
                address: row.get(0)?,
                service_uri: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Number of cached records
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM orchestrators", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }

    /// Apply a sync snapshot.
    ///
    /// Each record is upserted on its identity, so if an identity appears
    /// twice the later one wins and existing rows keep their position. With
    /// `prune`, identities missing from `records` are deleted too. All of it
    /// happens in one transaction. Returns the number of distinct identities
    /// written.
    pub fn replace_all(
        &self,
        records: &[OrchestratorRecord],
        prune: bool,
    ) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut seen = HashSet::with_capacity(records.len());
        {
            let mut upsert = tx.prepare_cached(
                "INSERT INTO orchestrators (ethereum_address, service_uri, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(ethereum_address) DO UPDATE
                 SET service_uri = excluded.service_uri, updated_at = excluded.updated_at",
            )?;
            for record in records {
                upsert.execute(rusqlite::params![
                    record.address,
                    record.service_uri,
                    record.updated_at
                ])?;
                seen.insert(record.address.as_str());
            }
        }

        let mut pruned = 0;
        if prune {
            let existing = {
                let mut stmt = tx.prepare("SELECT ethereum_address FROM orchestrators")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            for address in existing.iter().filter(|a| !seen.contains(a.as_str())) {
                tx.execute(
                    "DELETE FROM orchestrators WHERE ethereum_address = ?1",
                    [address],
                )?;
                pruned += 1;
            }
        }

        tx.commit()?;

        debug!(written = seen.len(), pruned, "Registry cache replaced");
        Ok(seen.len())
    }
}
