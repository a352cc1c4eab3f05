//! Orchestrator pool - concurrent probing with bounded collection
//!
//! A pool is built for one selection request. `get_orchestrators` probes
//! every candidate at once and returns as soon as enough of them answered.
//!
//! Probes that finish after the caller stopped listening must still be able
//! to report and exit. The results channel therefore has one slot per
//! candidate and probes report with `try_send`, so a probe never waits on
//! the collector.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use super::selection::{is_permutation, SelectionStrategy};
use super::DiscoveryError;
use crate::net::{OrchestratorInfo, ProbeClient, ProbeError};

/// Deadline applied to each probe unless configured otherwise
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Outcome reported by one probe task
struct ProbeReport {
    uri: Url,
    outcome: Result<OrchestratorInfo, ProbeError>,
}

/// Fixed, permuted set of candidate endpoints
pub struct OrchestratorPool {
    uris: Vec<Url>,
    probe: Arc<dyn ProbeClient>,
    probe_timeout: Duration,
}

impl OrchestratorPool {
    /// Build a pool from candidate addresses.
    ///
    /// Addresses that do not parse as an http(s) URI with a host, and
    /// repeats of an earlier address, are dropped. The rest is reordered by
    /// `strategy`.
    pub fn new<S: AsRef<str>>(
        addresses: &[S],
        probe: Arc<dyn ProbeClient>,
        strategy: &dyn SelectionStrategy,
    ) -> Self {
        let mut seen = HashSet::new();
        let candidates: Vec<Url> = addresses
            .iter()
            .filter_map(|addr| parse_endpoint(addr.as_ref()))
            .filter(|uri| seen.insert(uri.clone()))
            .collect();

        let dropped = addresses.len() - candidates.len();
        if dropped > 0 {
            debug!(dropped, "Ignored malformed or duplicate candidate addresses");
        }

        let order = strategy.permutation(candidates.len());
        let uris = if is_permutation(&order, candidates.len()) {
            order.into_iter().map(|i| candidates[i].clone()).collect()
        } else {
            warn!(
                candidates = candidates.len(),
                "Selection strategy returned an invalid permutation, keeping input order"
            );
            candidates
        };

        Self {
            uris,
            probe,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Override the per-probe deadline
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Number of candidate endpoints
    pub fn size(&self) -> usize {
        self.uris.len()
    }

    /// Candidates in probe order
    pub fn uris(&self) -> &[Url] {
        &self.uris
    }

    /// Probe all candidates and return the first `count` that answer.
    ///
    /// Results are in completion order. Failed probes are left out and
    /// never retried here; fewer than `count` results is not an error.
    /// Probes still running when this returns are left to finish on their
    /// own.
    pub async fn get_orchestrators(
        &self,
        count: usize,
    ) -> Result<Vec<OrchestratorInfo>, DiscoveryError> {
        if count == 0 {
            return Err(DiscoveryError::InvalidRequest(
                "orchestrator count must be at least 1".to_string(),
            ));
        }

        let total = self.uris.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let (tx, mut rx) = mpsc::channel::<ProbeReport>(total);

        for uri in &self.uris {
            let tx = tx.clone();
            let probe = Arc::clone(&self.probe);
            let uri = uri.clone();
            let timeout = self.probe_timeout;

            tokio::spawn(async move {
                let outcome =
                    match tokio::time::timeout(timeout, probe.get_orchestrator_info(&uri)).await {
                        Ok(result) => result,
                        Err(_) => Err(ProbeError::Timeout),
                    };
                // One slot per probe: never full, and a closed channel just
                // means the collector is done.
                let _ = tx.try_send(ProbeReport { uri, outcome });
            });
        }
        drop(tx);

        let mut infos = Vec::with_capacity(count.min(total));
        let mut responses = 0;

        while infos.len() < count && responses < total {
            let Some(report) = rx.recv().await else {
                break;
            };
            responses += 1;

            match report.outcome {
                Ok(info) => infos.push(info),
                Err(e) => {
                    debug!(uri = %report.uri, kind = e.kind(), error = %e, "Probe failed");
                }
            }
        }

        info!(
            requested = count,
            found = infos.len(),
            candidates = total,
            responses,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Orchestrator selection complete"
        );

        Ok(infos)
    }
}

/// Parse a candidate address into a contactable endpoint
pub fn parse_endpoint(addr: &str) -> Option<Url> {
    let uri = Url::parse(addr.trim()).ok()?;
    match uri.scheme() {
        "http" | "https" if uri.host_str().is_some() => Some(uri),
        _ => None,
    }
}
