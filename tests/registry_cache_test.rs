//! Registry cache integration tests
//!
//! Covers the path from a registry read to a selection:
//! - HTTP indexer reads
//! - On-disk SQLite cache under concurrent readers
//! - Cached pools over real probe servers

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use axum::{routing::get, Json, Router};
use tempfile::TempDir;
use tokio::net::TcpListener;

use orch_discovery::discovery::{Discovery, RegistrySync};
use orch_discovery::net::{server, HttpProbeClient, OrchestratorInfo};
use orch_discovery::registry::{
    HttpRegistry, OrchestratorRegistry, RegisteredOrchestrator, RegistryError,
};
use orch_discovery::storage::{OrchestratorRecord, RegistryStore};
use orch_discovery::DiscoveryError;

async fn spawn_indexer(orchestrators: Vec<RegisteredOrchestrator>) -> String {
    let router = Router::new().route(
        "/orchestrators",
        get(move || {
            let orchestrators = orchestrators.clone();
            async move { Json(orchestrators) }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await });
    format!("http://{}/orchestrators", addr)
}

async fn spawn_orchestrator(transcoder: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve_on(listener, OrchestratorInfo::new(transcoder)));
    format!("http://{}", addr)
}

fn records(prefix: &str, n: usize) -> Vec<OrchestratorRecord> {
    (0..n)
        .map(|i| OrchestratorRecord {
            address: format!("0x{:04x}", i),
            service_uri: format!("https://{}-{}.example:8935", prefix, i),
            updated_at: 1_700_000_000,
        })
        .collect()
}

// =============================================================================
// HTTP registry
// =============================================================================

#[tokio::test]
async fn test_http_registry_lists_orchestrators() {
    let listed = vec![
        RegisteredOrchestrator::new("0x01", "https://127.0.0.1:8936"),
        RegisteredOrchestrator::new("0x02", "https://127.0.0.1:8937"),
    ];
    let url = spawn_indexer(listed.clone()).await;

    let registry = HttpRegistry::new(url);
    assert_eq!(registry.list_registered_orchestrators().await.unwrap(), listed);
}

#[tokio::test]
async fn test_http_registry_bad_payload() {
    let router = Router::new().route("/orchestrators", get(|| async { "{\"not\":\"a list\"}" }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await });

    let registry = HttpRegistry::new(format!("http://{}/orchestrators", addr));
    let err = registry.list_registered_orchestrators().await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidResponse(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_http_registry_down_fails_sync_and_keeps_cache() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RegistryStore::open(dir.path()).unwrap());
    store.replace_all(&records("old", 2), false).unwrap();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let registry = HttpRegistry::new(format!("http://127.0.0.1:{}/orchestrators", port))
        .with_timeout(Duration::from_secs(2));
    let sync = RegistrySync::new(Arc::new(registry), store.clone()).with_prune(true);

    let err = sync.sync().await.unwrap_err();
    assert!(matches!(err, DiscoveryError::RegistryReadFailure(RegistryError::Network(_))));
    assert_eq!(store.select_all().unwrap(), records("old", 2));
}

// =============================================================================
// Cache atomicity
// =============================================================================

#[test]
fn test_readers_never_see_mixed_snapshots() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RegistryStore::open(dir.path()).unwrap());
    let old = records("old", 50);
    let new = records("new", 50);
    store.replace_all(&old, false).unwrap();

    let writer = {
        let store = store.clone();
        let (old, new) = (old.clone(), new.clone());
        thread::spawn(move || {
            for i in 0..50 {
                let snapshot = if i % 2 == 0 { &new } else { &old };
                store.replace_all(snapshot, false).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let (old, new) = (old.clone(), new.clone());
            thread::spawn(move || {
                for _ in 0..100 {
                    let seen = store.select_all().unwrap();
                    assert!(seen == old || seen == new, "observed a half-applied sync");
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

// =============================================================================
// End to end
// =============================================================================

#[tokio::test]
async fn test_indexer_to_selection() {
    let mut listed = Vec::new();
    for i in 0..3 {
        let uri = spawn_orchestrator(&format!("orch-{}", i)).await;
        listed.push(RegisteredOrchestrator::new(format!("0x{:02x}", i), uri));
    }
    let url = spawn_indexer(listed).await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(RegistryStore::open(dir.path()).unwrap());
    let sync = Arc::new(RegistrySync::new(Arc::new(HttpRegistry::new(url)), store.clone()));
    let probe = Arc::new(HttpProbeClient::new(Duration::from_secs(2)).unwrap());
    let discovery = Discovery::new(sync, probe).with_probe_timeout(Duration::from_secs(2));

    // Empty cache: the first cached pool syncs on demand
    let pool = discovery.cached_pool().await.unwrap();
    assert_eq!(pool.size(), 3);
    assert_eq!(store.count().unwrap(), 3);

    let infos = pool.get_orchestrators(2).await.unwrap();
    assert_eq!(infos.len(), 2);
    assert!(infos.iter().all(|i| i.transcoder.starts_with("orch-")));

    // Fresh read bypassing the cache sees the same candidates
    let onchain = discovery.onchain_pool().await.unwrap();
    assert_eq!(onchain.size(), 3);
    assert_eq!(onchain.get_orchestrators(3).await.unwrap().len(), 3);
}
