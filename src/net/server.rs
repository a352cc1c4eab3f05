//! Orchestrator side of the probe RPC

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use tokio::net::TcpListener;
use tracing::{debug, info};

use super::{OrchestratorInfo, OrchestratorRequest, PROBE_PATH};

/// Build the router answering probes with `info`.
pub fn router(info: OrchestratorInfo) -> Router {
    Router::new()
        .route(PROBE_PATH, post(get_orchestrator))
        .with_state(Arc::new(info))
}

async fn get_orchestrator(
    State(info): State<Arc<OrchestratorInfo>>,
    Json(request): Json<OrchestratorRequest>,
) -> Json<OrchestratorInfo> {
    debug!(broadcaster = ?request.broadcaster, "Answering probe");
    Json((*info).clone())
}

/// Serve probes on an already bound listener until the task is dropped.
pub async fn serve_on(listener: TcpListener, info: OrchestratorInfo) -> std::io::Result<()> {
    axum::serve(listener, router(info)).await
}

/// Bind `addr` and serve probes.
pub async fn serve(addr: SocketAddr, info: OrchestratorInfo) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Answering probes on http://{}{}", listener.local_addr()?, PROBE_PATH);
    serve_on(listener, info).await
}
