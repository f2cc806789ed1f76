use axum::extract::State;
use serde::Serialize;

use crate::http::response::ApiEnvelope;
use crate::http::server::AppState;
use crate::resilience::{CircuitSnapshot, CircuitState};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub peers: usize,
    /// Peers whose circuit is not closed.
    pub degraded_peers: Vec<String>,
}

pub async fn get_status(State(state): State<AppState>) -> ApiEnvelope<SystemStatus> {
    let circuits = state.gateway.breakers().snapshot();
    let degraded_peers: Vec<String> = circuits
        .iter()
        .filter(|c| c.state != CircuitState::Closed)
        .map(|c| c.peer.clone())
        .collect();

    ApiEnvelope::success(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if degraded_peers.is_empty() { "operational" } else { "degraded" },
        uptime_secs: state.started_at.elapsed().as_secs(),
        peers: circuits.len(),
        degraded_peers,
    })
}

pub async fn get_circuits(State(state): State<AppState>) -> ApiEnvelope<Vec<CircuitSnapshot>> {
    ApiEnvelope::success(state.gateway.breakers().snapshot())
}
