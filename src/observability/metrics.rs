//! Metrics collection and exposition.
//!
//! # Metrics
//! - `peer_calls_total` (counter): attempts by peer, operation, outcome
//! - `peer_call_duration_seconds` (histogram): attempt latency
//! - `peer_retries_total` (counter): retries scheduled
//! - `peer_circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `peer_fallbacks_total` (counter): fallbacks applied, by supplier
//! - `authorization_decisions_total` (counter): allow/deny by action
//! - `propagation_jobs_total` (counter): background propagation outcomes
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op (unit tests, CLI)
//! - Prometheus exposition is opt-in via config

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_peer_attempt(peer: &str, operation: &str, outcome: &'static str, elapsed: Duration) {
    counter!(
        "peer_calls_total",
        "peer" => peer.to_string(),
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "peer_call_duration_seconds",
        "peer" => peer.to_string(),
        "operation" => operation.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_short_circuit(peer: &str, operation: &str) {
    counter!(
        "peer_calls_total",
        "peer" => peer.to_string(),
        "operation" => operation.to_string(),
        "outcome" => "circuit_open"
    )
    .increment(1);
}

pub fn record_retry(peer: &str, operation: &str) {
    counter!(
        "peer_retries_total",
        "peer" => peer.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

pub fn record_circuit_state(peer: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    };
    gauge!("peer_circuit_state", "peer" => peer.to_string()).set(value);
}

pub fn record_fallback(peer: &str, operation: &str, fallback: &'static str) {
    counter!(
        "peer_fallbacks_total",
        "peer" => peer.to_string(),
        "operation" => operation.to_string(),
        "fallback" => fallback
    )
    .increment(1);
}

pub fn record_authorization(action: String, allowed: bool) {
    let decision = if allowed { "allow" } else { "deny" };
    counter!("authorization_decisions_total", "action" => action, "decision" => decision).increment(1);
}

pub fn record_propagation(job: &'static str, outcome: &'static str) {
    counter!("propagation_jobs_total", "job" => job, "outcome" => outcome).increment(1);
}
