//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::backoff::BackoffStrategy;
use crate::resilience::{CircuitBreakerSettings, RetryPolicy};

/// Root configuration for the patient-records service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Token verification settings.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Background propagation queue.
    pub propagation: PropagationConfig,

    /// Peer services reachable over HTTP.
    pub peers: Vec<PeerServiceConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            auth: AuthConfig::default(),
            observability: ObservabilityConfig::default(),
            propagation: PropagationConfig::default(),
            peers: vec![
                PeerServiceConfig::named("auth-service", "http://localhost:8081"),
                PeerServiceConfig::named("user-service", "http://localhost:8082"),
                PeerServiceConfig::named("address-service", "http://localhost:8083"),
                PeerServiceConfig::named("schedule-service", "http://localhost:8084"),
            ],
        }
    }
}

impl ServiceConfig {
    pub fn peer(&self, name: &str) -> Option<&PeerServiceConfig> {
        self.peers.iter().find(|p| p.name == name)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Inbound request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// Bearer token verification.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 shared secret.
    pub jwt_secret: String,

    /// Allowed clock skew when checking `exp`.
    pub leeway_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            jwt_secret: "CHANGE_ME_IN_PRODUCTION".to_string(),
            leeway_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Pending jobs held before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self { queue_capacity: 256 }
    }
}

/// One peer service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PeerServiceConfig {
    /// Logical name, e.g. "user-service".
    pub name: String,

    /// Base URL; requests go to `{base_url}/api/v1/...`.
    pub base_url: String,

    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_peer_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
}

fn default_peer_timeout_ms() -> u64 {
    2000
}

impl PeerServiceConfig {
    pub fn named(name: &str, base_url: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            timeout_ms: default_peer_timeout_ms(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per logical call (first try included).
    pub max_attempts: u32,

    /// `fixed` or `exponential`.
    pub backoff: BackoffStrategy,

    /// Base delay in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: config.backoff,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Sliding window size (number of calls).
    pub window_size: usize,

    /// Failure percentage that opens the circuit.
    pub failure_rate_threshold: f64,

    /// Time spent open before trial calls are allowed, in milliseconds.
    pub open_state_ms: u64,

    /// Trial calls allowed while half-open.
    pub half_open_trial_count: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            failure_rate_threshold: 50.0,
            open_state_ms: 30_000,
            half_open_trial_count: 1,
        }
    }
}

impl From<&CircuitBreakerConfig> for CircuitBreakerSettings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            window_size: config.window_size,
            failure_rate_threshold: config.failure_rate_threshold,
            open_state_duration: Duration::from_millis(config.open_state_ms),
            half_open_trial_count: config.half_open_trial_count,
        }
    }
}
