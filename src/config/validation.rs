//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds in range)
//! - Check peer names are unique and URLs are absolute http(s)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::{PeerServiceConfig, ServiceConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `peers[user-service].timeout_ms`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }
    if config.auth.jwt_secret.is_empty() {
        errors.push(ValidationError::new("auth.jwt_secret", "must not be empty"));
    }
    if config.propagation.queue_capacity == 0 {
        errors.push(ValidationError::new("propagation.queue_capacity", "must be > 0"));
    }

    let mut seen = HashSet::new();
    for peer in &config.peers {
        if !peer.name.is_empty() && !seen.insert(peer.name.as_str()) {
            errors.push(ValidationError::new(
                format!("peers[{}].name", peer.name),
                "duplicate peer name",
            ));
        }
        validate_peer(peer, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_peer(peer: &PeerServiceConfig, errors: &mut Vec<ValidationError>) {
    let prefix = format!("peers[{}]", peer.name);

    if peer.name.trim().is_empty() {
        errors.push(ValidationError::new(format!("{}.name", prefix), "must not be empty"));
    }

    match Url::parse(&peer.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        Ok(_) => errors.push(ValidationError::new(
            format!("{}.base_url", prefix),
            "must be an absolute http(s) URL",
        )),
        Err(e) => errors.push(ValidationError::new(
            format!("{}.base_url", prefix),
            format!("invalid URL '{}': {}", peer.base_url, e),
        )),
    }

    if peer.timeout_ms == 0 {
        errors.push(ValidationError::new(format!("{}.timeout_ms", prefix), "must be > 0"));
    }

    let retry = &peer.retry;
    if retry.max_attempts == 0 {
        errors.push(ValidationError::new(format!("{}.retry.max_attempts", prefix), "must be >= 1"));
    }
    if retry.base_delay_ms > retry.max_delay_ms {
        errors.push(ValidationError::new(
            format!("{}.retry.base_delay_ms", prefix),
            "must not exceed max_delay_ms",
        ));
    }

    let cb = &peer.circuit_breaker;
    if cb.window_size == 0 {
        errors.push(ValidationError::new(
            format!("{}.circuit_breaker.window_size", prefix),
            "must be >= 1",
        ));
    }
    if !(cb.failure_rate_threshold > 0.0 && cb.failure_rate_threshold <= 100.0) {
        errors.push(ValidationError::new(
            format!("{}.circuit_breaker.failure_rate_threshold", prefix),
            "must be in (0, 100]",
        ));
    }
    if cb.open_state_ms == 0 {
        errors.push(ValidationError::new(
            format!("{}.circuit_breaker.open_state_ms", prefix),
            "must be > 0",
        ));
    }
    if cb.half_open_trial_count == 0 {
        errors.push(ValidationError::new(
            format!("{}.circuit_breaker.half_open_trial_count", prefix),
            "must be >= 1",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ServiceConfig::default();
        config.auth.jwt_secret.clear();
        config.listener.bind_address = "not-an-address".into();
        let peer = &mut config.peers[0];
        peer.base_url = "ftp://files".into();
        peer.timeout_ms = 0;
        peer.retry.max_attempts = 0;
        peer.circuit_breaker.failure_rate_threshold = 150.0;
        peer.circuit_breaker.half_open_trial_count = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(errors.len(), 7, "{:?}", fields);
        assert!(fields.contains(&"auth.jwt_secret"));
        assert!(fields.contains(&"peers[auth-service].circuit_breaker.failure_rate_threshold"));
    }

    #[test]
    fn test_duplicate_peer_names() {
        let mut config = ServiceConfig::default();
        let dup = config.peers[1].clone();
        config.peers.push(dup);
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "peers[user-service].name: duplicate peer name");
    }
}
