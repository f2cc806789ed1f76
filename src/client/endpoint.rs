//! Runtime view of a configured peer.

use std::time::Duration;
use url::Url;

use crate::config::PeerServiceConfig;
use crate::resilience::{CircuitBreakerSettings, RetryPolicy};

/// A named peer service: where it lives and how calls to it are guarded.
/// Immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct PeerServiceEndpoint {
    pub name: String,
    pub base_url: Url,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub circuit_breaker: CircuitBreakerSettings,
}

impl PeerServiceEndpoint {
    pub fn from_config(config: &PeerServiceConfig) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(&config.base_url)?;
        // a trailing slash keeps join() from dropping the last path segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            name: config.name.clone(),
            base_url,
            timeout: config.timeout(),
            retry: RetryPolicy::from(&config.retry),
            circuit_breaker: CircuitBreakerSettings::from(&config.circuit_breaker),
        })
    }

    /// Absolute URL of `path` under the peer's `/api/v1/` root.
    pub fn url_for(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url
            .join("api/v1/")?
            .join(path.trim_start_matches('/'))
    }
}
