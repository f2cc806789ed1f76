//! Resilient entry point for every peer call.

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::client::endpoint::PeerServiceEndpoint;
use crate::client::executor::{OutboundCallExecutor, PeerRequest};
use crate::config::PeerServiceConfig;
use crate::resilience::{with_resilience, CallFailure, CircuitBreakerRegistry};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("peer '{peer}' has an invalid base_url: {source}")]
    InvalidEndpoint {
        peer: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Owns the executor, the configured peers and their breakers.
pub struct PeerGateway {
    executor: OutboundCallExecutor,
    endpoints: HashMap<String, PeerServiceEndpoint>,
    breakers: Arc<CircuitBreakerRegistry>,
}

impl PeerGateway {
    pub fn new(executor: OutboundCallExecutor, endpoints: Vec<PeerServiceEndpoint>) -> Self {
        let breakers = Arc::new(CircuitBreakerRegistry::new(
            endpoints
                .iter()
                .map(|e| (e.name.as_str(), e.circuit_breaker.clone())),
        ));
        let endpoints = endpoints.into_iter().map(|e| (e.name.clone(), e)).collect();
        Self {
            executor,
            endpoints,
            breakers,
        }
    }

    pub fn from_config(peers: &[PeerServiceConfig]) -> Result<Self, GatewayError> {
        let endpoints = peers
            .iter()
            .map(|peer| {
                PeerServiceEndpoint::from_config(peer).map_err(|source| GatewayError::InvalidEndpoint {
                    peer: peer.name.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(OutboundCallExecutor::new()?, endpoints))
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    pub fn endpoint(&self, peer: &str) -> Option<&PeerServiceEndpoint> {
        self.endpoints.get(peer)
    }

    /// Call `peer` behind its breaker and retry policy.
    ///
    /// Callers decide what a failure means by passing the result through
    /// [`with_fallback`](crate::resilience::with_fallback).
    pub async fn call<T: DeserializeOwned>(
        &self,
        peer: &str,
        operation: &str,
        request: PeerRequest,
    ) -> Result<T, CallFailure> {
        let (Some(endpoint), Some(breaker)) = (self.endpoints.get(peer), self.breakers.get(peer)) else {
            tracing::error!(peer = %peer, operation = %operation, "Call to unconfigured peer");
            return Err(CallFailure::request(format!("unknown peer '{}'", peer)));
        };

        let executor = &self.executor;
        let request = &request;
        with_resilience(breaker, &endpoint.retry, peer, operation, move |_attempt| {
            executor.execute(endpoint, request)
        })
        .await
    }
}
