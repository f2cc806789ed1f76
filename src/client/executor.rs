//! Outbound call executor.
//!
//! # Responsibilities
//! - Issue exactly one HTTP request to a peer
//! - Enforce the per-call deadline
//! - Decode the peer envelope into a typed value
//!
//! # Design Decisions
//! - No retries and no breaker bookkeeping here; callers compose those
//! - Non-2xx statuses become `Transport` failures carrying the peer's error detail
//! - Requests that cannot be built locally are `Request` failures and never reach the peer

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::client::endpoint::PeerServiceEndpoint;
use crate::http::response::ApiEnvelope;
use crate::resilience::timeouts::with_timeout;
use crate::resilience::CallFailure;

/// A fully formed request to a peer. `path` is relative to the peer's `/api/v1/`.
#[derive(Debug, Clone)]
pub struct PeerRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// Overrides the endpoint's default timeout.
    pub timeout: Option<Duration>,
    /// Caller's token, forwarded to the peer.
    pub bearer_token: Option<String>,
}

impl PeerRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            timeout: None,
            bearer_token: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Method::POST, path)
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_bearer(mut self, token: Option<&str>) -> Self {
        self.bearer_token = token.map(str::to_string);
        self
    }
}

/// Sends single requests over a shared `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct OutboundCallExecutor {
    http: reqwest::Client,
}

impl OutboundCallExecutor {
    pub fn new() -> Result<Self, reqwest::Error> {
        // peers are internal; never route them through an egress proxy
        let http = reqwest::Client::builder()
            .no_proxy()
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &PeerServiceEndpoint,
        request: &PeerRequest,
    ) -> Result<T, CallFailure> {
        let deadline = request.timeout.unwrap_or(endpoint.timeout);
        with_timeout(deadline, self.send(endpoint, request)).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &PeerServiceEndpoint,
        request: &PeerRequest,
    ) -> Result<T, CallFailure> {
        let url = endpoint
            .url_for(&request.path)
            .map_err(|e| CallFailure::request(format!("invalid path '{}': {}", request.path, e)))?;

        let mut builder = self.http.request(request.method.clone(), url);
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                CallFailure::request(e.to_string())
            } else {
                CallFailure::transport(None, e.to_string())
            }
        })?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CallFailure::transport(None, format!("reading body: {}", e)))?;

        if !status.is_success() {
            let (message, errors) = match serde_json::from_slice::<ApiEnvelope<Value>>(&bytes) {
                Ok(envelope) if !envelope.message.is_empty() => (envelope.message, envelope.errors),
                Ok(envelope) => (status.to_string(), envelope.errors),
                Err(_) => (status.to_string(), Vec::new()),
            };
            return Err(CallFailure::transport(Some(status.as_u16()), message).with_errors(errors));
        }

        decode_data(&bytes).map_err(|e| {
            CallFailure::transport(Some(status.as_u16()), format!("undecodable response: {}", e))
        })
    }
}

/// Pull `data` out of a 2xx envelope. An empty body or null `data` decodes as JSON null.
fn decode_data<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    let data = if bytes.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice::<ApiEnvelope<Value>>(bytes)?
            .data
            .unwrap_or(Value::Null)
    };
    serde_json::from_value(data)
}
