//! Outbound call failure taxonomy.
//!
//! # Classification
//! ```text
//! Timeout                      → retryable, counts against peer
//! Transport (no status)        → retryable, counts against peer (connect/DNS)
//! Transport (5xx)              → retryable, counts against peer
//! Transport (4xx / bad body)   → not retryable, peer is alive
//! CircuitOpen                  → not retryable, no network I/O happened
//! Request                      → not retryable, never left this process
//! ```

use std::fmt;
use thiserror::Error;

/// Kind of outbound call failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    Transport,
    CircuitOpen,
    /// The request could not be built or routed locally.
    Request,
}

impl FailureKind {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Transport => "transport",
            FailureKind::CircuitOpen => "circuit_open",
            FailureKind::Request => "request",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure signal produced by the outbound call path.
#[derive(Debug, Clone, Error)]
#[error("{kind} failure calling peer: {message}")]
pub struct CallFailure {
    pub kind: FailureKind,
    /// HTTP status, when the peer answered at all.
    pub status: Option<u16>,
    pub message: String,
    /// Structured `errors[]` detail from the peer envelope.
    pub errors: Vec<serde_json::Value>,
}

impl CallFailure {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Timeout,
            status: None,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            status,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn circuit_open(peer: &str) -> Self {
        Self {
            kind: FailureKind::CircuitOpen,
            status: None,
            message: format!("circuit for {} is open", peer),
            errors: Vec::new(),
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Request,
            status: None,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn with_errors(mut self, errors: Vec<serde_json::Value>) -> Self {
        self.errors = errors;
        self
    }

    /// Whether the retry policy may re-issue the call.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            FailureKind::Timeout => true,
            FailureKind::Transport => match self.status {
                None => true,
                Some(status) => (500..600).contains(&status),
            },
            FailureKind::CircuitOpen | FailureKind::Request => false,
        }
    }

    /// Whether this outcome is evidence that the peer is unhealthy.
    ///
    /// A 4xx answer or an undecodable 2xx body still proves the peer is up.
    pub fn counts_against_peer(&self) -> bool {
        self.is_retryable()
    }

    /// True for 4xx answers: the peer understood and refused the request.
    pub fn is_client_error(&self) -> bool {
        self.kind == FailureKind::Transport
            && matches!(self.status, Some(status) if (400..500).contains(&status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(CallFailure::timeout("slow").is_retryable());
        assert!(CallFailure::transport(None, "refused").is_retryable());
        assert!(CallFailure::transport(Some(503), "down").is_retryable());
        assert!(!CallFailure::transport(Some(404), "missing").is_retryable());
        assert!(!CallFailure::transport(Some(200), "bad body").is_retryable());
        assert!(!CallFailure::circuit_open("user-service").is_retryable());
        assert!(!CallFailure::request("invalid path").is_retryable());
    }

    #[test]
    fn test_peer_health_accounting() {
        assert!(CallFailure::transport(Some(500), "boom").counts_against_peer());
        assert!(!CallFailure::transport(Some(422), "invalid").counts_against_peer());
        assert!(!CallFailure::circuit_open("x").counts_against_peer());
        assert!(!CallFailure::request("unknown peer 'x'").counts_against_peer());
        assert!(CallFailure::transport(Some(409), "conflict").is_client_error());
        assert!(!CallFailure::timeout("slow").is_client_error());
    }

    #[test]
    fn test_display() {
        let f = CallFailure::circuit_open("address-service");
        assert_eq!(
            f.to_string(),
            "circuit_open failure calling peer: circuit for address-service is open"
        );
    }
}
