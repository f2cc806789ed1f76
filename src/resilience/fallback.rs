//! Fallback resolution for failed peer calls.
//!
//! # Suppliers
//! - `EmptyCollection`: list reads degrade to an empty list
//! - `Sentinel`: single-entity reads degrade to a marked placeholder
//! - `FailLoudly`: writes surface `UpstreamUnavailable` (or `PeerRejected` on 4xx)
//!
//! # Design Decisions
//! - Resolution is pure: same failure + same supplier gives the same kind of result
//! - Writes never get a fabricated success
//! - Logging and metrics happen in `with_fallback`, at the call site

use crate::error::ServiceError;
use crate::observability::metrics;
use crate::resilience::failure::CallFailure;

/// Produces a degraded result for a failed call.
pub trait FallbackSupplier<T> {
    /// Label used in logs and metrics.
    fn label(&self) -> &'static str;

    /// Label for one specific failure. Defaults to [`label`](Self::label).
    fn label_for(&self, _failure: &CallFailure) -> &'static str {
        self.label()
    }

    fn supply(&self, peer: &str, operation: &str, failure: &CallFailure) -> Result<T, ServiceError>;
}

/// Degrades list reads to an empty list.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCollection;

impl<T> FallbackSupplier<Vec<T>> for EmptyCollection {
    fn label(&self) -> &'static str {
        "empty"
    }

    fn supply(&self, _peer: &str, _operation: &str, _failure: &CallFailure) -> Result<Vec<T>, ServiceError> {
        Ok(Vec::new())
    }
}

/// Degrades single-entity reads to a placeholder built by `F`.
#[derive(Debug, Clone, Copy)]
pub struct Sentinel<F>(pub F);

impl<T, F> FallbackSupplier<T> for Sentinel<F>
where
    F: Fn() -> T,
{
    fn label(&self) -> &'static str {
        "sentinel"
    }

    fn supply(&self, _peer: &str, _operation: &str, _failure: &CallFailure) -> Result<T, ServiceError> {
        Ok((self.0)())
    }
}

/// Refuses to degrade: mutating calls fail with a typed error.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailLoudly;

impl<T> FallbackSupplier<T> for FailLoudly {
    fn label(&self) -> &'static str {
        "unavailable"
    }

    fn label_for(&self, failure: &CallFailure) -> &'static str {
        if failure.is_client_error() {
            "rejected"
        } else {
            "unavailable"
        }
    }

    fn supply(&self, peer: &str, operation: &str, failure: &CallFailure) -> Result<T, ServiceError> {
        match failure.status {
            Some(status) if failure.is_client_error() => Err(ServiceError::PeerRejected {
                peer: peer.to_string(),
                operation: operation.to_string(),
                status,
                errors: failure.errors.clone(),
            }),
            _ => Err(ServiceError::UpstreamUnavailable {
                peer: peer.to_string(),
                operation: operation.to_string(),
            }),
        }
    }
}

/// Resolve a call result, substituting the supplier's answer on failure.
pub fn with_fallback<T, S>(
    peer: &str,
    operation: &str,
    result: Result<T, CallFailure>,
    supplier: &S,
) -> Result<T, ServiceError>
where
    S: FallbackSupplier<T> + ?Sized,
{
    match result {
        Ok(value) => Ok(value),
        Err(failure) => {
            let label = supplier.label_for(&failure);
            tracing::warn!(
                peer = %peer,
                operation = %operation,
                kind = %failure.kind,
                status = ?failure.status,
                fallback = label,
                error = %failure,
                "Peer call failed, applying fallback"
            );
            metrics::record_fallback(peer, operation, label);
            supplier.supply(peer, operation, &failure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Named {
        name: String,
        degraded: bool,
    }

    fn unknown() -> Named {
        Named { name: "Unknown".into(), degraded: true }
    }

    #[test]
    fn test_success_passes_through() {
        let out = with_fallback("address-service", "list", Ok(vec![1, 2]), &EmptyCollection).unwrap();
        assert_eq!(out, vec![1, 2]);
    }

    #[test]
    fn test_empty_collection_is_idempotent() {
        let failure = CallFailure::circuit_open("address-service");
        for _ in 0..2 {
            let out: Vec<u32> =
                with_fallback("address-service", "list", Err(failure.clone()), &EmptyCollection).unwrap();
            assert!(out.is_empty());
        }
    }

    #[test]
    fn test_sentinel_is_marked() {
        let out = with_fallback(
            "user-service",
            "get_user",
            Err(CallFailure::timeout("slow")),
            &Sentinel(unknown),
        )
        .unwrap();
        assert!(out.degraded);
        assert_eq!(out, unknown());
    }

    #[test]
    fn test_writes_fail_loudly() {
        let err = with_fallback::<(), _>(
            "auth-service",
            "deactivate_account",
            Err(CallFailure::transport(Some(503), "down")),
            &FailLoudly,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::UpstreamUnavailable { ref peer, .. } if peer == "auth-service"));

        let err = with_fallback::<(), _>(
            "auth-service",
            "deactivate_account",
            Err(CallFailure::circuit_open("auth-service")),
            &FailLoudly,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::UpstreamUnavailable { .. }));
    }

    #[test]
    fn test_client_error_on_write_is_rejection() {
        let failure = CallFailure::transport(Some(422), "invalid")
            .with_errors(vec![serde_json::json!({"field": "zip", "message": "required"})]);
        assert_eq!(FallbackSupplier::<()>::label_for(&FailLoudly, &failure), "rejected");
        let err = with_fallback::<(), _>("address-service", "create", Err(failure), &FailLoudly).unwrap_err();
        match err {
            ServiceError::PeerRejected { status, errors, .. } => {
                assert_eq!(status, 422);
                assert_eq!(errors.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
