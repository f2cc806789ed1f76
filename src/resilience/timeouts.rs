//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap a single outbound attempt with its deadline
//! - Cancel the in-flight future on expiry (drops the connection)
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from transport errors
//! - A deadline only cancels its own attempt, never sibling calls

use std::future::Future;
use std::time::Duration;

use crate::resilience::failure::CallFailure;

/// Run `fut` under `duration`, reporting expiry as a timeout failure.
pub async fn with_timeout<T, F>(duration: Duration, fut: F) -> Result<T, CallFailure>
where
    F: Future<Output = Result<T, CallFailure>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(CallFailure::timeout(format!(
            "no response within {}ms",
            duration.as_millis()
        ))),
    }
}
