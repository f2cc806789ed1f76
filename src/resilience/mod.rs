//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Logical call to a peer:
//!     → circuit_breaker.rs (gate: fail fast with CircuitOpen when open)
//!     → retries.rs (re-issue retryable failures with backoff)
//!         → timeouts.rs (deadline around each single attempt)
//!     → circuit_breaker.rs (fold the final outcome into the window)
//!     → fallback.rs (caller picks: empty list, sentinel, or fail loudly)
//! ```
//!
//! # Design Decisions
//! - Fixed composition order, expressed as plain function wrapping
//! - One breaker per peer, held in an explicit registry (no globals)
//! - The breaker sees one outcome per logical call, after retries
//! - Callers never see a raw transport error; fallbacks decide what surfaces

pub mod backoff;
pub mod circuit_breaker;
pub mod failure;
pub mod fallback;
pub mod registry;
pub mod retries;
pub mod timeouts;

use std::future::Future;
use std::sync::Arc;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerSettings, CircuitSnapshot, CircuitState};
pub use failure::{CallFailure, FailureKind};
pub use fallback::{with_fallback, EmptyCollection, FailLoudly, FallbackSupplier, Sentinel};
pub use registry::CircuitBreakerRegistry;
pub use retries::RetryPolicy;

use crate::observability::metrics;

/// Run `call` behind `breaker` and `retry`.
///
/// `call` gets the attempt number and is expected to apply its own per-attempt
/// timeout (see [`timeouts::with_timeout`]).
pub async fn with_resilience<T, F, Fut>(
    breaker: &Arc<CircuitBreaker>,
    retry: &RetryPolicy,
    peer: &str,
    operation: &str,
    call: F,
) -> Result<T, CallFailure>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, CallFailure>>,
{
    let permit = match breaker.try_acquire() {
        Ok(permit) => permit,
        Err(rejected) => {
            tracing::debug!(peer = %peer, operation = %operation, "Circuit open, short-circuiting call");
            metrics::record_short_circuit(peer, operation);
            return Err(rejected);
        }
    };

    let result = retry.run(peer, operation, call).await;
    permit.record(&result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoff::BackoffStrategy;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            backoff: BackoffStrategy::Fixed,
            base_delay_ms: 5,
            max_delay_ms: 5,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_breaker_skips_the_call() {
        let breaker = Arc::new(CircuitBreaker::new(
            "user-service",
            CircuitBreakerSettings {
                window_size: 2,
                failure_rate_threshold: 50.0,
                open_state_duration: Duration::from_secs(10),
                half_open_trial_count: 1,
            },
        ));
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let result: Result<(), _> = with_resilience(&breaker, &retry(), "user-service", "get_user", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CallFailure::timeout("slow")) }
            })
            .await;
            assert_eq!(result.unwrap_err().kind, FailureKind::Timeout);
        }
        // two logical calls, two attempts each
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(breaker.state(), CircuitState::Open);

        let result: Result<(), _> = with_resilience(&breaker, &retry(), "user-service", "get_user", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;
        assert_eq!(result.unwrap_err().kind, FailureKind::CircuitOpen);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_breaker_outcome_per_logical_call() {
        let breaker = Arc::new(CircuitBreaker::new("address-service", CircuitBreakerSettings::default()));
        let _: Result<(), _> = with_resilience(&breaker, &retry(), "address-service", "list", |_| async {
            Err(CallFailure::transport(Some(502), "bad gateway"))
        })
        .await;
        assert_eq!(breaker.snapshot().window_len, 1);
        assert_eq!(breaker.snapshot().failures_in_window, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_request_failures_spare_the_peer() {
        let breaker = Arc::new(CircuitBreaker::new(
            "schedule-service",
            CircuitBreakerSettings {
                window_size: 2,
                ..Default::default()
            },
        ));
        let calls = AtomicU32::new(0);

        for _ in 0..4 {
            let result: Result<(), _> = with_resilience(&breaker, &retry(), "schedule-service", "list", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CallFailure::request("invalid path 'http://['")) }
            })
            .await;
            assert_eq!(result.unwrap_err().kind, FailureKind::Request);
        }
        // one attempt per call, and the breaker never sees a failure
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.snapshot().failures_in_window, 0);
    }
}
