//! Retry logic.
//!
//! # Responsibilities
//! - Re-issue a failed call while its failure is retryable
//! - Bound the number of attempts per logical operation
//! - Suspend the task (not the worker thread) between attempts
//!
//! # Design Decisions
//! - Timeouts, connection errors and 5xx are retryable; 4xx never are
//! - The last failure is returned unchanged once attempts run out
//! - Each attempt is described by a `CallAttempt` that is logged, counted, then dropped

use std::future::Future;
use std::time::{Duration, Instant};

use crate::observability::metrics;
use crate::resilience::backoff::{delay_for, BackoffStrategy};
use crate::resilience::failure::{CallFailure, FailureKind};

/// Retry budget for one peer.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Outcome of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure(FailureKind),
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Failure(kind) => kind.as_str(),
        }
    }
}

/// One outbound request attempt. Request-local, never persisted.
#[derive(Debug, Clone)]
pub struct CallAttempt<'a> {
    pub peer: &'a str,
    pub operation: &'a str,
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

impl CallAttempt<'_> {
    fn record(&self) {
        tracing::debug!(
            peer = %self.peer,
            operation = %self.operation,
            attempt = self.attempt,
            outcome = self.outcome.as_str(),
            elapsed_ms = self.elapsed.as_millis() as u64,
            "Peer call attempt finished"
        );
        metrics::record_peer_attempt(self.peer, self.operation, self.outcome.as_str(), self.elapsed);
    }
}

impl RetryPolicy {
    /// Invoke `call` until it succeeds, fails non-retryably, or the budget is spent.
    ///
    /// `call` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(
        &self,
        peer: &str,
        operation: &str,
        mut call: F,
    ) -> Result<T, CallFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, CallFailure>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let started = Instant::now();
            let result = call(attempt).await;

            let outcome = match &result {
                Ok(_) => AttemptOutcome::Success,
                Err(failure) => AttemptOutcome::Failure(failure.kind),
            };
            CallAttempt {
                peer,
                operation,
                attempt,
                outcome,
                elapsed: started.elapsed(),
            }
            .record();

            let failure = match result {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            if attempt >= max_attempts || !failure.is_retryable() {
                return Err(failure);
            }

            let delay = delay_for(self.backoff, attempt, self.base_delay_ms, self.max_delay_ms);
            tracing::info!(
                peer = %peer,
                operation = %operation,
                attempt,
                delay = ?delay,
                error = %failure,
                "Retrying peer call"
            );
            metrics::record_retry(peer, operation);
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: BackoffStrategy::Fixed,
            base_delay_ms: 10,
            max_delay_ms: 10,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_never_exceed_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy(3)
            .run("user-service", "get_user", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CallFailure::transport(Some(503), "unavailable")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err().status, Some(503));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_failure_matches_last_attempt() {
        // timeout, timeout, then connection refused
        let result: Result<(), _> = policy(3)
            .run("address-service", "list", |attempt| async move {
                if attempt < 3 {
                    Err(CallFailure::timeout("slow"))
                } else {
                    Err(CallFailure::transport(None, "connection refused"))
                }
            })
            .await;

        let failure = result.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Transport);
        assert_eq!(failure.message, "connection refused");
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy(5)
            .run("user-service", "get_user", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CallFailure::transport(Some(400), "validation")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().status, Some(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let value = policy(3)
            .run("schedule-service", "list", |attempt| async move {
                if attempt == 1 {
                    Err(CallFailure::timeout("slow"))
                } else {
                    Ok(attempt)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_still_calls_once() {
        let calls = AtomicU32::new(0);
        let _: Result<(), _> = policy(0)
            .run("auth-service", "deactivate", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CallFailure::timeout("slow")) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
