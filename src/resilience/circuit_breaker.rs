//! Circuit breaker for peer service protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: peer assumed down, calls fail fast
//! - Half-Open: a bounded number of trial calls test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: window full AND failure rate >= threshold
//! Open → Half-Open: after open_state_duration (checked on next acquire)
//! Half-Open → Closed: every trial call succeeded
//! Half-Open → Open: any trial call failed (open timestamp reset)
//! ```
//!
//! # Design Decisions
//! - One breaker per peer service, never global
//! - All read-then-write on state happens under a single mutex
//! - Every transition bumps a generation; outcomes from older permits are dropped
//! - Trial slots are handed out as RAII permits so a cancelled caller frees its slot

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::resilience::failure::CallFailure;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Thresholds for one breaker.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerSettings {
    /// Number of most recent outcomes considered.
    pub window_size: usize,
    /// Failure percentage (0-100] that opens the circuit.
    pub failure_rate_threshold: f64,
    pub open_state_duration: Duration,
    pub half_open_trial_count: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            window_size: 10,
            failure_rate_threshold: 50.0,
            open_state_duration: Duration::from_secs(30),
            half_open_trial_count: 1,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    generation: u64,
    /// `true` marks a failure.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    trials_issued: u32,
    trial_successes: u32,
}

/// Point-in-time view of a breaker, for admin inspection.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    pub peer: String,
    pub state: CircuitState,
    pub window_len: usize,
    pub failures_in_window: usize,
    pub open_for_ms: Option<u64>,
}

/// Circuit breaker guarding one peer service.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    settings: CircuitBreakerSettings,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: CircuitBreakerSettings) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                generation: 0,
                window: VecDeque::with_capacity(settings.window_size),
                opened_at: None,
                trials_issued: 0,
                trial_successes: 0,
            }),
            settings,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &CircuitBreakerSettings {
        &self.settings
    }

    /// Last recorded state. Open → Half-Open happens lazily on `try_acquire`.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Ask permission to call the peer.
    ///
    /// Fails with `CircuitOpen` while open, or while half-open with all trial slots taken.
    pub fn try_acquire(self: &Arc<Self>) -> Result<CallPermit, CallFailure> {
        let mut inner = self.lock();
        let now = Instant::now();

        if inner.state == CircuitState::Open {
            let cooled_down = inner.opened_at.map_or(true, |opened| {
                now.duration_since(opened) >= self.settings.open_state_duration
            });
            if cooled_down {
                self.transition(&mut inner, CircuitState::HalfOpen, now);
            }
        }

        let trial = match inner.state {
            CircuitState::Closed => false,
            CircuitState::Open => return Err(CallFailure::circuit_open(&self.name)),
            CircuitState::HalfOpen => {
                if inner.trials_issued >= self.settings.half_open_trial_count {
                    return Err(CallFailure::circuit_open(&self.name));
                }
                inner.trials_issued += 1;
                true
            }
        };

        Ok(CallPermit {
            breaker: Arc::clone(self),
            generation: inner.generation,
            trial,
            settled: false,
        })
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        let open_for_ms = match inner.state {
            CircuitState::Open => inner
                .opened_at
                .map(|opened| opened.elapsed().as_millis() as u64),
            _ => None,
        };
        CircuitSnapshot {
            peer: self.name.clone(),
            state: inner.state,
            window_len: inner.window.len(),
            failures_in_window: inner.window.iter().filter(|failed| **failed).count(),
            open_for_ms,
        }
    }

    fn on_outcome(&self, generation: u64, failed: bool) {
        let mut inner = self.lock();
        if inner.generation != generation {
            // permit issued before the last transition
            return;
        }
        let now = Instant::now();

        match inner.state {
            CircuitState::Closed => {
                inner.window.push_back(failed);
                while inner.window.len() > self.settings.window_size {
                    inner.window.pop_front();
                }
                if inner.window.len() >= self.settings.window_size {
                    let failures = inner.window.iter().filter(|f| **f).count();
                    let rate = failures as f64 * 100.0 / inner.window.len() as f64;
                    if rate >= self.settings.failure_rate_threshold {
                        tracing::warn!(
                            peer = %self.name,
                            failure_rate = rate,
                            threshold = self.settings.failure_rate_threshold,
                            "Failure rate threshold crossed"
                        );
                        self.transition(&mut inner, CircuitState::Open, now);
                    }
                }
            }
            CircuitState::HalfOpen => {
                if failed {
                    self.transition(&mut inner, CircuitState::Open, now);
                } else {
                    inner.trial_successes += 1;
                    if inner.trial_successes >= self.settings.half_open_trial_count {
                        self.transition(&mut inner, CircuitState::Closed, now);
                    }
                }
            }
            CircuitState::Open => {}
        }
    }

    fn release(&self, generation: u64, trial: bool) {
        let mut inner = self.lock();
        if trial && inner.generation == generation && inner.state == CircuitState::HalfOpen {
            inner.trials_issued = inner.trials_issued.saturating_sub(1);
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState, now: Instant) {
        let from = inner.state;
        inner.state = to;
        inner.generation += 1;
        inner.trials_issued = 0;
        inner.trial_successes = 0;

        match to {
            CircuitState::Open => inner.opened_at = Some(now),
            CircuitState::HalfOpen => {}
            CircuitState::Closed => {
                inner.opened_at = None;
                inner.window.clear();
            }
        }

        tracing::warn!(
            peer = %self.name,
            from = from.as_str(),
            to = to.as_str(),
            "Circuit state changed"
        );
        metrics::record_circuit_state(&self.name, to);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // no panics happen while the guard is held, so a poisoned lock is still consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Permission to make one logical call.
///
/// Dropping an unsettled permit gives back its half-open trial slot.
#[derive(Debug)]
pub struct CallPermit {
    breaker: Arc<CircuitBreaker>,
    generation: u64,
    trial: bool,
    settled: bool,
}

impl CallPermit {
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_outcome(self.generation, false);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_outcome(self.generation, true);
    }

    /// Fold a call result into the breaker.
    pub fn record<T>(self, result: &Result<T, CallFailure>) {
        match result {
            Err(failure) if failure.counts_against_peer() => self.record_failure(),
            _ => self.record_success(),
        }
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release(self.generation, self.trial);
        }
    }
}
