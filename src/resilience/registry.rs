//! Per-peer circuit breaker registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::observability::metrics;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerSettings, CircuitSnapshot, CircuitState};

/// Peer name → breaker. Built once at startup and passed to whoever issues calls.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    breakers: HashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new<'a, I>(peers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, CircuitBreakerSettings)>,
    {
        let breakers = peers
            .into_iter()
            .map(|(name, settings)| {
                // every peer exports a state series from startup, not from its first transition
                metrics::record_circuit_state(name, CircuitState::Closed);
                (name.to_string(), Arc::new(CircuitBreaker::new(name, settings)))
            })
            .collect();
        Self { breakers }
    }

    pub fn get(&self, peer: &str) -> Option<&Arc<CircuitBreaker>> {
        self.breakers.get(peer)
    }

    /// Snapshots of every breaker, sorted by peer name.
    pub fn snapshot(&self) -> Vec<CircuitSnapshot> {
        let mut snapshots: Vec<_> = self.breakers.values().map(|b| b.snapshot()).collect();
        snapshots.sort_by(|a, b| a.peer.cmp(&b.peer));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakers_are_independent() {
        let registry = CircuitBreakerRegistry::new([
            ("user-service", CircuitBreakerSettings { window_size: 1, ..Default::default() }),
            ("address-service", CircuitBreakerSettings::default()),
        ]);
        assert_eq!(registry.len(), 2);

        let user = registry.get("user-service").unwrap();
        user.try_acquire().unwrap().record_failure();

        assert_eq!(user.state(), CircuitState::Open);
        assert_eq!(registry.get("address-service").unwrap().state(), CircuitState::Closed);
        assert!(registry.get("billing-service").is_none());

        let peers: Vec<_> = registry.snapshot().into_iter().map(|s| s.peer).collect();
        assert_eq!(peers, vec!["address-service", "user-service"]);
    }

    mod gauge_capture {
        use metrics::{Counter, Gauge, GaugeFn, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
        use std::sync::{Arc, Mutex};

        pub type Captured = Arc<Mutex<Vec<(String, String, f64)>>>;

        /// Records every gauge `set` as (name, peer label, value).
        #[derive(Default)]
        pub struct GaugeCapture {
            pub values: Captured,
        }

        struct Slot {
            name: String,
            peer: String,
            values: Captured,
        }

        impl GaugeFn for Slot {
            fn increment(&self, _value: f64) {}
            fn decrement(&self, _value: f64) {}
            fn set(&self, value: f64) {
                self.values
                    .lock()
                    .unwrap()
                    .push((self.name.clone(), self.peer.clone(), value));
            }
        }

        impl Recorder for GaugeCapture {
            fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
            fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
            fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

            fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
                Counter::noop()
            }

            fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
                let peer = key
                    .labels()
                    .find(|label| label.key() == "peer")
                    .map(|label| label.value().to_string())
                    .unwrap_or_default();
                Gauge::from_arc(Arc::new(Slot {
                    name: key.name().to_string(),
                    peer,
                    values: self.values.clone(),
                }))
            }

            fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
                Histogram::noop()
            }
        }
    }

    #[test]
    fn test_closed_state_is_exported_at_startup() {
        let capture = gauge_capture::GaugeCapture::default();
        ::metrics::with_local_recorder(&capture, || {
            CircuitBreakerRegistry::new([
                ("user-service", CircuitBreakerSettings::default()),
                ("schedule-service", CircuitBreakerSettings::default()),
            ])
        });

        let mut values = capture.values.lock().unwrap().clone();
        values.sort_by(|a, b| a.1.cmp(&b.1));
        assert_eq!(
            values,
            vec![
                ("peer_circuit_state".to_string(), "schedule-service".to_string(), 0.0),
                ("peer_circuit_state".to_string(), "user-service".to_string(), 0.0),
            ]
        );
    }
}
