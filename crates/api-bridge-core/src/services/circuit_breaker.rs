//! Per-endpoint circuit breakers: a three-state machine (Closed/Open/
//! HalfOpen) guarding every outbound call the Executor makes.
//!
//! Atomic state plus a `RwLock<Option<Instant>>` for the last transition,
//! with three refinements over a single hardcoded breaker:
//! - a **registry** keyed by scope name instead of one breaker per route,
//! - an injected **policy object** (`TripPolicy`) in place of a hardcoded
//!   `failure_threshold` field,
//! - a periodic **interval reset** of the Closed-state counters, checked
//!   lazily on the hot path rather than via a background task.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// The breaker's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
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

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            _ => CircuitState::HalfOpen,
        }
    }
}

/// A snapshot of the counters a [`TripPolicy`] bases its trip decision on.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counts {
    pub consecutive_failures: u64,
    pub consecutive_successes: u64,
    pub total_failures: u64,
    pub total_successes: u64,
}

/// A breaker is constructed with a policy object deciding when
/// Closed-state failures should trip the circuit, with a hook for
/// observing every transition.
pub trait TripPolicy: Send + Sync {
    fn ready_to_trip(&self, counts: &Counts) -> bool;

    /// Called after every state transition. Default is a no-op; compose
    /// with [`MetricsTripPolicy`] to also emit `circuit_breaker_state_change`.
    fn on_state_change(&self, _name: &str, _from: CircuitState, _to: CircuitState) {}
}

/// The default policy: trip after `threshold` consecutive Closed-state
/// failures (default: 5).
pub struct ConsecutiveFailureTripPolicy {
    pub threshold: u64,
}

impl Default for ConsecutiveFailureTripPolicy {
    fn default() -> Self {
        Self { threshold: 5 }
    }
}

impl TripPolicy for ConsecutiveFailureTripPolicy {
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        counts.consecutive_failures >= self.threshold
    }

    fn on_state_change(&self, name: &str, from: CircuitState, to: CircuitState) {
        match to {
            CircuitState::Open => warn!("circuit breaker '{}' opened ({:?} -> Open)", name, from),
            CircuitState::HalfOpen => info!("circuit breaker '{}' half-opened for probing", name),
            CircuitState::Closed => info!("circuit breaker '{}' closed, service recovered", name),
        }
    }
}

/// Decorates a [`TripPolicy`] so every transition also records the
/// `circuit_breaker_state_change{name,from,to}` metric, keeping the trip
/// decision and the observability concern composable rather than baked
/// into the breaker itself.
pub struct MetricsTripPolicy<P: TripPolicy> {
    inner: P,
    metrics: Arc<crate::services::metrics::MetricsCollector>,
}

impl<P: TripPolicy> MetricsTripPolicy<P> {
    pub fn new(inner: P, metrics: Arc<crate::services::metrics::MetricsCollector>) -> Self {
        Self { inner, metrics }
    }
}

impl<P: TripPolicy> TripPolicy for MetricsTripPolicy<P> {
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        self.inner.ready_to_trip(counts)
    }

    fn on_state_change(&self, name: &str, from: CircuitState, to: CircuitState) {
        self.inner.on_state_change(name, from, to);
        self.metrics
            .record_circuit_breaker_state_change(name, from.as_str(), to.as_str());
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Probes allowed through while HalfOpen before the next failure opens
    /// the circuit or enough successes close it (default: 3).
    pub max_requests: u64,
    /// How long a Closed-state breaker keeps its counters before resetting
    /// them (default: 10s).
    pub interval: Duration,
    /// How long an Open breaker waits before allowing a HalfOpen probe
    /// (default: 30s).
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_requests: 3,
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Error produced by [`CircuitBreaker::call`]: either the circuit was open
/// and the wrapped operation never ran, or it ran and failed.
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker is open")]
    Open,
    #[error("operation failed: {0}")]
    Failed(E),
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    policy: Arc<dyn TripPolicy>,
    state: AtomicU8,
    consecutive_failures: AtomicU64,
    consecutive_successes: AtomicU64,
    total_failures: AtomicU64,
    total_successes: AtomicU64,
    half_open_attempts: AtomicU64,
    last_transition: RwLock<Instant>,
    last_reset: RwLock<Instant>,
}

impl CircuitBreaker {
    pub fn new(name: String, config: CircuitBreakerConfig, policy: Arc<dyn TripPolicy>) -> Arc<Self> {
        let now = Instant::now();
        Arc::new(Self {
            name,
            config,
            policy,
            state: AtomicU8::new(CircuitState::Closed as u8),
            consecutive_failures: AtomicU64::new(0),
            consecutive_successes: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            total_successes: AtomicU64::new(0),
            half_open_attempts: AtomicU64::new(0),
            last_transition: RwLock::new(now),
            last_reset: RwLock::new(now),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    fn counts(&self) -> Counts {
        Counts {
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            consecutive_successes: self.consecutive_successes.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            total_successes: self.total_successes.load(Ordering::Relaxed),
        }
    }

    /// Executes `operation` under the breaker's protection. If the circuit
    /// is Open (and the reset timeout hasn't elapsed) the operation never
    /// runs and [`CircuitBreakerError::Open`] is returned immediately.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        self.maybe_reset_interval().await;

        if !self.admit().await {
            debug!("circuit breaker '{}' is open, failing fast", self.name);
            return Err(CircuitBreakerError::Open);
        }

        match operation.await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(err) => {
                self.on_failure().await;
                Err(CircuitBreakerError::Failed(err))
            }
        }
    }

    /// Returns `true` if a call is allowed to proceed, performing the
    /// Open -> HalfOpen transition as a side effect when the reset timeout
    /// has elapsed.
    async fn admit(&self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                let attempt = self.half_open_attempts.fetch_add(1, Ordering::AcqRel) + 1;
                attempt <= self.config.max_requests
            }
            CircuitState::Open => {
                let elapsed = self.last_transition.read().await.elapsed();
                if elapsed >= self.config.timeout {
                    self.transition(CircuitState::Open, CircuitState::HalfOpen).await;
                    let attempt = self.half_open_attempts.fetch_add(1, Ordering::AcqRel) + 1;
                    attempt <= self.config.max_requests
                } else {
                    false
                }
            }
        }
    }

    async fn on_success(&self) {
        match self.state() {
            CircuitState::Closed => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                self.consecutive_successes.fetch_add(1, Ordering::Relaxed);
                self.total_successes.fetch_add(1, Ordering::Relaxed);
            }
            CircuitState::HalfOpen => {
                self.total_successes.fetch_add(1, Ordering::Relaxed);
                let successes = self.consecutive_successes.fetch_add(1, Ordering::AcqRel) + 1;
                if successes >= self.config.max_requests {
                    self.transition(CircuitState::HalfOpen, CircuitState::Closed).await;
                }
            }
            CircuitState::Open => {}
        }
    }

    async fn on_failure(&self) {
        match self.state() {
            CircuitState::Closed => {
                self.total_failures.fetch_add(1, Ordering::Relaxed);
                self.consecutive_successes.store(0, Ordering::Relaxed);
                self.consecutive_failures.fetch_add(1, Ordering::AcqRel);
                let counts = self.counts();
                if self.policy.ready_to_trip(&counts) {
                    self.transition(CircuitState::Closed, CircuitState::Open).await;
                }
            }
            CircuitState::HalfOpen => {
                self.total_failures.fetch_add(1, Ordering::Relaxed);
                self.transition(CircuitState::HalfOpen, CircuitState::Open).await;
            }
            CircuitState::Open => {}
        }
    }

    async fn transition(&self, from: CircuitState, to: CircuitState) {
        // A concurrent caller may have already made this transition; only
        // the winner of the compare-exchange resets counters and notifies.
        if self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.consecutive_successes.store(0, Ordering::Relaxed);
        self.half_open_attempts.store(0, Ordering::Relaxed);
        *self.last_transition.write().await = Instant::now();
        self.policy.on_state_change(&self.name, from, to);
    }

    /// In Closed state, resets the rolling counters every `interval` so a
    /// handful of failures long ago don't linger toward tripping the
    /// circuit. Checked lazily rather than via a background task.
    async fn maybe_reset_interval(&self) {
        if self.state() != CircuitState::Closed {
            return;
        }
        let elapsed = self.last_reset.read().await.elapsed();
        if elapsed >= self.config.interval {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            self.consecutive_successes.store(0, Ordering::Relaxed);
            *self.last_reset.write().await = Instant::now();
        }
    }
}

/// Thread-safe registry of breakers keyed by scope name (typically an
/// endpoint's base URL). A `get_or_create` lookup is the common path;
/// the map itself is guarded by an `RwLock`, the individual breakers are
/// internally lock-free on their counters.
pub struct CircuitBreakerRegistry {
    breakers: RwLock<std::collections::HashMap<String, Arc<CircuitBreaker>>>,
    config: CircuitBreakerConfig,
    metrics: Arc<crate::services::metrics::MetricsCollector>,
}

impl CircuitBreakerRegistry {
    pub fn new(
        config: CircuitBreakerConfig,
        metrics: Arc<crate::services::metrics::MetricsCollector>,
    ) -> Self {
        Self {
            breakers: RwLock::new(std::collections::HashMap::new()),
            config,
            metrics,
        }
    }

    fn new_breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        let policy = Arc::new(MetricsTripPolicy::new(
            ConsecutiveFailureTripPolicy::default(),
            self.metrics.clone(),
        ));
        CircuitBreaker::new(name.to_string(), self.config.clone(), policy)
    }

    pub async fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().await.get(name) {
            return existing.clone();
        }
        let mut breakers = self.breakers.write().await;
        // Re-check: another writer may have created it while we waited.
        if let Some(existing) = breakers.get(name) {
            return existing.clone();
        }
        let breaker = self.new_breaker(name);
        breakers.insert(name.to_string(), breaker.clone());
        breaker
    }

    /// Re-creates the named breaker with zeroed counters, as if it had
    /// never seen a request.
    pub async fn reset(&self, name: &str) {
        let mut breakers = self.breakers.write().await;
        if breakers.contains_key(name) {
            breakers.insert(name.to_string(), self.new_breaker(name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysTrip;
    impl TripPolicy for AlwaysTrip {
        fn ready_to_trip(&self, counts: &Counts) -> bool {
            counts.consecutive_failures >= 1
        }
    }

    #[tokio::test]
    async fn opens_after_policy_trips_and_short_circuits() {
        let breaker = CircuitBreaker::new(
            "svc".to_string(),
            CircuitBreakerConfig::default(),
            Arc::new(AlwaysTrip),
        );

        let _ = breaker.call(async { Err::<(), _>("boom") }).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        let result = breaker.call(async { Ok::<_, &str>("never runs") }).await;
        assert!(matches!(result, Err(CircuitBreakerError::Open)));
    }

    #[tokio::test]
    async fn half_open_closes_after_enough_successes() {
        let config = CircuitBreakerConfig {
            max_requests: 2,
            interval: Duration::from_secs(10),
            timeout: Duration::from_millis(10),
        };
        let breaker = CircuitBreaker::new("svc".to_string(), config, Arc::new(AlwaysTrip));

        let _ = breaker.call(async { Err::<(), _>("boom") }).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(20)).await;

        let _ = breaker.call(async { Ok::<_, &str>("probe 1") }).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        let _ = breaker.call(async { Ok::<_, &str>("probe 2") }).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let config = CircuitBreakerConfig {
            max_requests: 3,
            interval: Duration::from_secs(10),
            timeout: Duration::from_millis(10),
        };
        let breaker = CircuitBreaker::new("svc".to_string(), config, Arc::new(AlwaysTrip));
        let _ = breaker.call(async { Err::<(), _>("boom") }).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = breaker.call(async { Err::<(), _>("still broken") }).await;
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn registry_reuses_breaker_per_name() {
        let registry = CircuitBreakerRegistry::new(
            CircuitBreakerConfig::default(),
            Arc::new(crate::services::metrics::MetricsCollector::default()),
        );
        let a = registry.get_or_create("http://legacy").await;
        let b = registry.get_or_create("http://legacy").await;
        assert!(Arc::ptr_eq(&a, &b));
    }
}
