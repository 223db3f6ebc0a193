//! Circuit breaker for dependency protection.
//!
//! Wraps calls to an unreliable dependency, tracks recent outcomes in a
//! sliding window and decides per call whether to admit it, reject it,
//! or let it through as a recovery probe. See [`super::state`] for the
//! transition table.
//!
//! # Locking
//! All state-machine fields live behind one mutex per breaker. Lifetime
//! counters are independent atomics. Observers and fallbacks are invoked
//! after the mutex is released.

use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::resilience::clock::{Clock, SystemClock};
use crate::resilience::error::{BoxError, BreakerConfigError, BreakerError, Payload};
use crate::resilience::state::{State, Transition, TransitionObserver};
use crate::resilience::window::{Outcome, OutcomeWindow};

pub const DEFAULT_WINDOW_SIZE: usize = 20;
pub const DEFAULT_FAILURE_THRESHOLD: f64 = 0.5;
pub const DEFAULT_MIN_REQUESTS: usize = 5;
pub const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PROBE_COUNT: u32 = 3;

/// Substitute result for a call the open breaker rejected.
///
/// Receives the caller's cancellation token and the rejection. Whatever it
/// returns replaces the rejection entirely, error included.
pub type Fallback =
    Arc<dyn Fn(&CancellationToken, BreakerError) -> Result<Payload, BreakerError> + Send + Sync>;

/// Breaker configuration.
///
/// Zero values are replaced by defaults on construction; a failure
/// threshold outside (0, 1] is rejected.
#[derive(Clone)]
pub struct Config {
    /// Identifies the breaker in hooks and logs.
    pub name: String,

    /// Outcomes kept in the sliding window (default: 20).
    pub window_size: usize,

    /// Failure ratio that trips Closed → Open (default: 0.5).
    pub failure_threshold: f64,

    /// Outcomes required in the window before the breaker may trip (default: 5).
    pub min_requests: usize,

    /// Time spent Open before probes are admitted (default: 30s).
    pub recovery_timeout: Duration,

    /// Successful probes required to close from Half-Open (default: 3).
    pub probe_count: u32,

    /// Called instead of returning [`BreakerError::CircuitOpen`].
    pub fallback: Option<Fallback>,

    /// Notified of every state change.
    pub on_state_change: Option<Arc<dyn TransitionObserver>>,

    /// Time source for recovery timeouts.
    pub clock: Arc<dyn Clock>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: String::new(),
            window_size: DEFAULT_WINDOW_SIZE,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            min_requests: DEFAULT_MIN_REQUESTS,
            recovery_timeout: DEFAULT_RECOVERY_TIMEOUT,
            probe_count: DEFAULT_PROBE_COUNT,
            fallback: None,
            on_state_change: None,
            clock: Arc::new(SystemClock),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("name", &self.name)
            .field("window_size", &self.window_size)
            .field("failure_threshold", &self.failure_threshold)
            .field("min_requests", &self.min_requests)
            .field("recovery_timeout", &self.recovery_timeout)
            .field("probe_count", &self.probe_count)
            .field("fallback", &self.fallback.is_some())
            .field("on_state_change", &self.on_state_change.is_some())
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Apply default substitution and validate.
    pub fn validated(mut self) -> Result<Self, BreakerConfigError> {
        if self.window_size == 0 {
            self.window_size = DEFAULT_WINDOW_SIZE;
        }
        if self.failure_threshold.is_nan() || self.failure_threshold > 1.0 {
            return Err(BreakerConfigError::InvalidThreshold(self.failure_threshold));
        }
        if self.failure_threshold <= 0.0 {
            self.failure_threshold = DEFAULT_FAILURE_THRESHOLD;
        }
        if self.min_requests == 0 {
            self.min_requests = DEFAULT_MIN_REQUESTS;
        }
        if self.recovery_timeout.is_zero() {
            self.recovery_timeout = DEFAULT_RECOVERY_TIMEOUT;
        }
        if self.probe_count == 0 {
            self.probe_count = DEFAULT_PROBE_COUNT;
        }
        Ok(self)
    }
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerMetrics {
    pub total_requests: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub state: State,
    pub last_state_change: Instant,
    pub window_failure_rate: f64,
}

struct Inner {
    state: State,
    window: OutcomeWindow,
    opened_at: Instant,
    last_state_change: Instant,
    probe_successes: u32,
}

impl Inner {
    /// Move to `to`, applying its entry actions. Self-transitions are ignored.
    fn transition(&mut self, to: State, now: Instant) -> Option<Transition> {
        let from = self.state;
        if from == to {
            return None;
        }

        self.state = to;
        self.last_state_change = now;
        match to {
            State::Open => {
                self.opened_at = now;
                self.probe_successes = 0;
            }
            State::Closed => {
                self.window.reset();
                self.probe_successes = 0;
            }
            State::HalfOpen => {}
        }

        Some(Transition { from, to })
    }
}

/// Thread-safe circuit breaker.
pub struct CircuitBreaker {
    config: Config,
    inner: Mutex<Inner>,

    total_requests: AtomicU64,
    total_successes: AtomicU64,
    total_failures: AtomicU64,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.config.name)
            .field("state", &self.lock().state)
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    /// Create a breaker, failing fast on invalid configuration.
    pub fn new(config: Config) -> Result<Self, BreakerConfigError> {
        Ok(Self::from_validated(config.validated()?))
    }

    /// Build from a config that already went through [`Config::validated`].
    pub(crate) fn from_validated(config: Config) -> Self {
        let now = config.clock.now();

        Self {
            inner: Mutex::new(Inner {
                state: State::Closed,
                window: OutcomeWindow::new(config.window_size),
                opened_at: now,
                last_state_change: now,
                probe_successes: 0,
            }),
            config,
            total_requests: AtomicU64::new(0),
            total_successes: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Effective configuration, defaults applied.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `op` through the breaker.
    ///
    /// Rejected calls return [`BreakerError::CircuitOpen`], or the fallback's
    /// result when one is configured. An operation error observed while
    /// `cancel` is cancelled is returned as-is and left out of all
    /// bookkeeping.
    pub async fn execute<F, Fut>(
        &self,
        cancel: &CancellationToken,
        op: F,
    ) -> Result<Payload, BreakerError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<Payload, BoxError>>,
    {
        // Counted only once admission (and any recovery hook) is done, so a
        // panicking observer leaves the lifetime counters balanced.
        let admission = self.before_call();
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if let Err(rejection) = admission {
            // Rejections count as failures even when the caller is already cancelled.
            self.total_failures.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(breaker = %self.config.name, "Call rejected by open circuit");
            return match &self.config.fallback {
                Some(fallback) => fallback(cancel, rejection),
                None => Err(rejection),
            };
        }

        let result = op(cancel.clone()).await;

        if result.is_err() && cancel.is_cancelled() {
            tracing::debug!(breaker = %self.config.name, "Cancelled call excluded from window");
            return result.map_err(BreakerError::Operation);
        }

        let outcome = match result {
            Ok(_) => Outcome::Success,
            Err(_) => Outcome::Failure,
        };
        match outcome {
            Outcome::Success => self.total_successes.fetch_add(1, Ordering::Relaxed),
            Outcome::Failure => self.total_failures.fetch_add(1, Ordering::Relaxed),
        };
        self.after_call(outcome);

        result.map_err(BreakerError::Operation)
    }

    /// Typed variant of [`execute`](Self::execute).
    pub async fn call<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        op: F,
    ) -> Result<T, BreakerError>
    where
        T: Send + 'static,
        E: Into<BoxError>,
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let payload = self
            .execute(cancel, |token| async move {
                let result: Result<Payload, BoxError> = match op(token).await {
                    Ok(value) => Ok(Box::new(value)),
                    Err(e) => Err(e.into()),
                };
                result
            })
            .await?;

        payload
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| BreakerError::FallbackType {
                expected: type_name::<T>(),
            })
    }

    /// Current state, promoting Open to Half-Open once the recovery timeout has passed.
    pub fn state(&self) -> State {
        let (state, transition) = {
            let mut inner = self.lock();
            let transition = self.check_recovery(&mut inner);
            (inner.state, transition)
        };
        self.notify(transition);
        state
    }

    /// Snapshot of counters, state and window failure rate, read under the breaker lock.
    pub fn metrics(&self) -> BreakerMetrics {
        let (metrics, transition) = {
            let mut inner = self.lock();
            let transition = self.check_recovery(&mut inner);
            let metrics = BreakerMetrics {
                total_requests: self.total_requests.load(Ordering::Relaxed),
                total_successes: self.total_successes.load(Ordering::Relaxed),
                total_failures: self.total_failures.load(Ordering::Relaxed),
                state: inner.state,
                last_state_change: inner.last_state_change,
                window_failure_rate: inner.window.failure_rate(),
            };
            (metrics, transition)
        };
        self.notify(transition);
        metrics
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_recovery(&self, inner: &mut Inner) -> Option<Transition> {
        if inner.state != State::Open {
            return None;
        }
        let now = self.config.clock.now();
        if now.saturating_duration_since(inner.opened_at) >= self.config.recovery_timeout {
            inner.transition(State::HalfOpen, now)
        } else {
            None
        }
    }

    fn before_call(&self) -> Result<(), BreakerError> {
        let (admitted, transition) = {
            let mut inner = self.lock();
            match inner.state {
                State::Closed | State::HalfOpen => (true, None),
                State::Open => {
                    let transition = self.check_recovery(&mut inner);
                    // Admitted as a probe only if the timeout just moved us to Half-Open.
                    (inner.state == State::HalfOpen, transition)
                }
            }
        };
        self.notify(transition);

        if admitted {
            Ok(())
        } else {
            Err(BreakerError::CircuitOpen)
        }
    }

    fn after_call(&self, outcome: Outcome) {
        let transition = {
            let mut inner = self.lock();
            let now = self.config.clock.now();
            match inner.state {
                State::Closed => {
                    inner.window.record(outcome);
                    if inner.window.total() >= self.config.min_requests
                        && inner.window.failure_rate() >= self.config.failure_threshold
                    {
                        inner.transition(State::Open, now)
                    } else {
                        None
                    }
                }
                State::HalfOpen => match outcome {
                    Outcome::Failure => inner.transition(State::Open, now),
                    Outcome::Success => {
                        inner.probe_successes += 1;
                        if inner.probe_successes >= self.config.probe_count {
                            inner.transition(State::Closed, now)
                        } else {
                            None
                        }
                    }
                },
                // Another probe already re-opened the breaker; this outcome is stale.
                State::Open => None,
            }
        };
        self.notify(transition);
    }

    fn notify(&self, transition: Option<Transition>) {
        let Some(Transition { from, to }) = transition else {
            return;
        };
        if let Some(observer) = &self.config.on_state_change {
            observer.on_transition(&self.config.name, from, to);
        }
    }
}
