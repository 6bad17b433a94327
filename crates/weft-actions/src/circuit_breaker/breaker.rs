//! Circuit breaker state machine.
//!
//! CLOSED lets calls through and counts failures. Reaching `maxFailures`
//! opens the circuit: calls are rejected until `resetTimeout` has passed,
//! then a single trial call is let through (HALF_OPEN). The trial closes the
//! circuit on success and re-opens it on failure.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};
use weft_config::CircuitBreakerOptions;
use weft_fragment::ActionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
  Closed,
  Open,
  HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
  state: CircuitState,
  failures: u32,
  opened_at: Option<Instant>,
  trial_in_flight: bool,
}

#[derive(Debug)]
pub struct CircuitBreaker {
  name: String,
  options: CircuitBreakerOptions,
  state: Mutex<BreakerState>,
}

impl CircuitBreaker {
  pub fn new(name: impl Into<String>, options: CircuitBreakerOptions) -> Self {
    Self {
      name: name.into(),
      options,
      state: Mutex::new(BreakerState {
        state: CircuitState::Closed,
        failures: 0,
        opened_at: None,
        trial_in_flight: false,
      }),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn state(&self) -> CircuitState {
    let mut state = self.lock();
    self.refresh(&mut state);
    state.state
  }

  /// Failures counted since the circuit last closed.
  pub fn failures(&self) -> u32 {
    self.lock().failures
  }

  /// Run `command` under the breaker.
  ///
  /// Each attempt is bounded by the configured timeout and a failed attempt
  /// is retried up to `maxRetries` times. A timed-out attempt is dropped, so
  /// whatever it would have produced is discarded. Fatal errors are returned
  /// at once without retrying.
  pub async fn execute<F, Fut, T>(&self, mut command: F) -> Result<T, ActionError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ActionError>>,
  {
    let Some(permit) = self.try_acquire() else {
      debug!(circuit = %self.name, "circuit_rejected");
      return Err(ActionError::CircuitOpen {
        name: self.name.clone(),
      });
    };

    let timeout = Duration::from_millis(self.options.timeout);
    let mut last_error = None;
    for attempt in 0..=self.options.max_retries {
      let error = match tokio::time::timeout(timeout, command()).await {
        Ok(Ok(value)) => {
          permit.success();
          return Ok(value);
        }
        Ok(Err(e)) => e,
        Err(_) => ActionError::Timeout {
          alias: self.name.clone(),
          timeout_ms: self.options.timeout,
        },
      };
      debug!(circuit = %self.name, attempt, error = %error, "circuit_attempt_failed");
      if error.is_fatal() {
        permit.failure();
        return Err(error);
      }
      last_error = Some(error);
    }

    permit.failure();
    Err(last_error.unwrap_or(ActionError::CircuitOpen {
      name: self.name.clone(),
    }))
  }

  fn lock(&self) -> MutexGuard<'_, BreakerState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn refresh(&self, state: &mut BreakerState) {
    if state.state != CircuitState::Open {
      return;
    }
    let reset = Duration::from_millis(self.options.reset_timeout);
    if state.opened_at.is_some_and(|opened| opened.elapsed() >= reset) {
      state.state = CircuitState::HalfOpen;
      state.trial_in_flight = false;
    }
  }

  fn try_acquire(&self) -> Option<Permit<'_>> {
    let mut state = self.lock();
    self.refresh(&mut state);
    let trial = match state.state {
      CircuitState::Closed => false,
      CircuitState::Open => return None,
      CircuitState::HalfOpen if state.trial_in_flight => return None,
      CircuitState::HalfOpen => {
        state.trial_in_flight = true;
        true
      }
    };
    Some(Permit {
      breaker: self,
      trial,
      settled: false,
    })
  }

  fn on_success(&self) {
    let mut state = self.lock();
    if state.state != CircuitState::Closed {
      debug!(circuit = %self.name, "circuit_closed");
    }
    state.state = CircuitState::Closed;
    state.failures = 0;
    state.opened_at = None;
    state.trial_in_flight = false;
  }

  fn on_failure(&self) {
    let mut state = self.lock();
    state.failures += 1;
    state.trial_in_flight = false;
    if state.state == CircuitState::HalfOpen || state.failures >= self.options.max_failures {
      warn!(circuit = %self.name, failures = state.failures, "circuit_opened");
      state.state = CircuitState::Open;
      state.opened_at = Some(Instant::now());
    }
  }
}

/// Admission to one call. A half-open trial that is dropped before it settles
/// counts as a failed trial, so the circuit re-opens instead of waiting on a
/// trial that will never report back.
struct Permit<'a> {
  breaker: &'a CircuitBreaker,
  trial: bool,
  settled: bool,
}

impl Permit<'_> {
  fn success(mut self) {
    self.settled = true;
    self.breaker.on_success();
  }

  fn failure(mut self) {
    self.settled = true;
    self.breaker.on_failure();
  }
}

impl Drop for Permit<'_> {
  fn drop(&mut self) {
    if self.trial && !self.settled {
      warn!(circuit = %self.breaker.name, "circuit_trial_abandoned");
      self.breaker.on_failure();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  fn options(max_failures: u32, max_retries: u32) -> CircuitBreakerOptions {
    CircuitBreakerOptions {
      timeout: 100,
      max_failures,
      reset_timeout: 1_000,
      max_retries,
    }
  }

  async fn fail(breaker: &CircuitBreaker) -> Result<(), ActionError> {
    breaker
      .execute(|| async { Err::<(), _>(ActionError::failed("a", "boom")) })
      .await
  }

  #[tokio::test]
  async fn test_success_keeps_circuit_closed() {
    let breaker = CircuitBreaker::new("cb", options(2, 0));
    let value = breaker.execute(|| async { Ok(7) }).await.unwrap();
    assert_eq!(value, 7);
    assert_eq!(breaker.state(), CircuitState::Closed);
  }

  #[tokio::test(start_paused = true)]
  async fn test_timeout_is_reported() {
    let breaker = CircuitBreaker::new("slow", options(5, 0));
    let err = breaker
      .execute(|| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(())
      })
      .await
      .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(breaker.failures(), 1);
  }

  #[tokio::test]
  async fn test_retries_until_success() {
    let breaker = CircuitBreaker::new("cb", options(5, 2));
    let attempts = AtomicU32::new(0);
    let value = breaker
      .execute(|| {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
        async move {
          if attempt < 2 {
            Err(ActionError::failed("a", "flaky"))
          } else {
            Ok(attempt)
          }
        }
      })
      .await
      .unwrap();
    assert_eq!(value, 2);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(breaker.failures(), 0);
  }

  #[tokio::test]
  async fn test_fatal_errors_are_not_retried() {
    let breaker = CircuitBreaker::new("cb", options(5, 3));
    let attempts = AtomicU32::new(0);
    let err = breaker
      .execute(|| {
        attempts.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(ActionError::fatal("a", "dispatch")) }
      })
      .await
      .unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_opens_after_max_failures_and_recovers() {
    let breaker = CircuitBreaker::new("cb", options(2, 0));
    assert!(fail(&breaker).await.is_err());
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert!(fail(&breaker).await.is_err());
    assert_eq!(breaker.state(), CircuitState::Open);

    let calls = AtomicU32::new(0);
    let err = breaker
      .execute(|| {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
      })
      .await
      .unwrap_err();
    assert!(matches!(err, ActionError::CircuitOpen { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    tokio::time::advance(Duration::from_millis(1_000)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    breaker.execute(|| async { Ok(()) }).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_trial_reopens() {
    let breaker = CircuitBreaker::new("cb", options(1, 0));
    assert!(fail(&breaker).await.is_err());
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::advance(Duration::from_millis(1_000)).await;
    assert!(fail(&breaker).await.is_err());
    assert_eq!(breaker.state(), CircuitState::Open);
  }

  #[tokio::test(start_paused = true)]
  async fn test_dropped_trial_reopens_and_recovers() {
    let breaker = CircuitBreaker::new("cb", options(1, 0));
    assert!(fail(&breaker).await.is_err());
    tokio::time::advance(Duration::from_millis(1_000)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    let trial = breaker.execute(|| async {
      tokio::time::sleep(Duration::from_millis(50)).await;
      Ok(())
    });
    assert!(tokio::time::timeout(Duration::from_millis(10), trial).await.is_err());
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::advance(Duration::from_millis(1_000)).await;
    breaker.execute(|| async { Ok(()) }).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
  }
}
