use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};
use weft_fragment::{
  Action, ActionError, ActionInvocation, ActionLogLevel, ActionLogger, ActionRef,
  FALLBACK_TRANSITION, FragmentContext, FragmentResult,
};

use super::breaker::CircuitBreaker;

const INVOCATION_COUNT_LOG_KEY: &str = "invocationCount";
const ERROR_LOG_KEY: &str = "error";

/// Runs a `doAction` under a [`CircuitBreaker`] and falls back on failure.
///
/// A call fails when the `doAction` errors, times out or ends with one of the
/// configured error transitions. Failures turn into a `fallback` transition
/// carrying the untouched input fragment. Fatal errors are returned as is.
pub struct CircuitBreakerAction {
  alias: String,
  breaker: CircuitBreaker,
  do_action: ActionRef,
  error_transitions: BTreeSet<String>,
  log_level: ActionLogLevel,
}

impl CircuitBreakerAction {
  pub fn new(
    alias: impl Into<String>,
    breaker: CircuitBreaker,
    do_action: ActionRef,
    error_transitions: BTreeSet<String>,
    log_level: ActionLogLevel,
  ) -> Self {
    Self {
      alias: alias.into(),
      breaker,
      do_action,
      error_transitions,
      log_level,
    }
  }
}

#[async_trait]
impl Action for CircuitBreakerAction {
  async fn apply(&self, context: FragmentContext) -> Result<FragmentResult, ActionError> {
    let logger = Mutex::new(ActionLogger::new(&self.alias, self.log_level));
    let invocations = AtomicU32::new(0);

    let outcome = {
      let logger = &logger;
      let invocations = &invocations;
      let context = &context;
      self
        .breaker
        .execute(|| async move {
          invocations.fetch_add(1, Ordering::SeqCst);
          let invocation = ActionInvocation::invoke(self.do_action.as_ref(), context.clone()).await;
          let failure = match &invocation.result {
            Ok(result) if !self.error_transitions.contains(result.transition()) => None,
            Ok(result) => Some(ActionError::ErrorTransition {
              transition: result.transition().to_string(),
            }),
            Err(e) => Some(e.clone()),
          };
          let Some(error) = failure else {
            return Ok(invocation);
          };
          logger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .error_invocation(&invocation);
          Err(error)
        })
        .await
    };

    let count = invocations.load(Ordering::SeqCst);
    let mut logger = logger.into_inner().unwrap_or_else(PoisonError::into_inner);
    match outcome {
      Ok(invocation) => {
        debug!(alias = %self.alias, invocations = count, "circuit_breaker_success");
        logger.info(INVOCATION_COUNT_LOG_KEY, count);
        logger.info_invocation(&invocation);
        let result = invocation.result?;
        Ok(result.with_log(logger.to_json()))
      }
      Err(e) if e.is_fatal() => Err(e),
      Err(e) => {
        warn!(alias = %self.alias, invocations = count, error = %e, "circuit_breaker_fallback");
        logger.error(INVOCATION_COUNT_LOG_KEY, count);
        logger.error(ERROR_LOG_KEY, e.to_string());
        Ok(FragmentResult::new(context.into_fragment(), FALLBACK_TRANSITION).with_log(logger.to_json()))
      }
    }
  }
}
