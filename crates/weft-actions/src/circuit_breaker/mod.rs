mod action;
mod breaker;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use weft_config::CircuitBreakerActionOptions;
use weft_fragment::{ActionError, ActionLogLevel, ActionRef, ERROR_TRANSITION};

use crate::factory::ActionFactory;

pub use action::CircuitBreakerAction;
pub use breaker::{CircuitBreaker, CircuitState};

/// Builds [`CircuitBreakerAction`]s. Registered as `cb`.
///
/// Cacheable: every alias gets one breaker shared by all runs, so failures
/// from concurrent fragments count against the same circuit.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircuitBreakerActionFactory;

impl ActionFactory for CircuitBreakerActionFactory {
  fn name(&self) -> &str {
    "cb"
  }

  fn cacheable(&self) -> bool {
    true
  }

  fn create(
    &self,
    alias: &str,
    config: &Value,
    do_action: Option<ActionRef>,
  ) -> Result<ActionRef, ActionError> {
    let do_action = do_action.ok_or_else(|| ActionError::DoActionNotDefined {
      alias: alias.to_string(),
    })?;
    let options = CircuitBreakerActionOptions::from_config(alias, config)
      .map_err(|e| ActionError::configuration(alias, e.to_string()))?;
    let log_level = ActionLogLevel::from_config(config, ActionLogLevel::Error)
      .map_err(|e| ActionError::configuration(alias, e.to_string()))?;

    let mut error_transitions: BTreeSet<String> = options.error_transitions;
    error_transitions.insert(ERROR_TRANSITION.to_string());

    let name = options
      .circuit_breaker_name
      .unwrap_or_else(|| alias.to_string());
    let breaker = CircuitBreaker::new(name, options.circuit_breaker_options);

    Ok(Arc::new(CircuitBreakerAction::new(
      alias,
      breaker,
      do_action,
      error_transitions,
      log_level,
    )))
  }
}
