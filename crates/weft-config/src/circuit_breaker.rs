use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

/// Options of the circuit breaker (`cb`) action factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerActionOptions {
  #[serde(default)]
  pub circuit_breaker_name: Option<String>,
  #[serde(default)]
  pub circuit_breaker_options: CircuitBreakerOptions,
  /// Transitions of the wrapped action that count as failures. `_error` is
  /// always added by the action.
  #[serde(default)]
  pub error_transitions: BTreeSet<String>,
  #[serde(default)]
  pub log_level: Option<String>,
}

impl CircuitBreakerActionOptions {
  pub fn from_config(alias: &str, config: &Value) -> Result<Self, ConfigError> {
    serde_json::from_value(config.clone()).map_err(|source| ConfigError::InvalidOptions {
      alias: alias.to_string(),
      source,
    })
  }
}

/// Breaker tuning. Durations are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CircuitBreakerOptions {
  pub timeout: u64,
  pub max_failures: u32,
  pub reset_timeout: u64,
  pub max_retries: u32,
}

impl Default for CircuitBreakerOptions {
  fn default() -> Self {
    Self {
      timeout: 10_000,
      max_failures: 5,
      reset_timeout: 30_000,
      max_retries: 0,
    }
  }
}
