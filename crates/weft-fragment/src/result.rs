use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fragment::Fragment;

/// Transition returned when an action finished normally.
pub const SUCCESS_TRANSITION: &str = "_success";
/// Transition returned (or synthesized by the engine) when an action failed.
pub const ERROR_TRANSITION: &str = "_error";
/// Transition returned by a circuit breaker that fell back.
pub const FALLBACK_TRANSITION: &str = "fallback";

/// The outcome of an action: the new fragment value, the transition to follow
/// and an optional node-specific log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentResult {
  pub fragment: Fragment,
  #[serde(default)]
  transition: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub log: Option<Value>,
}

impl FragmentResult {
  pub fn new(fragment: Fragment, transition: impl Into<String>) -> Self {
    Self {
      fragment,
      transition: transition.into(),
      log: None,
    }
  }

  pub fn success(fragment: Fragment) -> Self {
    Self::new(fragment, SUCCESS_TRANSITION)
  }

  pub fn error(fragment: Fragment) -> Self {
    Self::new(fragment, ERROR_TRANSITION)
  }

  pub fn with_log(mut self, log: Value) -> Self {
    self.log = Some(log);
    self
  }

  /// The transition to follow. A blank transition reads as success.
  pub fn transition(&self) -> &str {
    if self.transition.trim().is_empty() {
      SUCCESS_TRANSITION
    } else {
      &self.transition
    }
  }
}
