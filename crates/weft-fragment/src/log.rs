//! Structured logs actions attach to their results.
//!
//! An [`ActionLogger`] collects key/value entries and the logs of wrapped
//! `doAction` invocations. Entries written with `info` are kept only when the
//! logger runs at [`ActionLogLevel::Info`]; entries written with `error` are
//! always kept.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::action::ActionInvocation;

/// Configuration key holding an action's log level.
pub const LOG_LEVEL_KEY: &str = "logLevel";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionLogLevel {
  Info,
  #[default]
  Error,
}

#[derive(Debug, Error)]
#[error("incorrect action log level: {0}")]
pub struct InvalidLogLevel(String);

impl FromStr for ActionLogLevel {
  type Err = InvalidLogLevel;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "info" => Ok(Self::Info),
      "error" => Ok(Self::Error),
      _ => Err(InvalidLogLevel(s.to_string())),
    }
  }
}

impl fmt::Display for ActionLogLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Info => f.write_str("info"),
      Self::Error => f.write_str("error"),
    }
  }
}

impl ActionLogLevel {
  /// Read `logLevel` from an action configuration. Missing or blank values
  /// fall back to `default`.
  pub fn from_config(config: &Value, default: Self) -> Result<Self, InvalidLogLevel> {
    match config.get(LOG_LEVEL_KEY).and_then(Value::as_str) {
      Some(level) if !level.trim().is_empty() => level.parse(),
      _ => Ok(default),
    }
  }
}

/// Log of one `doAction` call made by a wrapping action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInvocationLog {
  /// Wall time of the call in milliseconds.
  pub duration: u64,
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub transition: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub log: Option<Value>,
}

impl ActionInvocationLog {
  fn from_invocation(invocation: &ActionInvocation, success: bool) -> Self {
    let duration = invocation.duration.as_millis() as u64;
    match &invocation.result {
      Ok(result) => Self {
        duration,
        success,
        transition: Some(result.transition().to_string()),
        error: None,
        log: result.log.clone(),
      },
      Err(e) => Self {
        duration,
        success,
        transition: None,
        error: Some(e.to_string()),
        log: None,
      },
    }
  }
}

/// The serialized form of an [`ActionLogger`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLog {
  pub alias: String,
  #[serde(default)]
  pub logs: Map<String, Value>,
  #[serde(default)]
  pub do_action_logs: Vec<ActionInvocationLog>,
}

impl ActionLog {
  pub fn to_json(&self) -> Value {
    serde_json::to_value(self).unwrap_or(Value::Null)
  }
}

#[derive(Debug, Clone)]
pub struct ActionLogger {
  level: ActionLogLevel,
  log: ActionLog,
}

impl ActionLogger {
  pub fn new(alias: impl Into<String>, level: ActionLogLevel) -> Self {
    Self {
      level,
      log: ActionLog {
        alias: alias.into(),
        ..Default::default()
      },
    }
  }

  pub fn level(&self) -> ActionLogLevel {
    self.level
  }

  pub fn info(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    if self.level == ActionLogLevel::Info {
      self.log.logs.insert(key.into(), value.into());
    }
  }

  pub fn error(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    self.log.logs.insert(key.into(), value.into());
  }

  /// Record a successful `doAction` call. Kept only at INFO level.
  pub fn info_invocation(&mut self, invocation: &ActionInvocation) {
    if self.level == ActionLogLevel::Info {
      self
        .log
        .do_action_logs
        .push(ActionInvocationLog::from_invocation(invocation, true));
    }
  }

  /// Record a failed `doAction` call.
  pub fn error_invocation(&mut self, invocation: &ActionInvocation) {
    self
      .log
      .do_action_logs
      .push(ActionInvocationLog::from_invocation(invocation, false));
  }

  pub fn to_log(&self) -> ActionLog {
    self.log.clone()
  }

  pub fn to_json(&self) -> Value {
    self.log.to_json()
  }
}
