use thiserror::Error;

/// Errors an action can end with.
///
/// Everything except [`ActionError::Fatal`] is recoverable: the engine turns it
/// into an `_error` transition and keeps walking the graph.
#[derive(Debug, Clone, Error)]
pub enum ActionError {
  /// The action ran and failed.
  #[error("action '{alias}' failed: {message}")]
  Failed { alias: String, message: String },

  /// The action did not produce a result in time.
  #[error("action '{alias}' timed out after {timeout_ms}ms")]
  Timeout { alias: String, timeout_ms: u64 },

  /// The action ended with a transition its wrapper classifies as an error.
  #[error("action end up {transition} transition")]
  ErrorTransition { transition: String },

  /// The circuit breaker is open and did not let the call through.
  #[error("circuit '{name}' is open")]
  CircuitOpen { name: String },

  /// The action finished without ever delivering a result.
  #[error("action '{alias}' finished without delivering a result")]
  ResultLost { alias: String },

  /// Non-recoverable framework fault. Aborts the fragment's whole run.
  #[error("fatal fault in action '{alias}': {message}")]
  Fatal { alias: String, message: String },

  /// The action could not be built from its configuration.
  #[error("invalid configuration for action '{alias}': {message}")]
  Configuration { alias: String, message: String },

  /// A wrapping action was configured without the `doAction` it requires.
  #[error("action '{alias}' requires a doAction")]
  DoActionNotDefined { alias: String },
}

impl ActionError {
  pub fn failed(alias: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Failed {
      alias: alias.into(),
      message: message.into(),
    }
  }

  pub fn fatal(alias: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Fatal {
      alias: alias.into(),
      message: message.into(),
    }
  }

  pub fn configuration(alias: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Configuration {
      alias: alias.into(),
      message: message.into(),
    }
  }

  pub fn is_fatal(&self) -> bool {
    matches!(self, Self::Fatal { .. })
  }

  pub fn is_timeout(&self) -> bool {
    matches!(self, Self::Timeout { .. })
  }
}
