use thiserror::Error;
use weft_engine::GraphError;
use weft_fragment::ActionError;

/// Errors that can occur while turning task definitions into tasks.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// The alias is not configured or its factory is unknown.
  #[error("action not found: {alias}")]
  ActionNotFound { alias: String },

  /// A factory rejected the configuration of an alias.
  #[error("action '{alias}' could not be created")]
  Action {
    alias: String,
    #[source]
    source: ActionError,
  },

  /// A node defines both or neither of `action` and `subtasks`.
  #[error("invalid node in task '{task}': {message}")]
  InvalidNode { task: String, message: String },

  #[error("task not found: {name}")]
  TaskNotFound { name: String },

  #[error("graph error: {0}")]
  Graph(#[from] GraphError),
}
