use thiserror::Error;
use weft_fragment::ActionError;

/// Errors that abort a task run or a whole batch.
///
/// Recoverable action failures never show up here; they become `_error`
/// transitions inside the run.
#[derive(Debug, Error)]
pub enum EngineError {
  /// An action reported a fatal fault.
  #[error("fatal fault in task '{task}' at node '{node_id}' for fragment '{fragment_id}': {source}")]
  Fatal {
    task: String,
    node_id: String,
    fragment_id: String,
    #[source]
    source: ActionError,
  },

  /// A submitted fragment has no matching result.
  #[error("could not find fragment with id: {fragment_id}")]
  MissingFragment { fragment_id: String },

  /// A node id does not belong to the task's graph.
  #[error("task '{task}' has no node with index {node}")]
  UnknownNode { task: String, node: usize },

  /// The batch was cancelled before this fragment's run finished.
  #[error("fragment run cancelled: {fragment_id}")]
  Cancelled { fragment_id: String },

  /// A spawned fragment run panicked or was aborted.
  #[error("fragment run join error: {message}")]
  Join { message: String },
}

/// Errors raised while building a task graph.
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
  #[error("duplicate node id: {node_id}")]
  DuplicateNodeId { node_id: String },

  #[error("node index {node} does not exist")]
  UnknownNode { node: usize },

  #[error("composite node '{node_id}' only supports _success and _error transitions, got '{transition}'")]
  UnsupportedCompositeTransition { node_id: String, transition: String },
}
