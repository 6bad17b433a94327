use std::sync::Arc;

use crate::node::{NodeId, TaskGraph};

/// A named task graph with its entry node.
///
/// Cloning is cheap; clones share the same graph.
#[derive(Debug, Clone)]
pub struct Task {
  name: String,
  graph: Arc<TaskGraph>,
  root: Option<NodeId>,
}

impl Task {
  pub fn new(name: impl Into<String>, graph: impl Into<Arc<TaskGraph>>, root: NodeId) -> Self {
    Self {
      name: name.into(),
      graph: graph.into(),
      root: Some(root),
    }
  }

  /// A task without nodes. Running it leaves the fragment untouched.
  pub fn empty(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      graph: Arc::new(TaskGraph::default()),
      root: None,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn graph(&self) -> &TaskGraph {
    &self.graph
  }

  pub fn root(&self) -> Option<NodeId> {
    self.root
  }
}
