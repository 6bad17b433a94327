//! Immutable task graphs.
//!
//! Nodes live in an arena ([`TaskGraph`]) and refer to each other by
//! [`NodeId`]. A graph is built once with [`GraphBuilder`] and then shared
//! read-only by every concurrent run of the task.

use std::collections::{HashMap, HashSet};
use std::fmt;

use weft_fragment::{ActionRef, ERROR_TRANSITION, SUCCESS_TRANSITION};

use crate::error::GraphError;

/// Index of a node inside its [`TaskGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
  pub fn index(&self) -> usize {
    self.0
  }
}

/// A node that runs one action.
pub struct SingleNode {
  id: String,
  action: ActionRef,
  transitions: HashMap<String, NodeId>,
}

impl SingleNode {
  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn action(&self) -> &ActionRef {
    &self.action
  }

  pub fn transitions(&self) -> &HashMap<String, NodeId> {
    &self.transitions
  }
}

impl fmt::Debug for SingleNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SingleNode")
      .field("id", &self.id)
      .field("transitions", &self.transitions)
      .finish_non_exhaustive()
  }
}

/// A node that runs independent sub-graphs concurrently and joins them.
#[derive(Debug)]
pub struct CompositeNode {
  id: String,
  children: Vec<NodeId>,
  on_success: Option<NodeId>,
  on_error: Option<NodeId>,
}

impl CompositeNode {
  pub fn id(&self) -> &str {
    &self.id
  }

  /// Roots of the child sub-graphs, in declaration order.
  pub fn children(&self) -> &[NodeId] {
    &self.children
  }
}

#[derive(Debug)]
pub enum Node {
  Single(SingleNode),
  Composite(CompositeNode),
}

impl Node {
  pub fn id(&self) -> &str {
    match self {
      Node::Single(node) => &node.id,
      Node::Composite(node) => &node.id,
    }
  }

  /// Look up the node that follows `transition`. `None` ends the walk.
  pub fn next(&self, transition: &str) -> Option<NodeId> {
    match self {
      Node::Single(node) => node.transitions.get(transition).copied(),
      Node::Composite(node) => match transition {
        SUCCESS_TRANSITION => node.on_success,
        ERROR_TRANSITION => node.on_error,
        _ => None,
      },
    }
  }
}

/// Arena holding every node of a task.
#[derive(Debug, Default)]
pub struct TaskGraph {
  nodes: Vec<Node>,
}

impl TaskGraph {
  pub fn node(&self, id: NodeId) -> Option<&Node> {
    self.nodes.get(id.0)
  }

  /// Nodes in the order they were added.
  pub fn nodes(&self) -> impl Iterator<Item = &Node> {
    self.nodes.iter()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }
}

/// Builds a [`TaskGraph`].
///
/// Edges may point to any node already added, including earlier ones, so
/// cyclic graphs can be expressed. Nothing checks that a walk terminates.
#[derive(Default)]
pub struct GraphBuilder {
  nodes: Vec<Node>,
  ids: HashSet<String>,
}

impl GraphBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Whether a node with this id was already added.
  pub fn contains(&self, id: &str) -> bool {
    self.ids.contains(id)
  }

  pub fn single(&mut self, id: impl Into<String>, action: ActionRef) -> Result<NodeId, GraphError> {
    let id = self.claim(id.into())?;
    Ok(self.push(Node::Single(SingleNode {
      id,
      action,
      transitions: HashMap::new(),
    })))
  }

  pub fn composite(
    &mut self,
    id: impl Into<String>,
    children: Vec<NodeId>,
  ) -> Result<NodeId, GraphError> {
    for child in &children {
      self.check(*child)?;
    }
    let id = self.claim(id.into())?;
    Ok(self.push(Node::Composite(CompositeNode {
      id,
      children,
      on_success: None,
      on_error: None,
    })))
  }

  /// Wire `from --transition--> to`. Re-wiring a transition replaces the edge.
  pub fn connect(
    &mut self,
    from: NodeId,
    transition: impl Into<String>,
    to: NodeId,
  ) -> Result<(), GraphError> {
    self.check(to)?;
    let transition = transition.into();
    match self.nodes.get_mut(from.0) {
      None => Err(GraphError::UnknownNode { node: from.0 }),
      Some(Node::Single(node)) => {
        node.transitions.insert(transition, to);
        Ok(())
      }
      Some(Node::Composite(node)) => {
        match transition.as_str() {
          SUCCESS_TRANSITION => node.on_success = Some(to),
          ERROR_TRANSITION => node.on_error = Some(to),
          _ => {
            return Err(GraphError::UnsupportedCompositeTransition {
              node_id: node.id.clone(),
              transition,
            });
          }
        }
        Ok(())
      }
    }
  }

  pub fn build(self) -> TaskGraph {
    TaskGraph { nodes: self.nodes }
  }

  fn claim(&mut self, id: String) -> Result<String, GraphError> {
    if !self.ids.insert(id.clone()) {
      return Err(GraphError::DuplicateNodeId { node_id: id });
    }
    Ok(id)
  }

  fn check(&self, id: NodeId) -> Result<(), GraphError> {
    if id.0 < self.nodes.len() {
      Ok(())
    } else {
      Err(GraphError::UnknownNode { node: id.0 })
    }
  }

  fn push(&mut self, node: Node) -> NodeId {
    self.nodes.push(node);
    NodeId(self.nodes.len() - 1)
  }
}
