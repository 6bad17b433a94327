use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One vertex of a configured task graph.
///
/// A node either runs an action (`action`) or fans out into parallel
/// sub-graphs (`subtasks`). `on` maps a transition to the node that follows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphNodeDef {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub action: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subtasks: Option<Vec<GraphNodeDef>>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub on: BTreeMap<String, GraphNodeDef>,
}

/// Borrowed view of what a [`GraphNodeDef`] runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind<'a> {
  Action(&'a str),
  Subtasks(&'a [GraphNodeDef]),
}

impl GraphNodeDef {
  pub fn action(alias: impl Into<String>) -> Self {
    Self {
      action: Some(alias.into()),
      ..Default::default()
    }
  }

  pub fn subtasks(children: Vec<GraphNodeDef>) -> Self {
    Self {
      subtasks: Some(children),
      ..Default::default()
    }
  }

  pub fn on(mut self, transition: impl Into<String>, next: GraphNodeDef) -> Self {
    self.on.insert(transition.into(), next);
    self
  }

  pub fn kind(&self) -> Result<NodeKind<'_>, String> {
    match (&self.action, &self.subtasks) {
      (Some(alias), None) => Ok(NodeKind::Action(alias)),
      (None, Some(children)) => Ok(NodeKind::Subtasks(children)),
      (Some(_), Some(_)) => Err("node defines both 'action' and 'subtasks'".to_string()),
      (None, None) => Err("node defines neither 'action' nor 'subtasks'".to_string()),
    }
  }

  /// Check this node and everything reachable from it.
  pub fn validate(&self) -> Result<(), String> {
    if let NodeKind::Subtasks(children) = self.kind()? {
      for child in children {
        child.validate()?;
      }
    }
    for next in self.on.values() {
      next.validate()?;
    }
    Ok(())
  }
}
