//! Per-run execution state: the fragment being processed, its status and an
//! append-only log of node outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use weft_fragment::Fragment;

/// Overall status of a fragment's task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
  Unprocessed,
  Success,
  Failure,
}

/// Outcome of one node execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
  Success,
  Error,
  Timeout,
  /// The node ended with a transition that has no configured edge.
  UnsupportedTransition,
  Unprocessed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogEntry {
  pub task: String,
  pub node: String,
  pub status: NodeStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub transition: Option<String>,
  /// Epoch milliseconds.
  pub timestamp: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub node_log: Option<Value>,
}

impl EventLogEntry {
  pub fn new(
    task: impl Into<String>,
    node: impl Into<String>,
    status: NodeStatus,
    transition: Option<String>,
    node_log: Option<Value>,
  ) -> Self {
    Self {
      task: task.into(),
      node: node.into(),
      status,
      transition,
      timestamp: chrono::Utc::now().timestamp_millis(),
      node_log,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
  entries: Vec<EventLogEntry>,
}

impl EventLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn append(&mut self, entry: EventLogEntry) {
    self.entries.push(entry);
  }

  /// Append every entry of `other`, keeping its order.
  pub fn append_all(&mut self, other: EventLog) {
    self.entries.extend(other.entries);
  }

  pub fn entries(&self) -> &[EventLogEntry] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Mutable execution record of one fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentEvent {
  fragment: Fragment,
  status: Status,
  log: EventLog,
}

impl FragmentEvent {
  pub fn new(fragment: Fragment) -> Self {
    Self {
      fragment,
      status: Status::Unprocessed,
      log: EventLog::new(),
    }
  }

  pub fn fragment(&self) -> &Fragment {
    &self.fragment
  }

  pub fn fragment_mut(&mut self) -> &mut Fragment {
    &mut self.fragment
  }

  pub fn set_fragment(&mut self, fragment: Fragment) {
    self.fragment = fragment;
  }

  pub fn status(&self) -> Status {
    self.status
  }

  pub fn set_status(&mut self, status: Status) {
    self.status = status;
  }

  pub fn log(&self) -> &EventLog {
    &self.log
  }

  pub fn log_mut(&mut self) -> &mut EventLog {
    &mut self.log
  }

  pub fn into_parts(self) -> (Fragment, Status, EventLog) {
    (self.fragment, self.status, self.log)
  }
}
