//! Engine events and notifiers.
//!
//! Events let consumers follow fragment runs as they happen (stream to a UI,
//! collect metrics, assert in tests) without touching the event log.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::event::Status;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
  TaskStarted {
    fragment_id: String,
    task: String,
  },

  NodeStarted {
    fragment_id: String,
    node_id: String,
  },

  NodeCompleted {
    fragment_id: String,
    node_id: String,
    transition: String,
  },

  NodeFailed {
    fragment_id: String,
    node_id: String,
    error: String,
  },

  TaskCompleted {
    fragment_id: String,
    task: String,
    status: Status,
  },
}

/// Receives engine events. Called inline from the run, so keep it cheap.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: EngineEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: EngineEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<EngineEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: EngineEvent) {
    // receiver may be gone
    let _ = self.sender.send(event);
  }
}
