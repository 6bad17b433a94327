//! The per-fragment graph walker.
//!
//! A run starts at the task's root node and follows transitions until a node
//! has no edge for the transition it ended with. Single nodes apply their
//! action; composite nodes run their children concurrently on copies of the
//! current fragment and merge the results once all of them are done.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info, instrument, warn};
use weft_fragment::{ClientRequest, ERROR_TRANSITION, FragmentContext, SUCCESS_TRANSITION};

use crate::error::EngineError;
use crate::event::{EventLogEntry, FragmentEvent, NodeStatus, Status};
use crate::node::{CompositeNode, Node, NodeId, SingleNode};
use crate::notifier::{EngineEvent, ExecutionNotifier, NoopNotifier};
use crate::task::Task;

type WalkFuture<'a> = Pin<Box<dyn Future<Output = Result<String, EngineError>> + Send + 'a>>;

/// Terminal state of a task run.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
  pub event: FragmentEvent,
  /// The last transition the run resolved.
  pub transition: String,
}

/// Walks task graphs for single fragments.
///
/// Generic over `N: ExecutionNotifier`; use `TaskEngine::new()` for an engine
/// that discards events.
pub struct TaskEngine<N: ExecutionNotifier = NoopNotifier> {
  notifier: Arc<N>,
}

impl<N: ExecutionNotifier> Clone for TaskEngine<N> {
  fn clone(&self) -> Self {
    Self {
      notifier: self.notifier.clone(),
    }
  }
}

impl TaskEngine<NoopNotifier> {
  pub fn new() -> Self {
    Self::with_notifier(NoopNotifier)
  }
}

impl Default for TaskEngine<NoopNotifier> {
  fn default() -> Self {
    Self::new()
  }
}

impl<N: ExecutionNotifier> TaskEngine<N> {
  pub fn with_notifier(notifier: N) -> Self {
    Self {
      notifier: Arc::new(notifier),
    }
  }

  pub fn notifier(&self) -> &N {
    &self.notifier
  }

  /// Run `task` for the fragment held by `event` until the graph ends.
  ///
  /// Returns `Err` only for fatal faults; recoverable failures end up in the
  /// event's status and log.
  #[instrument(
    name = "task_execute",
    skip(self, event, task, request),
    fields(task = %task.name(), fragment_id = %event.fragment().id())
  )]
  pub async fn execute(
    &self,
    mut event: FragmentEvent,
    task: &Task,
    request: Arc<ClientRequest>,
  ) -> Result<TaskOutcome, EngineError> {
    let Some(root) = task.root() else {
      debug!("task_without_nodes");
      return Ok(TaskOutcome {
        event,
        transition: SUCCESS_TRANSITION.to_string(),
      });
    };

    let fragment_id = event.fragment().id().to_string();
    self.notifier.notify(EngineEvent::TaskStarted {
      fragment_id: fragment_id.clone(),
      task: task.name().to_string(),
    });
    info!("task_started");

    let transition = self.walk(task, root, &mut event, &request).await?;

    info!(status = ?event.status(), transition = %transition, "task_completed");
    self.notifier.notify(EngineEvent::TaskCompleted {
      fragment_id,
      task: task.name().to_string(),
      status: event.status(),
    });

    Ok(TaskOutcome { event, transition })
  }

  fn walk<'a>(
    &'a self,
    task: &'a Task,
    start: NodeId,
    event: &'a mut FragmentEvent,
    request: &'a Arc<ClientRequest>,
  ) -> WalkFuture<'a> {
    Box::pin(async move {
      let mut current = start;
      loop {
        let node = task
          .graph()
          .node(current)
          .ok_or_else(|| EngineError::UnknownNode {
            task: task.name().to_string(),
            node: current.index(),
          })?;

        let transition = match node {
          Node::Single(single) => self.run_single(task, single, event, request).await?,
          Node::Composite(composite) => {
            self.run_composite(task, composite, event, request).await?
          }
        };

        match node.next(&transition) {
          Some(next) => current = next,
          None => {
            if transition != SUCCESS_TRANSITION {
              warn!(node_id = %node.id(), transition = %transition, "unsupported_transition");
              event.set_status(Status::Failure);
              event.log_mut().append(EventLogEntry::new(
                task.name(),
                node.id(),
                NodeStatus::UnsupportedTransition,
                Some(transition.clone()),
                None,
              ));
            }
            return Ok(transition);
          }
        }
      }
    })
  }

  async fn run_single(
    &self,
    task: &Task,
    node: &SingleNode,
    event: &mut FragmentEvent,
    request: &Arc<ClientRequest>,
  ) -> Result<String, EngineError> {
    let fragment_id = event.fragment().id().to_string();
    self.notifier.notify(EngineEvent::NodeStarted {
      fragment_id: fragment_id.clone(),
      node_id: node.id().to_string(),
    });

    let context = FragmentContext::new(event.fragment().clone(), request.clone());
    match node.action().apply(context).await {
      Ok(result) => {
        let transition = result.transition().to_string();
        debug!(node_id = %node.id(), transition = %transition, "node_completed");
        self.notifier.notify(EngineEvent::NodeCompleted {
          fragment_id,
          node_id: node.id().to_string(),
          transition: transition.clone(),
        });

        event.set_fragment(result.fragment);
        event.set_status(Status::Success);
        event.log_mut().append(EventLogEntry::new(
          task.name(),
          node.id(),
          NodeStatus::Success,
          Some(transition.clone()),
          result.log,
        ));
        Ok(transition)
      }
      Err(e) if e.is_fatal() => {
        error!(node_id = %node.id(), error = %e, "node_fatal");
        self.notifier.notify(EngineEvent::NodeFailed {
          fragment_id: fragment_id.clone(),
          node_id: node.id().to_string(),
          error: e.to_string(),
        });
        Err(EngineError::Fatal {
          task: task.name().to_string(),
          node_id: node.id().to_string(),
          fragment_id,
          source: e,
        })
      }
      Err(e) => {
        warn!(node_id = %node.id(), error = %e, "node_failed");
        self.notifier.notify(EngineEvent::NodeFailed {
          fragment_id,
          node_id: node.id().to_string(),
          error: e.to_string(),
        });

        // a timed out node never produced a transition of its own
        let (status, transition) = if e.is_timeout() {
          (NodeStatus::Timeout, None)
        } else {
          (NodeStatus::Error, Some(ERROR_TRANSITION.to_string()))
        };
        event.set_status(Status::Failure);
        event.log_mut().append(EventLogEntry::new(
          task.name(),
          node.id(),
          status,
          transition,
          Some(json!({ "error": e.to_string() })),
        ));
        Ok(ERROR_TRANSITION.to_string())
      }
    }
  }

  async fn run_composite(
    &self,
    task: &Task,
    node: &CompositeNode,
    event: &mut FragmentEvent,
    request: &Arc<ClientRequest>,
  ) -> Result<String, EngineError> {
    self.notifier.notify(EngineEvent::NodeStarted {
      fragment_id: event.fragment().id().to_string(),
      node_id: node.id().to_string(),
    });
    debug!(node_id = %node.id(), children = node.children().len(), "composite_started");

    let snapshot = event.fragment().clone();
    let runs = node.children().iter().map(|&child| {
      let mut child_event = FragmentEvent::new(snapshot.clone());
      async move {
        self.walk(task, child, &mut child_event, request).await?;
        Ok::<_, EngineError>(child_event)
      }
    });
    let results = futures::future::join_all(runs).await;

    let mut failed = false;
    let mut succeeded = false;
    for result in results {
      let (fragment, status, log) = result?.into_parts();
      match status {
        Status::Failure => failed = true,
        Status::Success => succeeded = true,
        Status::Unprocessed => {}
      }
      let target = event.fragment_mut();
      target.merge_in_payload(fragment.payload().clone());
      target.set_body(fragment.body());
      event.log_mut().append_all(log);
    }

    if failed {
      event.set_status(Status::Failure);
    } else if succeeded {
      event.set_status(Status::Success);
    }

    let (status, transition) = if failed {
      (NodeStatus::Error, ERROR_TRANSITION)
    } else {
      (NodeStatus::Success, SUCCESS_TRANSITION)
    };
    debug!(node_id = %node.id(), transition, "composite_completed");
    self.notifier.notify(EngineEvent::NodeCompleted {
      fragment_id: event.fragment().id().to_string(),
      node_id: node.id().to_string(),
      transition: transition.to_string(),
    });
    event.log_mut().append(EventLogEntry::new(
      task.name(),
      node.id(),
      status,
      Some(transition.to_string()),
      None,
    ));
    Ok(transition.to_string())
  }
}
