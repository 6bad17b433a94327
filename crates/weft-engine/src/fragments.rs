//! Batch execution of fragments.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, instrument, warn};
use weft_fragment::{ClientRequest, Fragment};

use crate::engine::TaskEngine;
use crate::error::EngineError;
use crate::event::FragmentEvent;
use crate::notifier::{ExecutionNotifier, NoopNotifier};
use crate::task::Task;

/// A fragment paired with the task it should run, if any.
#[derive(Debug, Clone)]
pub struct FragmentExecution {
  pub fragment: Fragment,
  pub task: Option<Task>,
}

impl FragmentExecution {
  pub fn new(fragment: Fragment, task: Option<Task>) -> Self {
    Self { fragment, task }
  }
}

/// Runs every fragment of a request concurrently and returns their events in
/// submission order.
pub struct FragmentsEngine<N: ExecutionNotifier = NoopNotifier> {
  engine: TaskEngine<N>,
}

impl FragmentsEngine<NoopNotifier> {
  pub fn new() -> Self {
    Self::with_engine(TaskEngine::new())
  }
}

impl Default for FragmentsEngine<NoopNotifier> {
  fn default() -> Self {
    Self::new()
  }
}

impl<N: ExecutionNotifier + 'static> FragmentsEngine<N> {
  pub fn with_engine(engine: TaskEngine<N>) -> Self {
    Self { engine }
  }

  pub fn task_engine(&self) -> &TaskEngine<N> {
    &self.engine
  }

  /// Execute all fragments.
  ///
  /// Each fragment runs on its own tokio task; a failure in one run never
  /// touches another. Fragments without a task come back `UNPROCESSED`.
  /// A fatal fault in any run fails the batch once every run has finished,
  /// reporting the first fatal fault in submission order.
  pub async fn execute(
    &self,
    executions: Vec<FragmentExecution>,
    request: ClientRequest,
  ) -> Result<Vec<FragmentEvent>, EngineError> {
    self
      .execute_with_cancel(executions, request, CancellationToken::new())
      .await
  }

  /// Like [`execute`](Self::execute), but runs still in flight when `cancel`
  /// fires are dropped and the batch fails with [`EngineError::Cancelled`].
  #[instrument(name = "fragments_execute", skip_all, fields(fragments = executions.len()))]
  pub async fn execute_with_cancel(
    &self,
    executions: Vec<FragmentExecution>,
    request: ClientRequest,
    cancel: CancellationToken,
  ) -> Result<Vec<FragmentEvent>, EngineError> {
    let request = Arc::new(request);
    let order: Vec<String> = executions
      .iter()
      .map(|e| e.fragment.id().to_string())
      .collect();

    let handles: Vec<_> = executions
      .into_iter()
      .map(|execution| {
        let engine = self.engine.clone();
        let request = request.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
          let fragment_id = execution.fragment.id().to_string();
          tokio::select! {
            _ = cancel.cancelled() => {
              warn!(fragment_id = %fragment_id, "fragment_run_cancelled");
              Err(EngineError::Cancelled { fragment_id })
            }
            result = run_fragment(engine, execution, request) => result,
          }
        })
      })
      .collect();

    let results = futures::future::join_all(handles).await;

    // handles line up with the submitted fragments
    let mut events = Vec::with_capacity(results.len());
    let mut fatal = None;
    for (fragment_id, result) in order.into_iter().zip(results) {
      match result {
        Ok(Ok(event)) if event.fragment().id() == fragment_id => events.push(event),
        Ok(Ok(event)) => {
          error!(
            fragment_id = %fragment_id,
            returned_id = %event.fragment().id(),
            "fragment_id_changed"
          );
          fatal.get_or_insert(EngineError::MissingFragment { fragment_id });
        }
        Ok(Err(e)) => {
          error!(error = %e, "fragment_run_aborted");
          fatal.get_or_insert(e);
        }
        Err(e) => {
          error!(error = %e, "fragment_run_join_failed");
          fatal.get_or_insert(EngineError::Join {
            message: e.to_string(),
          });
        }
      }
    }
    match fatal {
      Some(e) => Err(e),
      None => Ok(events),
    }
  }
}

async fn run_fragment<N: ExecutionNotifier>(
  engine: TaskEngine<N>,
  execution: FragmentExecution,
  request: Arc<ClientRequest>,
) -> Result<FragmentEvent, EngineError> {
  let event = FragmentEvent::new(execution.fragment);
  match execution.task {
    Some(task) => Ok(engine.execute(event, &task, request).await?.event),
    None => Ok(event),
  }
}
