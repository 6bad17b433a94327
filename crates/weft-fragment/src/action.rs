//! The action contract and helpers for implementing it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::ActionError;
use crate::request::FragmentContext;
use crate::result::FragmentResult;

/// An asynchronous fragment transformer.
///
/// Implementations must deliver exactly one result per call. Timeouts are the
/// implementation's concern; the engine waits as long as the action takes.
#[async_trait]
pub trait Action: Send + Sync {
  async fn apply(&self, context: FragmentContext) -> Result<FragmentResult, ActionError>;
}

/// Shared handle to an action. Actions are built once and shared by every run.
pub type ActionRef = Arc<dyn Action>;

type BoxedFn = dyn Fn(FragmentContext) -> Pin<Box<dyn Future<Output = Result<FragmentResult, ActionError>> + Send>>
  + Send
  + Sync;

/// An action backed by an async closure.
pub struct FnAction {
  f: Box<BoxedFn>,
}

impl FnAction {
  pub fn new<F, Fut>(f: F) -> Self
  where
    F: Fn(FragmentContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<FragmentResult, ActionError>> + Send + 'static,
  {
    Self {
      f: Box::new(move |context| Box::pin(f(context))),
    }
  }

  /// An action that computes its result synchronously.
  pub fn sync<F>(f: F) -> Self
  where
    F: Fn(FragmentContext) -> Result<FragmentResult, ActionError> + Send + Sync + 'static,
  {
    let f = Arc::new(f);
    Self::new(move |context| {
      let f = f.clone();
      async move { f(context) }
    })
  }
}

#[async_trait]
impl Action for FnAction {
  async fn apply(&self, context: FragmentContext) -> Result<FragmentResult, ActionError> {
    (self.f)(context).await
  }
}

/// Completion handle passed to a [`CallbackAction`] handler.
pub type ResultSender = oneshot::Sender<Result<FragmentResult, ActionError>>;

type CallbackFn = dyn Fn(FragmentContext, ResultSender) + Send + Sync;

/// Adapter for callback-style actions.
///
/// The handler receives a [`ResultSender`] and may complete it from anywhere,
/// including a spawned task. Dropping the sender without completing it yields
/// [`ActionError::ResultLost`] instead of hanging.
pub struct CallbackAction {
  alias: String,
  handler: Box<CallbackFn>,
}

impl CallbackAction {
  pub fn new<F>(alias: impl Into<String>, handler: F) -> Self
  where
    F: Fn(FragmentContext, ResultSender) + Send + Sync + 'static,
  {
    Self {
      alias: alias.into(),
      handler: Box::new(handler),
    }
  }
}

#[async_trait]
impl Action for CallbackAction {
  async fn apply(&self, context: FragmentContext) -> Result<FragmentResult, ActionError> {
    let (tx, rx) = oneshot::channel();
    (self.handler)(context, tx);
    rx.await.map_err(|_| ActionError::ResultLost {
      alias: self.alias.clone(),
    })?
  }
}

/// A timed call of a wrapped action.
#[derive(Debug)]
pub struct ActionInvocation {
  pub duration: Duration,
  pub result: Result<FragmentResult, ActionError>,
}

impl ActionInvocation {
  /// Apply `action` and measure how long it took.
  pub async fn invoke(action: &dyn Action, context: FragmentContext) -> Self {
    let started = Instant::now();
    let result = action.apply(context).await;
    Self {
      duration: started.elapsed(),
      result,
    }
  }
}
