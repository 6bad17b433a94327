//! Integration tests for batch execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Map, json};
use weft_engine::{
  EngineError, FragmentExecution, FragmentsEngine, GraphBuilder, NodeStatus, Status, Task,
};
use weft_fragment::{
  ActionError, ActionRef, ClientRequest, FnAction, Fragment, FragmentContext, FragmentResult,
};

fn fragment(id: &str) -> Fragment {
  Fragment::with_id(id, "snippet", Map::new(), id)
}

fn single_node_task(name: &str, action: ActionRef) -> Task {
  let mut builder = GraphBuilder::new();
  let node = builder.single(name, action).unwrap();
  Task::new(name, builder.build(), node)
}

/// Sleeps for the number of milliseconds stored in the fragment body.
fn sleep_by_body() -> ActionRef {
  Arc::new(FnAction::new(|ctx: FragmentContext| async move {
    let millis: u64 = ctx.fragment().body().parse().unwrap_or(0);
    tokio::time::sleep(Duration::from_millis(millis)).await;
    let mut fragment = ctx.into_fragment();
    fragment.append_payload("slept", json!(millis));
    Ok(FragmentResult::success(fragment))
  }))
}

#[tokio::test(start_paused = true)]
async fn test_results_follow_submission_order() {
  let task = single_node_task("sleep", sleep_by_body());
  let executions = ["300", "10", "200", "50"]
    .into_iter()
    .map(|id| FragmentExecution::new(fragment(id), Some(task.clone())))
    .collect();

  let events = FragmentsEngine::new()
    .execute(executions, ClientRequest::default())
    .await
    .unwrap();

  let ids: Vec<&str> = events.iter().map(|e| e.fragment().id()).collect();
  assert_eq!(ids, vec!["300", "10", "200", "50"]);
  assert!(events.iter().all(|e| e.status() == Status::Success));
}

#[tokio::test]
async fn test_failing_fragment_does_not_affect_others() {
  let failing = single_node_task(
    "failing",
    Arc::new(FnAction::sync(|_| Err(ActionError::failed("failing", "boom")))),
  );
  let ok = single_node_task(
    "ok",
    Arc::new(FnAction::sync(|ctx| {
      let mut fragment = ctx.into_fragment();
      fragment.set_body("done");
      Ok(FragmentResult::success(fragment))
    })),
  );

  let events = FragmentsEngine::new()
    .execute(
      vec![
        FragmentExecution::new(fragment("a"), Some(ok.clone())),
        FragmentExecution::new(fragment("b"), Some(failing)),
        FragmentExecution::new(fragment("c"), Some(ok)),
      ],
      ClientRequest::default(),
    )
    .await
    .unwrap();

  assert_eq!(events.len(), 3);
  assert_eq!(events[0].status(), Status::Success);
  assert_eq!(events[0].fragment().body(), "done");
  assert_eq!(events[1].status(), Status::Failure);
  assert_eq!(events[1].fragment().body(), "b");
  assert_eq!(events[1].log().entries()[0].status, NodeStatus::Error);
  assert_eq!(events[2].status(), Status::Success);
}

#[tokio::test]
async fn test_fragment_without_task_is_unprocessed() {
  let events = FragmentsEngine::new()
    .execute(
      vec![
        FragmentExecution::new(fragment("a"), None),
        FragmentExecution::new(fragment("b"), Some(Task::empty("empty"))),
      ],
      ClientRequest::default(),
    )
    .await
    .unwrap();

  for (event, id) in events.iter().zip(["a", "b"]) {
    assert_eq!(event.status(), Status::Unprocessed);
    assert_eq!(event.fragment(), &fragment(id));
    assert!(event.log().is_empty());
  }
}

#[tokio::test]
async fn test_duplicate_ids_each_get_an_event() {
  let task = single_node_task(
    "mark",
    Arc::new(FnAction::sync(|ctx| {
      let mut fragment = ctx.into_fragment();
      fragment.set_body("marked");
      Ok(FragmentResult::success(fragment))
    })),
  );

  let events = FragmentsEngine::new()
    .execute(
      vec![
        FragmentExecution::new(fragment("same"), None),
        FragmentExecution::new(fragment("same"), Some(task)),
      ],
      ClientRequest::default(),
    )
    .await
    .unwrap();

  assert_eq!(events.len(), 2);
  assert_eq!(events[0].status(), Status::Unprocessed);
  assert_eq!(events[0].fragment().body(), "same");
  assert_eq!(events[1].status(), Status::Success);
  assert_eq!(events[1].fragment().body(), "marked");
}

#[tokio::test]
async fn test_replaced_fragment_identity_is_missing() {
  let task = single_node_task(
    "replace",
    Arc::new(FnAction::sync(|_| {
      Ok(FragmentResult::success(Fragment::with_id(
        "someone-else",
        "snippet",
        Map::new(),
        "",
      )))
    })),
  );

  let err = FragmentsEngine::new()
    .execute(
      vec![FragmentExecution::new(fragment("mine"), Some(task))],
      ClientRequest::default(),
    )
    .await
    .unwrap_err();

  assert!(matches!(err, EngineError::MissingFragment { ref fragment_id } if fragment_id == "mine"));
}

#[tokio::test]
async fn test_fatal_fault_fails_batch_after_all_runs_finish() {
  let finished = Arc::new(AtomicUsize::new(0));
  let counter = finished.clone();
  let slow = single_node_task(
    "slow",
    Arc::new(FnAction::new(move |ctx: FragmentContext| {
      let counter = counter.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(FragmentResult::success(ctx.into_fragment()))
      }
    })),
  );
  let fatal = single_node_task(
    "fatal",
    Arc::new(FnAction::sync(|_| Err(ActionError::fatal("fatal", "dispatch failed")))),
  );

  let err = FragmentsEngine::new()
    .execute(
      vec![
        FragmentExecution::new(fragment("a"), Some(slow.clone())),
        FragmentExecution::new(fragment("b"), Some(fatal)),
        FragmentExecution::new(fragment("c"), Some(slow)),
      ],
      ClientRequest::default(),
    )
    .await
    .unwrap_err();

  assert!(matches!(err, EngineError::Fatal { ref fragment_id, .. } if fragment_id == "b"));
  assert_eq!(finished.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_empty_batch() {
  let events = FragmentsEngine::new()
    .execute(vec![], ClientRequest::default())
    .await
    .unwrap();
  assert!(events.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_runs_in_flight() {
  let task = single_node_task("sleep", sleep_by_body());
  let executions = ["10", "10000"]
    .into_iter()
    .map(|id| FragmentExecution::new(fragment(id), Some(task.clone())))
    .collect();

  let cancel = tokio_util::sync::CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(100)).await;
    trigger.cancel();
  });

  let started = tokio::time::Instant::now();
  let err = FragmentsEngine::new()
    .execute_with_cancel(executions, ClientRequest::default(), cancel)
    .await
    .unwrap_err();

  assert!(matches!(err, EngineError::Cancelled { fragment_id } if fragment_id == "10000"));
  assert!(started.elapsed() < Duration::from_secs(1));
}
