//! Weft Engine
//!
//! Executes per-fragment task graphs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     FragmentsEngine                         │
//! │  - execute(fragments, request) → Vec<FragmentEvent>         │
//! │  - one spawned run per fragment, results in input order     │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       TaskEngine                            │
//! │  - walks one fragment's graph node by node                  │
//! │  - single nodes: apply action, follow returned transition   │
//! │  - composite nodes: run children concurrently, merge, join  │
//! │  - appends EventLogEntry records to the FragmentEvent       │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        TaskGraph                            │
//! │  - immutable node arena shared by every run of a task       │
//! │  - Node::next(transition) → Option<NodeId>                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut builder = GraphBuilder::new();
//! let fetch = builder.single("fetch", fetch_action)?;
//! let render = builder.single("render", render_action)?;
//! builder.connect(fetch, SUCCESS_TRANSITION, render)?;
//! let task = Task::new("page", builder.build(), fetch);
//!
//! let engine = FragmentsEngine::new();
//! let events = engine
//!   .execute(vec![FragmentExecution::new(fragment, Some(task))], request)
//!   .await?;
//! ```

mod engine;
mod error;
mod event;
mod fragments;
mod node;
mod notifier;
mod task;

pub use engine::{TaskEngine, TaskOutcome};
pub use error::{EngineError, GraphError};
pub use event::{EventLog, EventLogEntry, FragmentEvent, NodeStatus, Status};
pub use fragments::{FragmentExecution, FragmentsEngine};
pub use node::{CompositeNode, GraphBuilder, Node, NodeId, SingleNode, TaskGraph};
pub use notifier::{ChannelNotifier, EngineEvent, ExecutionNotifier, NoopNotifier};
pub use task::Task;
