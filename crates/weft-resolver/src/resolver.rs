use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use weft_actions::ActionProvider;
use weft_config::{EngineConfig, GraphNodeDef, NodeKind};
use weft_engine::{GraphBuilder, NodeId, Task};
use weft_fragment::{ActionError, ActionRef, ERROR_TRANSITION, SUCCESS_TRANSITION};

use crate::error::ResolveError;
use crate::tasks::Tasks;

/// Node id given to `subtasks` nodes, before de-duplication.
pub const COMPOSITE_NODE_ID: &str = "composite";

/// Looks up actions by alias while a graph is being built.
pub trait ActionSource: Send + Sync {
  /// `Ok(None)` when nothing is configured for `alias`.
  fn action(&self, alias: &str) -> Result<Option<ActionRef>, ActionError>;
}

impl ActionSource for ActionProvider {
  fn action(&self, alias: &str) -> Result<Option<ActionRef>, ActionError> {
    self.get(alias)
  }
}

impl<T: ActionSource + ?Sized> ActionSource for Arc<T> {
  fn action(&self, alias: &str) -> Result<Option<ActionRef>, ActionError> {
    (**self).action(alias)
  }
}

/// Resolver transforms task definitions into executable tasks.
#[async_trait]
pub trait Resolver: Send + Sync {
  /// Resolve one named task definition.
  async fn resolve(&self, name: &str, def: &GraphNodeDef) -> Result<Task, ResolveError>;

  /// Resolve every task of a configuration document.
  async fn resolve_all(&self, config: &EngineConfig) -> Result<Tasks, ResolveError> {
    let mut tasks = Tasks::default();
    for (name, def) in &config.tasks {
      tasks.insert(self.resolve(name, def).await?);
    }
    Ok(tasks)
  }
}

/// Standard resolver that takes actions from an [`ActionSource`].
///
/// Action nodes are named after their alias and `subtasks` nodes
/// [`COMPOSITE_NODE_ID`]. Repeated names within one graph get a numeric
/// suffix (`fetch`, `fetch-2`, ...) in definition order.
pub struct StandardResolver<S: ActionSource> {
  source: S,
}

impl<S: ActionSource> StandardResolver<S> {
  pub fn new(source: S) -> Self {
    Self { source }
  }

  pub fn source(&self) -> &S {
    &self.source
  }
}

#[async_trait]
impl<S: ActionSource> Resolver for StandardResolver<S> {
  async fn resolve(&self, name: &str, def: &GraphNodeDef) -> Result<Task, ResolveError> {
    let mut assembly = GraphAssembly {
      task: name,
      source: &self.source,
      builder: GraphBuilder::new(),
      taken: HashSet::new(),
    };
    let root = assembly.add(def)?;
    let graph = assembly.builder.build();
    debug!(task = name, nodes = graph.len(), "task_resolved");
    Ok(Task::new(name, graph, root))
  }
}

/// Per-task build state.
struct GraphAssembly<'a, S: ?Sized> {
  task: &'a str,
  source: &'a S,
  builder: GraphBuilder,
  taken: HashSet<String>,
}

impl<S: ActionSource + ?Sized> GraphAssembly<'_, S> {
  fn add(&mut self, def: &GraphNodeDef) -> Result<NodeId, ResolveError> {
    let kind = def.kind().map_err(|message| ResolveError::InvalidNode {
      task: self.task.to_string(),
      message,
    })?;

    let (node, composite) = match kind {
      NodeKind::Action(alias) => {
        let id = self.unique_id(alias);
        let action = self
          .source
          .action(alias)
          .map_err(|source| ResolveError::Action {
            alias: alias.to_string(),
            source,
          })?
          .ok_or_else(|| ResolveError::ActionNotFound {
            alias: alias.to_string(),
          })?;
        (self.builder.single(id, action)?, false)
      }
      NodeKind::Subtasks(children) => {
        let id = self.unique_id(COMPOSITE_NODE_ID);
        let mut nodes = Vec::with_capacity(children.len());
        for child in children {
          nodes.push(self.add(child)?);
        }
        (self.builder.composite(id, nodes)?, true)
      }
    };

    for (transition, next) in &def.on {
      if composite && transition != SUCCESS_TRANSITION && transition != ERROR_TRANSITION {
        warn!(task = self.task, transition = %transition, "composite_transition_ignored");
        continue;
      }
      let next = self.add(next)?;
      self.builder.connect(node, transition.as_str(), next)?;
    }

    Ok(node)
  }

  fn unique_id(&mut self, base: &str) -> String {
    let mut id = base.to_string();
    let mut n = 1;
    while self.taken.contains(&id) {
      n += 1;
      id = format!("{base}-{n}");
    }
    self.taken.insert(id.clone());
    id
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;
  use weft_engine::Node;
  use weft_fragment::{FnAction, FragmentResult};

  struct StaticSource {
    actions: HashMap<String, ActionRef>,
  }

  impl StaticSource {
    fn new(aliases: &[&str]) -> Self {
      let actions = aliases
        .iter()
        .map(|alias| {
          let action: ActionRef = Arc::new(FnAction::sync(|ctx| {
            Ok(FragmentResult::success(ctx.into_fragment()))
          }));
          (alias.to_string(), action)
        })
        .collect();
      Self { actions }
    }
  }

  impl ActionSource for StaticSource {
    fn action(&self, alias: &str) -> Result<Option<ActionRef>, ActionError> {
      if alias == "broken" {
        return Err(ActionError::configuration(alias, "bad config"));
      }
      Ok(self.actions.get(alias).cloned())
    }
  }

  #[tokio::test]
  async fn test_resolve_chain() {
    let resolver = StandardResolver::new(StaticSource::new(&["fetch", "render", "fallback"]));
    let def = GraphNodeDef::action("fetch")
      .on("_success", GraphNodeDef::action("render"))
      .on("_error", GraphNodeDef::action("fallback"));

    let task = resolver.resolve("page", &def).await.unwrap();
    assert_eq!(task.name(), "page");
    assert_eq!(task.graph().len(), 3);

    let root = task.root().unwrap();
    let fetch = task.graph().node(root).unwrap();
    assert_eq!(fetch.id(), "fetch");
    let render = fetch.next("_success").unwrap();
    assert_eq!(task.graph().node(render).unwrap().id(), "render");
    let fallback = fetch.next("_error").unwrap();
    assert_eq!(task.graph().node(fallback).unwrap().id(), "fallback");
    assert!(fetch.next("custom").is_none());
  }

  #[tokio::test]
  async fn test_repeated_alias_gets_suffix() {
    let resolver = StandardResolver::new(StaticSource::new(&["fetch"]));
    let def = GraphNodeDef::action("fetch").on("_error", GraphNodeDef::action("fetch"));

    let task = resolver.resolve("retry", &def).await.unwrap();
    let ids: Vec<&str> = task.graph().nodes().map(Node::id).collect();
    assert_eq!(ids, vec!["fetch", "fetch-2"]);
    assert_eq!(task.graph().len(), 2);
  }

  #[tokio::test]
  async fn test_subtasks_become_composite() {
    let resolver = StandardResolver::new(StaticSource::new(&["a", "b", "after"]));
    let def = GraphNodeDef::subtasks(vec![GraphNodeDef::action("a"), GraphNodeDef::action("b")])
      .on("_success", GraphNodeDef::action("after"))
      .on("custom", GraphNodeDef::action("after"));

    let task = resolver.resolve("fan", &def).await.unwrap();
    let root = task.graph().node(task.root().unwrap()).unwrap();
    let Node::Composite(composite) = root else {
      panic!("expected composite root");
    };
    assert_eq!(composite.id(), COMPOSITE_NODE_ID);
    assert_eq!(composite.children().len(), 2);
    assert!(root.next("_success").is_some());
    // the custom edge is dropped, so "after" exists once
    assert!(task.graph().nodes().all(|n| n.id() != "after-2"));
  }

  #[tokio::test]
  async fn test_unknown_alias_is_error() {
    let resolver = StandardResolver::new(StaticSource::new(&["fetch"]));
    let def = GraphNodeDef::action("fetch").on("_success", GraphNodeDef::action("missing"));

    let err = resolver.resolve("page", &def).await.unwrap_err();
    assert!(matches!(err, ResolveError::ActionNotFound { alias } if alias == "missing"));
  }

  #[tokio::test]
  async fn test_factory_error_is_reported() {
    let resolver = StandardResolver::new(StaticSource::new(&[]));
    let err = resolver
      .resolve("page", &GraphNodeDef::action("broken"))
      .await
      .unwrap_err();
    assert!(matches!(err, ResolveError::Action { .. }));
  }

  #[tokio::test]
  async fn test_invalid_node_is_error() {
    let resolver = StandardResolver::new(StaticSource::new(&[]));
    let err = resolver
      .resolve("page", &GraphNodeDef::default())
      .await
      .unwrap_err();
    assert!(matches!(err, ResolveError::InvalidNode { task, .. } if task == "page"));
  }
}
