use std::collections::HashMap;

use tracing::debug;
use weft_config::TASK_KEY;
use weft_engine::Task;
use weft_fragment::Fragment;

/// Resolved tasks keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Tasks {
  tasks: HashMap<String, Task>,
}

impl Tasks {
  /// Add a task, replacing any task with the same name.
  pub fn insert(&mut self, task: Task) {
    self.tasks.insert(task.name().to_string(), task);
  }

  pub fn get(&self, name: &str) -> Option<&Task> {
    self.tasks.get(name)
  }

  /// The task named by the fragment's `task` configuration entry.
  ///
  /// Fragments without the entry, or naming an unknown task, get `None` and
  /// are passed through unprocessed.
  pub fn for_fragment(&self, fragment: &Fragment) -> Option<Task> {
    let name = fragment.configuration().get(TASK_KEY)?.as_str()?;
    let task = self.tasks.get(name).cloned();
    if task.is_none() {
      debug!(fragment_id = %fragment.id(), task = name, "fragment_task_not_found");
    }
    task
  }

  pub fn names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::{Map, json};

  fn fragment(configuration: serde_json::Value) -> Fragment {
    let configuration: Map<String, serde_json::Value> =
      serde_json::from_value(configuration).unwrap();
    Fragment::new("snippet", configuration, "")
  }

  #[test]
  fn test_fragment_selects_task_by_name() {
    let mut tasks = Tasks::default();
    tasks.insert(Task::empty("page"));
    tasks.insert(Task::empty("menu"));

    let task = tasks.for_fragment(&fragment(json!({"task": "menu"}))).unwrap();
    assert_eq!(task.name(), "menu");
    assert_eq!(tasks.names(), vec!["menu", "page"]);
  }

  #[test]
  fn test_missing_or_unknown_task_is_none() {
    let mut tasks = Tasks::default();
    tasks.insert(Task::empty("page"));

    assert!(tasks.for_fragment(&fragment(json!({}))).is_none());
    assert!(tasks.for_fragment(&fragment(json!({"task": "other"}))).is_none());
    assert!(tasks.for_fragment(&fragment(json!({"task": 3}))).is_none());
  }
}
