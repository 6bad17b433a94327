//! The fragment value carried through a task graph.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A unit of page content.
///
/// `id`, `type` and `configuration` are fixed at creation. `body` and
/// `payload` are rewritten by actions as the fragment moves through its task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
  #[serde(default = "new_id")]
  id: String,
  #[serde(rename = "type")]
  fragment_type: String,
  #[serde(default)]
  configuration: Map<String, Value>,
  #[serde(default)]
  body: String,
  #[serde(default)]
  payload: Map<String, Value>,
}

fn new_id() -> String {
  uuid::Uuid::new_v4().to_string()
}

impl Fragment {
  /// Create a fragment with a fresh random id and an empty payload.
  pub fn new(
    fragment_type: impl Into<String>,
    configuration: Map<String, Value>,
    body: impl Into<String>,
  ) -> Self {
    Self::with_id(new_id(), fragment_type, configuration, body)
  }

  /// Create a fragment with a caller-chosen id.
  pub fn with_id(
    id: impl Into<String>,
    fragment_type: impl Into<String>,
    configuration: Map<String, Value>,
    body: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      fragment_type: fragment_type.into(),
      configuration,
      body: body.into(),
      payload: Map::new(),
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn fragment_type(&self) -> &str {
    &self.fragment_type
  }

  pub fn configuration(&self) -> &Map<String, Value> {
    &self.configuration
  }

  pub fn body(&self) -> &str {
    &self.body
  }

  pub fn set_body(&mut self, body: impl Into<String>) {
    self.body = body.into();
  }

  pub fn payload(&self) -> &Map<String, Value> {
    &self.payload
  }

  /// Put `value` under `key`, replacing what was there.
  pub fn append_payload(&mut self, key: impl Into<String>, value: Value) {
    self.payload.insert(key.into(), value);
  }

  /// Merge every entry of `other` into the payload. On key collision the
  /// incoming value wins.
  pub fn merge_in_payload(&mut self, other: Map<String, Value>) {
    self.payload.extend(other);
  }
}
