use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How to build the action registered under an alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionFactoryOptions {
  /// Name of the factory that builds the action.
  pub factory: String,
  /// Factory-specific configuration.
  #[serde(default = "empty_object")]
  pub config: Value,
  /// Alias of the action this one wraps.
  #[serde(default, rename = "doAction", skip_serializing_if = "Option::is_none")]
  pub do_action: Option<String>,
}

fn empty_object() -> Value {
  Value::Object(Default::default())
}

impl ActionFactoryOptions {
  pub fn new(factory: impl Into<String>, config: Value) -> Self {
    Self {
      factory: factory.into(),
      config,
      do_action: None,
    }
  }

  pub fn with_do_action(mut self, alias: impl Into<String>) -> Self {
    self.do_action = Some(alias.into());
    self
  }
}
