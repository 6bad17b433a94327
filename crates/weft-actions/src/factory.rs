use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use weft_fragment::{ActionError, ActionRef};

use crate::cache::InMemoryCacheActionFactory;
use crate::circuit_breaker::CircuitBreakerActionFactory;
use crate::library::{
  CopyPayloadKeyActionFactory, InlineBodyActionFactory, InlinePayloadActionFactory,
  PayloadToBodyActionFactory,
};

/// Builds actions of one kind.
pub trait ActionFactory: Send + Sync {
  /// Name actions refer to in their `factory` option.
  fn name(&self) -> &str;

  /// Whether the provider may build one action per alias and share it.
  fn cacheable(&self) -> bool {
    false
  }

  fn create(
    &self,
    alias: &str,
    config: &Value,
    do_action: Option<ActionRef>,
  ) -> Result<ActionRef, ActionError>;
}

/// Factories available to an [`ActionProvider`](crate::ActionProvider), by name.
#[derive(Clone, Default)]
pub struct FactoryRegistry {
  factories: HashMap<String, Arc<dyn ActionFactory>>,
}

impl FactoryRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with every built-in factory.
  pub fn with_defaults() -> Self {
    let mut registry = Self::new();
    registry.register(CircuitBreakerActionFactory);
    registry.register(InMemoryCacheActionFactory);
    registry.register(InlineBodyActionFactory);
    registry.register(InlinePayloadActionFactory);
    registry.register(CopyPayloadKeyActionFactory);
    registry.register(PayloadToBodyActionFactory);
    registry
  }

  /// Add a factory, replacing any factory registered under the same name.
  pub fn register(&mut self, factory: impl ActionFactory + 'static) -> &mut Self {
    self
      .factories
      .insert(factory.name().to_string(), Arc::new(factory));
    self
  }

  pub fn get(&self, name: &str) -> Option<Arc<dyn ActionFactory>> {
    self.factories.get(name).cloned()
  }

  pub fn names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }
}
