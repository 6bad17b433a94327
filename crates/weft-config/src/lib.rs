//! Weft Config
//!
//! Serializable configuration for weft: named actions (factory, config and an
//! optional `doAction` alias) and named task graphs. These are definitions only;
//! `weft-resolver` turns them into executable task graphs.
//!
//! ```json
//! {
//!   "actions": {
//!     "fetch": { "factory": "cb", "config": { ... }, "doAction": "fetch-raw" }
//!   },
//!   "tasks": {
//!     "page": { "action": "fetch", "on": { "_success": { "action": "render" } } }
//!   }
//! }
//! ```

mod action;
mod cache;
mod circuit_breaker;
mod error;
mod node;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use action::ActionFactoryOptions;
pub use cache::{CacheActionOptions, InMemoryCacheOptions};
pub use circuit_breaker::{CircuitBreakerActionOptions, CircuitBreakerOptions};
pub use error::ConfigError;
pub use node::{GraphNodeDef, NodeKind};

/// Fragment configuration key naming the task the fragment runs.
pub const TASK_KEY: &str = "task";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
  /// Action options keyed by alias.
  #[serde(default)]
  pub actions: BTreeMap<String, ActionFactoryOptions>,
  /// Task graphs keyed by task name.
  #[serde(default)]
  pub tasks: BTreeMap<String, GraphNodeDef>,
}

impl EngineConfig {
  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    let config: Self = serde_json::from_str(content)?;
    for (name, root) in &config.tasks {
      root.validate().map_err(|message| ConfigError::InvalidTask {
        task: name.clone(),
        message,
      })?;
    }
    Ok(config)
  }
}
