//! Lookup-before-compute caching around a `doAction`.

mod action;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use weft_config::CacheActionOptions;
use weft_fragment::{ActionError, ActionLogLevel, ActionRef};

use crate::factory::ActionFactory;

pub use action::CacheAction;
pub use memory::InMemoryCache;

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("cache backend failure: {message}")]
  Backend { message: String },
}

/// Key/value store used by [`CacheAction`]. Eviction is the store's concern.
#[async_trait]
pub trait Cache: Send + Sync {
  async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

  async fn put(&self, key: &str, value: Value) -> Result<(), CacheError>;
}

/// Builds [`CacheAction`]s backed by an [`InMemoryCache`]. Registered as
/// `in-memory-cache`.
///
/// Cacheable, so each alias owns exactly one store for the provider's lifetime.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryCacheActionFactory;

impl ActionFactory for InMemoryCacheActionFactory {
  fn name(&self) -> &str {
    "in-memory-cache"
  }

  fn cacheable(&self) -> bool {
    true
  }

  fn create(
    &self,
    alias: &str,
    config: &Value,
    do_action: Option<ActionRef>,
  ) -> Result<ActionRef, ActionError> {
    let do_action = do_action.ok_or_else(|| ActionError::DoActionNotDefined {
      alias: alias.to_string(),
    })?;
    let options = CacheActionOptions::from_config(alias, config)
      .map_err(|e| ActionError::configuration(alias, e.to_string()))?;
    if options.payload_key.trim().is_empty() {
      return Err(ActionError::configuration(alias, "payloadKey must not be blank"));
    }
    if options.cache_key.trim().is_empty() {
      return Err(ActionError::configuration(alias, "cacheKey must not be blank"));
    }
    let log_level = ActionLogLevel::from_config(config, ActionLogLevel::Error)
      .map_err(|e| ActionError::configuration(alias, e.to_string()))?;

    let cache = Arc::new(InMemoryCache::new(options.cache.clone()));
    Ok(Arc::new(CacheAction::new(
      alias, options, cache, do_action, log_level,
    )))
  }
}
