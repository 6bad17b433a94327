use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

/// Options of the cache action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheActionOptions {
  /// Payload key the wrapped action writes its result under.
  pub payload_key: String,
  /// Template rendered into the cache key.
  pub cache_key: String,
  pub fail_when_cache_get_fails: bool,
  pub fail_when_cache_put_fails: bool,
  pub log_level: Option<String>,
  /// Backing store options, used by the in-memory cache factory.
  pub cache: InMemoryCacheOptions,
}

impl CacheActionOptions {
  pub fn from_config(alias: &str, config: &Value) -> Result<Self, ConfigError> {
    serde_json::from_value(config.clone()).map_err(|source| ConfigError::InvalidOptions {
      alias: alias.to_string(),
      source,
    })
  }
}

/// Eviction policy of the in-memory cache. Durations are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InMemoryCacheOptions {
  pub enable_maximum_size: bool,
  pub maximum_size: usize,
  pub enable_ttl: bool,
  pub ttl: u64,
  pub enable_ttl_after_access: bool,
  pub ttl_after_access: u64,
}

impl Default for InMemoryCacheOptions {
  fn default() -> Self {
    Self {
      enable_maximum_size: true,
      maximum_size: 1000,
      enable_ttl: true,
      ttl: 5000,
      enable_ttl_after_access: false,
      ttl_after_access: 5000,
    }
  }
}
