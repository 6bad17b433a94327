use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to parse configuration: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("invalid task '{task}': {message}")]
  InvalidTask { task: String, message: String },

  #[error("invalid options for action '{alias}': {source}")]
  InvalidOptions {
    alias: String,
    #[source]
    source: serde_json::Error,
  },
}
