use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to parse configuration: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("command_buffer_size must be at least 1")]
  InvalidBufferSize,
}
