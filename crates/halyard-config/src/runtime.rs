use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the workflow runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
  /// Capacity of each instance's command queue. Submitting an update or a
  /// signal waits for a free slot when the queue is full.
  pub command_buffer_size: usize,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      command_buffer_size: 100,
    }
  }
}

impl RuntimeConfig {
  /// Parse and validate a JSON configuration document.
  pub fn from_json(input: &str) -> Result<Self, ConfigError> {
    let config: Self = serde_json::from_str(input)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.command_buffer_size == 0 {
      return Err(ConfigError::InvalidBufferSize);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_object_uses_defaults() {
    let config = RuntimeConfig::from_json("{}").unwrap();
    assert_eq!(config, RuntimeConfig::default());
    assert_eq!(config.command_buffer_size, 100);
  }

  #[test]
  fn test_explicit_buffer_size() {
    let config = RuntimeConfig::from_json(r#"{"command_buffer_size": 8}"#).unwrap();
    assert_eq!(config.command_buffer_size, 8);
  }

  #[test]
  fn test_zero_buffer_size_is_invalid() {
    let err = RuntimeConfig::from_json(r#"{"command_buffer_size": 0}"#).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidBufferSize));
  }

  #[test]
  fn test_malformed_json_is_a_parse_error() {
    let err = RuntimeConfig::from_json("{not json").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
  }
}
