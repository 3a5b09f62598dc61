use std::fmt;

use serde::{Deserialize, Serialize};

/// The single mutable value owned by a workflow instance.
///
/// Every instance starts at [`WorkflowState::INITIAL`]. Only an accepted
/// update or a signal handler may replace it, and once it has left `INITIAL`
/// it never returns there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowState(String);

impl WorkflowState {
  /// The sentinel every instance starts from.
  pub const INITIAL: &'static str = "";

  pub fn initial() -> Self {
    Self(Self::INITIAL.to_string())
  }

  pub fn new(value: impl Into<String>) -> Self {
    Self(value.into())
  }

  pub fn is_initial(&self) -> bool {
    self.0 == Self::INITIAL
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

impl fmt::Display for WorkflowState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for WorkflowState {
  fn from(value: String) -> Self {
    Self(value)
  }
}

impl From<&str> for WorkflowState {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

impl PartialEq<str> for WorkflowState {
  fn eq(&self, other: &str) -> bool {
    self.0 == other
  }
}

impl PartialEq<&str> for WorkflowState {
  fn eq(&self, other: &&str) -> bool {
    self.0 == *other
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_initial_state() {
    let state = WorkflowState::initial();
    assert!(state.is_initial());
    assert_eq!(state, WorkflowState::default());
    assert_eq!(state.as_str(), WorkflowState::INITIAL);
  }

  #[test]
  fn test_non_initial_state() {
    let state = WorkflowState::from("update-arg");
    assert!(!state.is_initial());
    assert_eq!(state, "update-arg");
    assert_eq!(state.to_string(), "update-arg");
  }

  #[test]
  fn test_serializes_as_plain_string() {
    let state = WorkflowState::new("called");
    assert_eq!(serde_json::to_value(&state).unwrap(), serde_json::json!("called"));

    let parsed: WorkflowState = serde_json::from_str("\"signal-data\"").unwrap();
    assert_eq!(parsed.into_inner(), "signal-data");
  }
}
