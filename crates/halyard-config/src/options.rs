use serde::{Deserialize, Serialize};

/// Options for starting a single workflow instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWorkflowOptions {
  /// Workflow ID to use. A random ID is assigned when absent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub workflow_id: Option<String>,
}

impl StartWorkflowOptions {
  pub fn with_id(workflow_id: impl Into<String>) -> Self {
    Self {
      workflow_id: Some(workflow_id.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_workflow_id_is_optional() {
    let options: StartWorkflowOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(options, StartWorkflowOptions::default());
    assert_eq!(serde_json::to_string(&options).unwrap(), "{}");
  }

  #[test]
  fn test_with_id() {
    let options = StartWorkflowOptions::with_id("wf-1");
    assert_eq!(options.workflow_id.as_deref(), Some("wf-1"));
  }
}
