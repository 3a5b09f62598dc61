//! A signal carries the value the workflow completes with.

use anyhow::{Result, ensure};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use halyard_runtime::{
  HandlerError, StartWorkflowOptions, WorkflowDefinition, WorkflowRuntime, WorkflowState,
};

const WORKFLOW_TYPE: &str = "signal-basic";
const SIGNAL_NAME: &str = "mySignal";
const SIGNAL_DATA: &str = "signal-data";

pub fn definition() -> Result<WorkflowDefinition> {
  let mut definition = WorkflowDefinition::new(WORKFLOW_TYPE);
  definition.register_signal(SIGNAL_NAME, |_, arg| {
    arg
      .as_str()
      .map(WorkflowState::from)
      .ok_or_else(|| HandlerError::new("signal argument must be a string"))
  })?;
  Ok(definition)
}

pub async fn check(runtime: &WorkflowRuntime, cancel: CancellationToken) -> Result<()> {
  let handle = runtime.start_workflow(WORKFLOW_TYPE, StartWorkflowOptions::default(), cancel)?;
  handle.signal(SIGNAL_NAME, json!(SIGNAL_DATA)).await?;

  let completed = handle.result().await?;
  ensure!(
    completed.state == SIGNAL_DATA,
    "expected result '{}' but found '{}'",
    SIGNAL_DATA,
    completed.state
  );
  Ok(())
}
