//! The workflow is updated by a task running alongside it, which finds the
//! instance through the runtime by workflow ID rather than holding a handle.

use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use halyard_runtime::{Applied, StartWorkflowOptions, WorkflowDefinition, WorkflowRuntime};

const WORKFLOW_TYPE: &str = "update-self";
const UPDATE_NAME: &str = "update!";
const EXPECTED_STATE: &str = "called";

pub fn definition() -> Result<WorkflowDefinition> {
  let mut definition = WorkflowDefinition::new(WORKFLOW_TYPE);
  definition.register_update(UPDATE_NAME, |_, _| Ok(Applied::new(EXPECTED_STATE, Value::Null)))?;
  definition.complete_when(|state| state == EXPECTED_STATE);
  Ok(definition)
}

pub async fn check(runtime: Arc<WorkflowRuntime>, cancel: CancellationToken) -> Result<()> {
  let handle = runtime.start_workflow(WORKFLOW_TYPE, StartWorkflowOptions::default(), cancel)?;

  let workflow_id = handle.workflow_id().to_string();
  let updater = tokio::spawn({
    let runtime = Arc::clone(&runtime);
    async move {
      let handle = runtime.workflow_handle(&workflow_id)?;
      handle.execute_update(UPDATE_NAME, Value::Null).await
    }
  });

  updater
    .await
    .context("update task panicked")?
    .context("self update failed")?;

  let completed = handle.result().await?;
  ensure!(
    completed.state == EXPECTED_STATE,
    "expected state == '{}' but found '{}'",
    EXPECTED_STATE,
    completed.state
  );
  Ok(())
}
