//! Same workflow as `update/basic`, driven through update handles: submit,
//! get a handle back immediately, then wait on it.

use anyhow::{Result, ensure};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use halyard_runtime::{
  RuntimeError, StartWorkflowOptions, UpdateOutcome, WorkflowDefinition, WorkflowRuntime,
};

use super::update_basic::{
  BAD_UPDATE_ARG, UPDATE_ARG, UPDATE_NAME, UPDATE_RESULT, validated_update_workflow,
};

const WORKFLOW_TYPE: &str = "update-basic-async";

pub fn definition() -> Result<WorkflowDefinition> {
  validated_update_workflow(WORKFLOW_TYPE)
}

pub async fn check(runtime: &WorkflowRuntime, cancel: CancellationToken) -> Result<()> {
  let handle = runtime.start_workflow(WORKFLOW_TYPE, StartWorkflowOptions::default(), cancel)?;

  let bad = handle.start_update(UPDATE_NAME, json!(BAD_UPDATE_ARG)).await?;
  let rejected = bad.result().await;
  ensure!(
    matches!(rejected, Err(RuntimeError::UpdateRejected { .. })),
    "expected the update to be rejected, got {:?}",
    rejected
  );
  ensure!(
    matches!(bad.poll(), Some(UpdateOutcome::Rejected { .. })),
    "rejection was not recorded on the handle"
  );
  ensure!(handle.poll().is_none(), "workflow finished after a rejected update");

  let good = handle.start_update(UPDATE_NAME, json!(UPDATE_ARG)).await?;
  let result = good.result().await?;
  ensure!(
    result == Value::from(UPDATE_RESULT),
    "unexpected update result {}",
    result
  );

  let completed = handle.result().await?;
  ensure!(
    completed.state == UPDATE_ARG,
    "unexpected workflow result '{}'",
    completed.state
  );
  Ok(())
}
