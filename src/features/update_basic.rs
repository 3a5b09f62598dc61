//! An update guarded by a validator. The rejected update leaves the state
//! alone; the accepted one sets it, which completes the workflow.

use anyhow::{Result, ensure};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use halyard_runtime::{
  Applied, RuntimeError, StartWorkflowOptions, ValidationError, WorkflowDefinition, WorkflowRuntime,
};

pub const WORKFLOW_TYPE: &str = "update-basic";
pub const UPDATE_NAME: &str = "my_update";
pub const UPDATE_ARG: &str = "update-arg";
pub const BAD_UPDATE_ARG: &str = "reject-me";
pub const UPDATE_RESULT: &str = "update-result";

pub fn definition() -> Result<WorkflowDefinition> {
  validated_update_workflow(WORKFLOW_TYPE)
}

/// A workflow whose single update sets the state to its argument unless the
/// argument is `BAD_UPDATE_ARG`.
pub fn validated_update_workflow(workflow_type: &str) -> Result<WorkflowDefinition> {
  let mut definition = WorkflowDefinition::new(workflow_type);
  definition.register_update_with_validator(
    UPDATE_NAME,
    |_, arg| match arg.as_str() {
      Some(BAD_UPDATE_ARG) => Err(ValidationError::new("Invalid Update argument")),
      Some(_) => Ok(()),
      None => Err(ValidationError::new("update argument must be a string")),
    },
    |_, arg| Ok(Applied::new(arg.as_str().unwrap_or_default(), json!(UPDATE_RESULT))),
  )?;
  Ok(definition)
}

pub async fn check(runtime: &WorkflowRuntime, cancel: CancellationToken) -> Result<()> {
  let handle = runtime.start_workflow(WORKFLOW_TYPE, StartWorkflowOptions::default(), cancel)?;

  let rejected = handle.execute_update(UPDATE_NAME, json!(BAD_UPDATE_ARG)).await;
  ensure!(
    matches!(rejected, Err(RuntimeError::UpdateRejected { .. })),
    "expected the update to be rejected, got {:?}",
    rejected
  );
  ensure!(handle.state().is_initial(), "rejected update changed the state");

  let result = handle.execute_update(UPDATE_NAME, json!(UPDATE_ARG)).await?;
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
