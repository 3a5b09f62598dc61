//! Client handles.
//!
//! Handles are cheap to clone and never block the instance task. Any number of
//! callers may wait on the same handle; they all see the same terminal value,
//! and asking again after it is recorded returns it again with no side effects.

use std::fmt;

use halyard_workflow::WorkflowState;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::controller::UpdateController;
use crate::error::RuntimeError;
use crate::outcome::{OutcomeWaiter, UpdateOutcome, WorkflowOutcome, WorkflowResult};

/// A handle to one running (or finished) workflow instance.
#[derive(Clone)]
pub struct WorkflowHandle {
  run_id: String,
  controller: UpdateController,
  state: watch::Receiver<WorkflowState>,
  outcome: OutcomeWaiter<WorkflowOutcome>,
  cancel: CancellationToken,
}

impl WorkflowHandle {
  pub(crate) fn new(
    run_id: String,
    controller: UpdateController,
    state: watch::Receiver<WorkflowState>,
    outcome: OutcomeWaiter<WorkflowOutcome>,
    cancel: CancellationToken,
  ) -> Self {
    Self {
      run_id,
      controller,
      state,
      outcome,
      cancel,
    }
  }

  pub fn workflow_id(&self) -> &str {
    self.controller.workflow_id()
  }

  pub fn run_id(&self) -> &str {
    &self.run_id
  }

  /// Submit an update and return as soon as it is queued.
  ///
  /// # Errors
  /// Returns `WorkflowClosed` if the instance no longer takes requests.
  pub async fn start_update(&self, name: &str, arg: Value) -> Result<UpdateHandle, RuntimeError> {
    self.controller.submit(name, arg).await
  }

  /// Submit an update and wait for its result.
  pub async fn execute_update(&self, name: &str, arg: Value) -> Result<Value, RuntimeError> {
    self.start_update(name, arg).await?.result().await
  }

  /// Resolve a handle for an update previously submitted to this workflow.
  pub fn update_handle(&self, update_id: &str) -> Result<UpdateHandle, RuntimeError> {
    self.controller.lookup(update_id)
  }

  /// Send a signal. Returns once the signal is queued.
  pub async fn signal(&self, name: &str, arg: Value) -> Result<(), RuntimeError> {
    self.controller.signal(name, arg).await
  }

  /// The latest committed state.
  pub fn state(&self) -> WorkflowState {
    self.state.borrow().clone()
  }

  /// The workflow outcome, if one has been recorded.
  pub fn poll(&self) -> Option<WorkflowOutcome> {
    self.outcome.peek()
  }

  pub fn is_closed(&self) -> bool {
    self.poll().is_some()
  }

  /// Wait for the workflow's terminal outcome.
  pub async fn outcome(&self) -> Result<WorkflowOutcome, RuntimeError> {
    self
      .outcome
      .wait()
      .await
      .ok_or_else(|| RuntimeError::InstanceLost {
        workflow_id: self.workflow_id().to_string(),
      })
  }

  /// Wait for the workflow to complete and return its result.
  ///
  /// # Errors
  /// `HandlerFault` if a handler failed, `Cancelled` if the instance was cancelled.
  pub async fn result(&self) -> Result<WorkflowResult, RuntimeError> {
    match self.outcome().await? {
      WorkflowOutcome::Completed(result) => Ok(result),
      WorkflowOutcome::Failed { update_id, message } => Err(RuntimeError::HandlerFault {
        workflow_id: self.workflow_id().to_string(),
        update_id,
        message,
      }),
      WorkflowOutcome::Cancelled => Err(RuntimeError::Cancelled),
    }
  }

  /// Cancel the instance. Pending updates resolve as `Cancelled`.
  pub fn cancel(&self) {
    self.cancel.cancel();
  }
}

impl fmt::Debug for WorkflowHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WorkflowHandle")
      .field("workflow_id", &self.workflow_id())
      .field("run_id", &self.run_id)
      .finish_non_exhaustive()
  }
}

/// A handle to one submitted update.
#[derive(Clone)]
pub struct UpdateHandle {
  workflow_id: String,
  update_id: String,
  name: String,
  outcome: OutcomeWaiter<UpdateOutcome>,
}

impl UpdateHandle {
  pub(crate) fn new(
    workflow_id: String,
    update_id: String,
    name: String,
    outcome: OutcomeWaiter<UpdateOutcome>,
  ) -> Self {
    Self {
      workflow_id,
      update_id,
      name,
      outcome,
    }
  }

  pub fn id(&self) -> &str {
    &self.update_id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn workflow_id(&self) -> &str {
    &self.workflow_id
  }

  /// The outcome, if one has been recorded. `None` means not yet processed,
  /// which is never the same as rejected.
  pub fn poll(&self) -> Option<UpdateOutcome> {
    self.outcome.peek()
  }

  /// Wait for the update's terminal outcome.
  pub async fn outcome(&self) -> Result<UpdateOutcome, RuntimeError> {
    self
      .outcome
      .wait()
      .await
      .ok_or_else(|| RuntimeError::InstanceLost {
        workflow_id: self.workflow_id.clone(),
      })
  }

  /// Wait for the update to finish and return the handler's result.
  ///
  /// # Errors
  /// `UpdateRejected` if validation refused it, `HandlerFault` if the handler
  /// failed, `Cancelled` if the instance was cancelled first.
  pub async fn result(&self) -> Result<Value, RuntimeError> {
    match self.outcome().await? {
      UpdateOutcome::Completed { result } => Ok(result),
      UpdateOutcome::Rejected { reason } => Err(RuntimeError::UpdateRejected {
        update_id: self.update_id.clone(),
        reason,
      }),
      UpdateOutcome::Faulted { message } => Err(RuntimeError::HandlerFault {
        workflow_id: self.workflow_id.clone(),
        update_id: Some(self.update_id.clone()),
        message,
      }),
      UpdateOutcome::Cancelled => Err(RuntimeError::Cancelled),
    }
  }
}

impl fmt::Debug for UpdateHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UpdateHandle")
      .field("workflow_id", &self.workflow_id)
      .field("update_id", &self.update_id)
      .field("name", &self.name)
      .finish_non_exhaustive()
  }
}
