//! Runtime errors.

use halyard_config::ConfigError;
use halyard_workflow::WorkflowError;

/// Errors that can occur during runtime operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// `start_workflow` was called outside a tokio runtime.
  #[error("no tokio runtime available to run the workflow instance")]
  NoAsyncRuntime,

  /// No definition registered under this workflow type.
  #[error("workflow type '{workflow_type}' is not registered")]
  WorkflowTypeNotFound { workflow_type: String },

  /// A definition with this workflow type is already registered.
  #[error("workflow type '{workflow_type}' is already registered")]
  DuplicateWorkflowType { workflow_type: String },

  /// An instance with this ID is still running.
  #[error("workflow '{workflow_id}' is already running")]
  WorkflowAlreadyStarted { workflow_id: String },

  /// No instance with this ID was ever started by this runtime.
  #[error("no workflow with id '{workflow_id}'")]
  StaleWorkflowHandle { workflow_id: String },

  /// No update with this ID was ever submitted to the workflow.
  #[error("no update with id '{update_id}' on workflow '{workflow_id}'")]
  StaleUpdateHandle {
    workflow_id: String,
    update_id: String,
  },

  /// The update's validator refused it. The workflow state is untouched.
  #[error("update '{update_id}' rejected: {reason}")]
  UpdateRejected { update_id: String, reason: String },

  /// A handler failed after validation passed. The workflow has failed.
  #[error("handler fault in workflow '{workflow_id}': {message}")]
  HandlerFault {
    workflow_id: String,
    update_id: Option<String>,
    message: String,
  },

  /// The workflow has completed, failed, or been cancelled and takes no more requests.
  #[error("workflow '{workflow_id}' is closed")]
  WorkflowClosed { workflow_id: String },

  /// The instance task went away without recording an outcome.
  #[error("workflow '{workflow_id}' stopped without recording an outcome")]
  InstanceLost { workflow_id: String },

  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,

  #[error("invalid workflow definition")]
  Definition(#[from] WorkflowError),

  #[error("invalid runtime configuration")]
  Config(#[from] ConfigError),
}
