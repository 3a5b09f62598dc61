//! Workflow runtime.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use halyard_config::{RuntimeConfig, StartWorkflowOptions};
use halyard_workflow::{WorkflowDefinition, WorkflowState};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::controller::UpdateController;
use crate::error::RuntimeError;
use crate::events::{InstanceNotifier, NoopNotifier};
use crate::handle::{UpdateHandle, WorkflowHandle};
use crate::instance::WorkflowInstance;
use crate::outcome::Outcome;

/// The workflow runtime.
///
/// Holds registered workflow definitions and the instances started from them.
/// Generic over `N: InstanceNotifier` to allow different notification
/// strategies; use `WorkflowRuntime::new()` for no-op notifications.
pub struct WorkflowRuntime<N: InstanceNotifier = NoopNotifier> {
  config: RuntimeConfig,
  definitions: HashMap<String, Arc<WorkflowDefinition>>,
  instances: RwLock<HashMap<String, WorkflowHandle>>,
  notifier: Arc<N>,
}

impl WorkflowRuntime<NoopNotifier> {
  /// Create a new runtime with no-op notifications.
  pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
    Self::with_notifier(config, NoopNotifier)
  }
}

impl<N: InstanceNotifier + 'static> WorkflowRuntime<N> {
  /// Create a new runtime with a custom notifier.
  pub fn with_notifier(config: RuntimeConfig, notifier: N) -> Result<Self, RuntimeError> {
    config.validate()?;

    Ok(Self {
      config,
      definitions: HashMap::new(),
      instances: RwLock::new(HashMap::new()),
      notifier: Arc::new(notifier),
    })
  }

  /// Register a workflow type.
  pub fn register(&mut self, definition: WorkflowDefinition) -> Result<(), RuntimeError> {
    let workflow_type = definition.workflow_type().to_string();
    if self.definitions.contains_key(&workflow_type) {
      return Err(RuntimeError::DuplicateWorkflowType { workflow_type });
    }

    info!(
      workflow_type = %workflow_type,
      updates = ?definition.update_names().collect::<Vec<_>>(),
      signals = ?definition.signal_names().collect::<Vec<_>>(),
      "workflow_registered"
    );
    self.definitions.insert(workflow_type, Arc::new(definition));
    Ok(())
  }

  /// Start an instance of a registered workflow type.
  ///
  /// The instance runs on its own tokio task until its completion predicate
  /// holds, a handler fails, or `cancel` fires. A closed run under the same
  /// ID is replaced.
  ///
  /// # Errors
  /// `NoAsyncRuntime` outside a tokio runtime, `WorkflowTypeNotFound` for an
  /// unregistered type, `WorkflowAlreadyStarted` if an instance with the same
  /// ID is still running.
  pub fn start_workflow(
    &self,
    workflow_type: &str,
    options: StartWorkflowOptions,
    cancel: CancellationToken,
  ) -> Result<WorkflowHandle, RuntimeError> {
    let tokio_handle =
      tokio::runtime::Handle::try_current().map_err(|_| RuntimeError::NoAsyncRuntime)?;
    let definition = self
      .definitions
      .get(workflow_type)
      .cloned()
      .ok_or_else(|| RuntimeError::WorkflowTypeNotFound {
        workflow_type: workflow_type.to_string(),
      })?;

    let workflow_id = options
      .workflow_id
      .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let run_id = uuid::Uuid::new_v4().to_string();

    let mut instances = self
      .instances
      .write()
      .unwrap_or_else(PoisonError::into_inner);
    if instances
      .get(&workflow_id)
      .is_some_and(|existing| !existing.is_closed())
    {
      return Err(RuntimeError::WorkflowAlreadyStarted { workflow_id });
    }

    let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer_size);
    let (state_tx, state_rx) = watch::channel(WorkflowState::initial());
    let outcome = Outcome::new();
    let cancel = cancel.child_token();

    let handle = WorkflowHandle::new(
      run_id.clone(),
      UpdateController::new(workflow_id.clone(), command_tx),
      state_rx,
      outcome.waiter(),
      cancel.clone(),
    );
    let instance = WorkflowInstance::new(
      workflow_id.clone(),
      run_id,
      definition,
      state_tx,
      outcome,
      Arc::clone(&self.notifier),
    );

    tokio_handle.spawn(instance.run(command_rx, cancel));
    instances.insert(workflow_id, handle.clone());

    Ok(handle)
  }

  /// Resolve a handle to the latest instance started under `workflow_id`.
  pub fn workflow_handle(&self, workflow_id: &str) -> Result<WorkflowHandle, RuntimeError> {
    self
      .instances
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(workflow_id)
      .cloned()
      .ok_or_else(|| RuntimeError::StaleWorkflowHandle {
        workflow_id: workflow_id.to_string(),
      })
  }

  /// Resolve a handle to an update submitted to `workflow_id`.
  pub fn update_handle(
    &self,
    workflow_id: &str,
    update_id: &str,
  ) -> Result<UpdateHandle, RuntimeError> {
    self.workflow_handle(workflow_id)?.update_handle(update_id)
  }

  /// Drop a closed instance and every update handle recorded for it.
  ///
  /// Handles already held by callers keep working; only lookup by ID stops.
  ///
  /// # Errors
  /// `StaleWorkflowHandle` if nothing is recorded under `workflow_id`,
  /// `WorkflowAlreadyStarted` if the instance is still running.
  pub fn forget(&self, workflow_id: &str) -> Result<(), RuntimeError> {
    let mut instances = self
      .instances
      .write()
      .unwrap_or_else(PoisonError::into_inner);
    match instances.get(workflow_id) {
      None => Err(RuntimeError::StaleWorkflowHandle {
        workflow_id: workflow_id.to_string(),
      }),
      Some(handle) if !handle.is_closed() => Err(RuntimeError::WorkflowAlreadyStarted {
        workflow_id: workflow_id.to_string(),
      }),
      Some(_) => {
        instances.remove(workflow_id);
        debug!(workflow_id = %workflow_id, "workflow_forgotten");
        Ok(())
      }
    }
  }

  pub fn config(&self) -> &RuntimeConfig {
    &self.config
  }

  pub fn workflow_types(&self) -> impl Iterator<Item = &str> {
    self.definitions.keys().map(String::as_str)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use halyard_workflow::Applied;
  use serde_json::json;

  fn create_test_definition() -> WorkflowDefinition {
    let mut definition = WorkflowDefinition::new("test-workflow");
    definition
      .register_update("set", |_, arg| {
        Ok(Applied::new(arg.as_str().unwrap_or_default(), json!("ok")))
      })
      .unwrap();
    definition
  }

  fn create_test_runtime() -> WorkflowRuntime {
    let mut runtime = WorkflowRuntime::new(RuntimeConfig::default()).unwrap();
    runtime.register(create_test_definition()).unwrap();
    runtime
  }

  #[test]
  fn test_invalid_config_is_refused() {
    let config = RuntimeConfig {
      command_buffer_size: 0,
    };
    assert!(matches!(
      WorkflowRuntime::new(config),
      Err(RuntimeError::Config(_))
    ));
  }

  #[test]
  fn test_duplicate_registration() {
    let mut runtime = create_test_runtime();
    let err = runtime.register(create_test_definition()).unwrap_err();
    assert!(matches!(
      err,
      RuntimeError::DuplicateWorkflowType { workflow_type } if workflow_type == "test-workflow"
    ));
    assert_eq!(runtime.workflow_types().collect::<Vec<_>>(), vec!["test-workflow"]);
  }

  #[test]
  fn test_start_outside_tokio_runtime() {
    let runtime = create_test_runtime();
    let err = runtime
      .start_workflow("test-workflow", StartWorkflowOptions::default(), CancellationToken::new())
      .unwrap_err();
    assert!(matches!(err, RuntimeError::NoAsyncRuntime));
  }

  #[tokio::test]
  async fn test_forget_closed_workflow() {
    let runtime = create_test_runtime();
    let handle = runtime
      .start_workflow("test-workflow", StartWorkflowOptions::with_id("wf-1"), CancellationToken::new())
      .unwrap();

    assert!(matches!(
      runtime.forget("wf-1"),
      Err(RuntimeError::WorkflowAlreadyStarted { .. })
    ));

    let update = handle.start_update("set", json!("done")).await.unwrap();
    handle.result().await.unwrap();
    runtime.forget("wf-1").unwrap();

    assert!(matches!(
      runtime.workflow_handle("wf-1"),
      Err(RuntimeError::StaleWorkflowHandle { .. })
    ));
    assert!(matches!(
      runtime.update_handle("wf-1", update.id()),
      Err(RuntimeError::StaleWorkflowHandle { .. })
    ));
    assert!(matches!(
      runtime.forget("wf-1"),
      Err(RuntimeError::StaleWorkflowHandle { .. })
    ));

    // Callers' own handles still resolve.
    assert_eq!(update.result().await.unwrap(), json!("ok"));
    assert_eq!(handle.result().await.unwrap().state, "done");
  }

  #[tokio::test]
  async fn test_unknown_workflow_type() {
    let runtime = create_test_runtime();
    let err = runtime
      .start_workflow("missing", StartWorkflowOptions::default(), CancellationToken::new())
      .unwrap_err();
    assert!(matches!(err, RuntimeError::WorkflowTypeNotFound { .. }));
  }

  #[tokio::test]
  async fn test_start_assigns_ids() {
    let runtime = create_test_runtime();
    let handle = runtime
      .start_workflow("test-workflow", StartWorkflowOptions::default(), CancellationToken::new())
      .unwrap();

    assert!(!handle.workflow_id().is_empty());
    assert!(!handle.run_id().is_empty());
    assert!(handle.state().is_initial());

    let resolved = runtime.workflow_handle(handle.workflow_id()).unwrap();
    assert_eq!(resolved.run_id(), handle.run_id());
  }

  #[tokio::test]
  async fn test_running_workflow_id_cannot_be_reused() {
    let runtime = create_test_runtime();
    let options = StartWorkflowOptions::with_id("wf-1");
    runtime
      .start_workflow("test-workflow", options.clone(), CancellationToken::new())
      .unwrap();

    let err = runtime
      .start_workflow("test-workflow", options, CancellationToken::new())
      .unwrap_err();
    assert!(matches!(err, RuntimeError::WorkflowAlreadyStarted { workflow_id } if workflow_id == "wf-1"));
  }

  #[tokio::test]
  async fn test_completed_workflow_id_can_be_reused() {
    let runtime = create_test_runtime();
    let options = StartWorkflowOptions::with_id("wf-1");
    let first = runtime
      .start_workflow("test-workflow", options.clone(), CancellationToken::new())
      .unwrap();
    first.execute_update("set", json!("done")).await.unwrap();
    first.result().await.unwrap();

    let second = runtime
      .start_workflow("test-workflow", options, CancellationToken::new())
      .unwrap();
    assert_ne!(first.run_id(), second.run_id());
    assert_eq!(
      runtime.workflow_handle("wf-1").unwrap().run_id(),
      second.run_id()
    );
  }

  #[tokio::test]
  async fn test_stale_handles() {
    let runtime = create_test_runtime();
    assert!(matches!(
      runtime.workflow_handle("nope"),
      Err(RuntimeError::StaleWorkflowHandle { .. })
    ));

    let handle = runtime
      .start_workflow("test-workflow", StartWorkflowOptions::default(), CancellationToken::new())
      .unwrap();
    assert!(matches!(
      runtime.update_handle(handle.workflow_id(), "nope"),
      Err(RuntimeError::StaleUpdateHandle { .. })
    ));
  }

  #[tokio::test]
  async fn test_update_handle_resolves_by_id() {
    let runtime = create_test_runtime();
    let handle = runtime
      .start_workflow("test-workflow", StartWorkflowOptions::default(), CancellationToken::new())
      .unwrap();

    let update = handle.start_update("set", json!("value")).await.unwrap();
    let resolved = runtime.update_handle(handle.workflow_id(), update.id()).unwrap();

    assert_eq!(resolved.name(), "set");
    assert_eq!(resolved.result().await.unwrap(), json!("ok"));
    assert_eq!(update.result().await.unwrap(), json!("ok"));
  }
}
