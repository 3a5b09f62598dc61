//! Update controller.
//!
//! Intake happens on the caller's side: [`UpdateController::submit`] assigns
//! an update ID, queues the request, and returns a handle without waiting for
//! validation. Admission happens on the instance task in two phases:
//!
//! 1. Validate. A failing validator (or an unknown update name) records
//!    `Rejected` and the handler never runs.
//! 2. Apply. The handler runs, its new state is committed and checked against
//!    the completion predicate, and only then is `Completed` recorded.
//!
//! A handler failure records `Faulted` on the update and fails the workflow.
//! A panic in a validator counts as a rejection and a panic in a handler as a
//! handler failure, so the instance task itself never unwinds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use halyard_workflow::{HandlerError, ValidationError};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::RuntimeError;
use crate::events::{InstanceEvent, InstanceNotifier};
use crate::handle::UpdateHandle;
use crate::instance::{Command, WorkflowInstance, guarded};
use crate::outcome::{Outcome, OutcomeWaiter, UpdateOutcome};

/// One update on its way to the instance task.
pub(crate) struct UpdateRequest {
  pub(crate) update_id: String,
  pub(crate) name: String,
  pub(crate) arg: Value,
  pub(crate) outcome: Outcome<UpdateOutcome>,
}

#[derive(Clone)]
struct UpdateEntry {
  name: String,
  waiter: OutcomeWaiter<UpdateOutcome>,
}

/// Client side of the controller. Every clone feeds the same instance.
#[derive(Clone)]
pub(crate) struct UpdateController {
  workflow_id: String,
  commands: mpsc::Sender<Command>,
  updates: Arc<Mutex<HashMap<String, UpdateEntry>>>,
}

impl UpdateController {
  pub(crate) fn new(workflow_id: String, commands: mpsc::Sender<Command>) -> Self {
    Self {
      workflow_id,
      commands,
      updates: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  pub(crate) fn workflow_id(&self) -> &str {
    &self.workflow_id
  }

  /// Assign an ID and queue the update.
  ///
  /// Waits only for a free queue slot, never for validation or execution.
  pub(crate) async fn submit(&self, name: &str, arg: Value) -> Result<UpdateHandle, RuntimeError> {
    let update_id = uuid::Uuid::new_v4().to_string();
    let outcome = Outcome::new();
    let waiter = outcome.waiter();

    let request = UpdateRequest {
      update_id: update_id.clone(),
      name: name.to_string(),
      arg,
      outcome,
    };
    self
      .commands
      .send(Command::Update(request))
      .await
      .map_err(|_| RuntimeError::WorkflowClosed {
        workflow_id: self.workflow_id.clone(),
      })?;

    self.entries().insert(
      update_id.clone(),
      UpdateEntry {
        name: name.to_string(),
        waiter: waiter.clone(),
      },
    );

    debug!(
      workflow_id = %self.workflow_id,
      update_id = %update_id,
      update_name = %name,
      "update_admitted"
    );

    Ok(UpdateHandle::new(
      self.workflow_id.clone(),
      update_id,
      name.to_string(),
      waiter,
    ))
  }

  /// Resolve a handle for an update previously submitted through this controller.
  pub(crate) fn lookup(&self, update_id: &str) -> Result<UpdateHandle, RuntimeError> {
    let entry = self
      .entries()
      .get(update_id)
      .cloned()
      .ok_or_else(|| RuntimeError::StaleUpdateHandle {
        workflow_id: self.workflow_id.clone(),
        update_id: update_id.to_string(),
      })?;

    Ok(UpdateHandle::new(
      self.workflow_id.clone(),
      update_id.to_string(),
      entry.name,
      entry.waiter,
    ))
  }

  /// Queue a signal. Signals carry no result.
  pub(crate) async fn signal(&self, name: &str, arg: Value) -> Result<(), RuntimeError> {
    self
      .commands
      .send(Command::Signal {
        name: name.to_string(),
        arg,
      })
      .await
      .map_err(|_| RuntimeError::WorkflowClosed {
        workflow_id: self.workflow_id.clone(),
      })
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<String, UpdateEntry>> {
    // The map holds no cross-entry invariant, so a poisoned lock is still usable.
    self.updates.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Run both admission phases for one update. Called only from the instance task.
pub(crate) fn process<N: InstanceNotifier>(instance: &mut WorkflowInstance<N>, request: UpdateRequest) {
  let definition = instance.definition();
  let Some(update) = definition.update(&request.name) else {
    let reason = format!("unknown update '{}'", request.name);
    reject(instance, request, reason);
    return;
  };

  let validated = guarded(|| update.validate(instance.state(), &request.arg))
    .unwrap_or_else(|panic| Err(ValidationError::new(format!("validator panicked: {}", panic))));
  if let Err(e) = validated {
    reject(instance, request, e.reason);
    return;
  }

  info!(
    update_id = %request.update_id,
    update_name = %request.name,
    "update_accepted"
  );
  instance.notifier().notify(InstanceEvent::UpdateAccepted {
    workflow_id: instance.workflow_id().to_string(),
    update_id: request.update_id.clone(),
    name: request.name.clone(),
  });

  let applied = guarded(|| update.apply(instance.state(), &request.arg))
    .unwrap_or_else(|panic| Err(HandlerError::new(format!("handler panicked: {}", panic))))
    .and_then(|applied| {
      instance.commit(applied.state)?;
      Ok(applied.result)
    });

  match applied {
    Ok(result) => {
      info!(
        update_id = %request.update_id,
        update_name = %request.name,
        "update_completed"
      );
      instance.notifier().notify(InstanceEvent::UpdateCompleted {
        workflow_id: instance.workflow_id().to_string(),
        update_id: request.update_id.clone(),
        name: request.name.clone(),
        result: result.clone(),
      });
      request.outcome.set(UpdateOutcome::Completed { result });
    }
    Err(e) => {
      error!(
        update_id = %request.update_id,
        update_name = %request.name,
        error = %e,
        "update_faulted"
      );
      instance.fail(
        Some(request.update_id.clone()),
        format!("update '{}' failed: {}", request.name, e),
      );
      instance.notifier().notify(InstanceEvent::UpdateFaulted {
        workflow_id: instance.workflow_id().to_string(),
        update_id: request.update_id.clone(),
        name: request.name.clone(),
        message: e.message.clone(),
      });
      request.outcome.set(UpdateOutcome::Faulted { message: e.message });
    }
  }
}

/// Record `Rejected` for a request. The state is never touched.
pub(crate) fn reject<N: InstanceNotifier>(
  instance: &WorkflowInstance<N>,
  request: UpdateRequest,
  reason: String,
) {
  info!(
    update_id = %request.update_id,
    update_name = %request.name,
    reason = %reason,
    "update_rejected"
  );
  instance.notifier().notify(InstanceEvent::UpdateRejected {
    workflow_id: instance.workflow_id().to_string(),
    update_id: request.update_id.clone(),
    name: request.name.clone(),
    reason: reason.clone(),
  });
  request.outcome.set(UpdateOutcome::Rejected { reason });
}
