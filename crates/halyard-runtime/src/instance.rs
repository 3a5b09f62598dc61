//! Workflow instance.
//!
//! One instance runs as one tokio task and is the only writer of its
//! [`WorkflowState`]. Updates and signals reach it through a bounded command
//! queue and are applied strictly one at a time, so every state change is a
//! well-ordered step in a single-writer sequence.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use halyard_workflow::{HandlerError, WorkflowDefinition, WorkflowState};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::controller::{self, UpdateRequest};
use crate::events::{InstanceEvent, InstanceNotifier};
use crate::outcome::{Outcome, UpdateOutcome, WorkflowOutcome, WorkflowResult};

const COMPLETED_REASON: &str = "workflow execution already completed";
const FAILED_REASON: &str = "workflow execution failed";

/// Requests served by the instance task.
pub(crate) enum Command {
  Update(UpdateRequest),
  Signal { name: String, arg: Value },
}

pub(crate) struct WorkflowInstance<N> {
  workflow_id: String,
  run_id: String,
  definition: Arc<WorkflowDefinition>,
  state: WorkflowState,
  state_tx: watch::Sender<WorkflowState>,
  outcome: Outcome<WorkflowOutcome>,
  notifier: Arc<N>,
}

impl<N: InstanceNotifier> WorkflowInstance<N> {
  pub(crate) fn new(
    workflow_id: String,
    run_id: String,
    definition: Arc<WorkflowDefinition>,
    state_tx: watch::Sender<WorkflowState>,
    outcome: Outcome<WorkflowOutcome>,
    notifier: Arc<N>,
  ) -> Self {
    let state = state_tx.borrow().clone();
    Self {
      workflow_id,
      run_id,
      definition,
      state,
      state_tx,
      outcome,
      notifier,
    }
  }

  pub(crate) fn workflow_id(&self) -> &str {
    &self.workflow_id
  }

  pub(crate) fn definition(&self) -> Arc<WorkflowDefinition> {
    Arc::clone(&self.definition)
  }

  pub(crate) fn state(&self) -> &WorkflowState {
    &self.state
  }

  pub(crate) fn notifier(&self) -> &N {
    &self.notifier
  }

  /// True once the workflow outcome has been recorded.
  pub(crate) fn is_closed(&self) -> bool {
    self.outcome.is_set()
  }

  /// Serve commands until the completion predicate holds, the instance fails,
  /// or `cancel` fires. Requests still queued at that point are resolved
  /// without touching the state.
  #[instrument(
    name = "workflow_run",
    skip_all,
    fields(workflow_id = %self.workflow_id, run_id = %self.run_id)
  )]
  pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>, cancel: CancellationToken) {
    info!(
      workflow_type = %self.definition.workflow_type(),
      "workflow_started"
    );
    self.notifier.notify(InstanceEvent::WorkflowStarted {
      workflow_id: self.workflow_id.clone(),
      run_id: self.run_id.clone(),
      workflow_type: self.definition.workflow_type().to_string(),
    });

    if let Err(e) = self.check_completion() {
      self.fail(None, e.message);
    }

    while !self.is_closed() {
      tokio::select! {
        biased;
        _ = cancel.cancelled() => self.cancel(),
        command = commands.recv() => match command {
          Some(Command::Update(request)) => controller::process(&mut self, request),
          Some(Command::Signal { name, arg }) => self.apply_signal(&name, arg),
          None => {
            // Every sender is gone, nothing can reach or observe this instance.
            debug!("command channel closed before completion");
            return;
          }
        },
      }
    }

    commands.close();
    while let Some(command) = commands.recv().await {
      self.decline(command);
    }

    debug!("workflow_run_finished");
  }

  /// Commit new state produced by a handler, then re-evaluate the completion
  /// predicate against it.
  ///
  /// The state may not return to `INITIAL` once it has left it.
  pub(crate) fn commit(&mut self, next: WorkflowState) -> Result<(), HandlerError> {
    if next == self.state {
      return Ok(());
    }
    if next.is_initial() {
      return Err(HandlerError::new(format!(
        "handler attempted to revert state '{}' to initial",
        self.state
      )));
    }

    self.state = next;
    self.state_tx.send_replace(self.state.clone());

    debug!(state = %self.state, "state_changed");
    self.notifier.notify(InstanceEvent::StateChanged {
      workflow_id: self.workflow_id.clone(),
      state: self.state.clone(),
    });

    self.check_completion()
  }

  /// Mark the workflow failed. Only the first terminal outcome sticks.
  pub(crate) fn fail(&mut self, update_id: Option<String>, message: String) {
    let recorded = self.outcome.set(WorkflowOutcome::Failed {
      update_id,
      message: message.clone(),
    });
    if recorded {
      error!(error = %message, "workflow_failed");
      self.notifier.notify(InstanceEvent::WorkflowFailed {
        workflow_id: self.workflow_id.clone(),
        run_id: self.run_id.clone(),
        error: message,
      });
    }
  }

  fn check_completion(&mut self) -> Result<(), HandlerError> {
    if self.is_closed() {
      return Ok(());
    }
    let complete = guarded(|| self.definition.is_complete(&self.state)).map_err(|panic| {
      HandlerError::new(format!("completion predicate panicked: {}", panic))
    })?;
    if !complete {
      return Ok(());
    }

    let result = WorkflowResult {
      workflow_id: self.workflow_id.clone(),
      run_id: self.run_id.clone(),
      state: self.state.clone(),
    };
    if self.outcome.set(WorkflowOutcome::Completed(result)) {
      info!(result = %self.state, "workflow_completed");
      self.notifier.notify(InstanceEvent::WorkflowCompleted {
        workflow_id: self.workflow_id.clone(),
        run_id: self.run_id.clone(),
        state: self.state.clone(),
      });
    }
    Ok(())
  }

  fn cancel(&mut self) {
    if self.outcome.set(WorkflowOutcome::Cancelled) {
      warn!("workflow_cancelled");
      self.notifier.notify(InstanceEvent::WorkflowCancelled {
        workflow_id: self.workflow_id.clone(),
        run_id: self.run_id.clone(),
      });
    }
  }

  fn apply_signal(&mut self, name: &str, arg: Value) {
    let definition = self.definition();
    let Some(signal) = definition.signal(name) else {
      warn!(signal_name = %name, "signal_dropped: no handler registered");
      return;
    };

    let applied = guarded(|| signal.apply(&self.state, &arg))
      .unwrap_or_else(|panic| Err(HandlerError::new(format!("signal handler panicked: {}", panic))))
      .and_then(|next| self.commit(next));

    match applied {
      Ok(()) => {
        info!(signal_name = %name, "signal_applied");
        self.notifier.notify(InstanceEvent::SignalApplied {
          workflow_id: self.workflow_id.clone(),
          name: name.to_string(),
        });
      }
      Err(e) => self.fail(None, format!("signal '{}' failed: {}", name, e)),
    }
  }

  /// Resolve a request that was still queued when the instance closed.
  fn decline(&self, command: Command) {
    match command {
      Command::Update(request) => match self.outcome.get() {
        Some(WorkflowOutcome::Cancelled) => {
          debug!(update_id = %request.update_id, "update_cancelled");
          request.outcome.set(UpdateOutcome::Cancelled);
        }
        Some(WorkflowOutcome::Failed { .. }) => {
          controller::reject(self, request, FAILED_REASON.to_string());
        }
        _ => controller::reject(self, request, COMPLETED_REASON.to_string()),
      },
      Command::Signal { name, .. } => {
        debug!(signal_name = %name, "signal_dropped: workflow closed");
      }
    }
  }
}

/// Run user code on the instance task, turning a panic into its message.
pub(crate) fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
  panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic".to_string()
  }
}
