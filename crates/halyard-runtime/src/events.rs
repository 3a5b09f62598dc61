//! Instance events and notifiers for observability.
//!
//! Events are emitted by the instance task as it admits, rejects, and applies
//! requests, so consumers can persist history, stream progress, etc.

use halyard_workflow::WorkflowState;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted by a workflow instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstanceEvent {
  /// The instance task has started.
  WorkflowStarted {
    workflow_id: String,
    run_id: String,
    workflow_type: String,
  },

  /// An update passed validation and its handler is about to run.
  UpdateAccepted {
    workflow_id: String,
    update_id: String,
    name: String,
  },

  /// An update was refused without running its handler.
  UpdateRejected {
    workflow_id: String,
    update_id: String,
    name: String,
    reason: String,
  },

  /// An update's handler ran and its state was committed.
  UpdateCompleted {
    workflow_id: String,
    update_id: String,
    name: String,
    result: serde_json::Value,
  },

  /// An update's handler failed.
  UpdateFaulted {
    workflow_id: String,
    update_id: String,
    name: String,
    message: String,
  },

  /// A signal was applied.
  SignalApplied { workflow_id: String, name: String },

  /// The committed state changed.
  StateChanged {
    workflow_id: String,
    state: WorkflowState,
  },

  WorkflowCompleted {
    workflow_id: String,
    run_id: String,
    state: WorkflowState,
  },

  WorkflowFailed {
    workflow_id: String,
    run_id: String,
    error: String,
  },

  WorkflowCancelled { workflow_id: String, run_id: String },
}

/// Trait for receiving instance events.
///
/// The instance task calls `notify` synchronously from its single-writer loop,
/// so implementations must not block.
pub trait InstanceNotifier: Send + Sync {
  fn notify(&self, event: InstanceEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl InstanceNotifier for NoopNotifier {
  fn notify(&self, _event: InstanceEvent) {}
}

/// A notifier that sends events to an unbounded channel.
///
/// Unbounded so a slow consumer never stalls the instance task.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<InstanceEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<InstanceEvent>) -> Self {
    Self { sender }
  }
}

impl InstanceNotifier for ChannelNotifier {
  fn notify(&self, event: InstanceEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_channel_notifier_forwards_events() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let notifier = ChannelNotifier::new(tx);

    notifier.notify(InstanceEvent::SignalApplied {
      workflow_id: "wf".to_string(),
      name: "mySignal".to_string(),
    });

    assert_eq!(
      rx.try_recv().unwrap(),
      InstanceEvent::SignalApplied {
        workflow_id: "wf".to_string(),
        name: "mySignal".to_string(),
      }
    );
  }

  #[test]
  fn test_channel_notifier_ignores_closed_receiver() {
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);

    ChannelNotifier::new(tx).notify(InstanceEvent::WorkflowCancelled {
      workflow_id: "wf".to_string(),
      run_id: "run".to_string(),
    });
  }
}
