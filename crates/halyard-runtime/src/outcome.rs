//! Terminal outcomes and the broadcast-once cells that carry them.
//!
//! An [`Outcome`] is written at most once, by the instance task. Any number of
//! [`OutcomeWaiter`]s observe the same value, however late they start waiting.
//! If the writer is dropped without recording anything, waiters wake with
//! `None` instead of hanging.

use halyard_workflow::WorkflowState;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Terminal outcome of a single update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateOutcome {
  /// Refused before the handler ran. No state was changed.
  Rejected { reason: String },
  /// The handler ran and its new state was committed.
  Completed { result: serde_json::Value },
  /// The handler failed after validation passed.
  Faulted { message: String },
  /// The instance was cancelled before the update was processed.
  Cancelled,
}

/// Value returned when a workflow instance completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
  pub workflow_id: String,
  pub run_id: String,
  /// State at the moment the completion predicate first held.
  pub state: WorkflowState,
}

/// Terminal outcome of a workflow instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowOutcome {
  Completed(WorkflowResult),
  Failed {
    update_id: Option<String>,
    message: String,
  },
  Cancelled,
}

/// Write side of a broadcast-once cell.
pub(crate) struct Outcome<T> {
  tx: watch::Sender<Option<T>>,
}

impl<T: Clone> Outcome<T> {
  pub(crate) fn new() -> Self {
    let (tx, _rx) = watch::channel(None);
    Self { tx }
  }

  pub(crate) fn waiter(&self) -> OutcomeWaiter<T> {
    OutcomeWaiter {
      rx: self.tx.subscribe(),
    }
  }

  /// Record the terminal value. Returns `false`, leaving the cell untouched,
  /// if a value was already recorded.
  pub(crate) fn set(&self, value: T) -> bool {
    let mut value = Some(value);
    self.tx.send_if_modified(|slot| {
      if slot.is_some() {
        return false;
      }
      *slot = value.take();
      true
    })
  }

  pub(crate) fn is_set(&self) -> bool {
    self.tx.borrow().is_some()
  }

  pub(crate) fn get(&self) -> Option<T> {
    self.tx.borrow().clone()
  }
}

/// Read side of a broadcast-once cell.
#[derive(Clone)]
pub(crate) struct OutcomeWaiter<T> {
  rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> OutcomeWaiter<T> {
  /// The recorded value, if any, without waiting.
  pub(crate) fn peek(&self) -> Option<T> {
    self.rx.borrow().clone()
  }

  /// Wait for the recorded value. Returns `None` if the writer was dropped
  /// before recording one.
  pub(crate) async fn wait(&self) -> Option<T> {
    let mut rx = self.rx.clone();
    match rx.wait_for(Option::is_some).await {
      Ok(slot) => slot.clone(),
      Err(_) => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn test_set_is_exactly_once() {
    let outcome = Outcome::new();
    assert!(!outcome.is_set());

    assert!(outcome.set(1));
    assert!(!outcome.set(2));

    assert_eq!(outcome.get(), Some(1));
    assert_eq!(outcome.waiter().wait().await, Some(1));
  }

  #[tokio::test]
  async fn test_waiters_started_before_and_after_set_agree() {
    let outcome = Outcome::new();
    let early = outcome.waiter();
    assert_eq!(early.peek(), None);

    let pending = tokio::spawn(async move { early.wait().await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    outcome.set("done".to_string());
    let late = outcome.waiter();

    assert_eq!(pending.await.unwrap(), Some("done".to_string()));
    assert_eq!(late.wait().await, Some("done".to_string()));
    assert_eq!(late.peek(), Some("done".to_string()));
  }

  #[tokio::test]
  async fn test_dropped_writer_wakes_waiters() {
    let outcome: Outcome<u32> = Outcome::new();
    let waiter = outcome.waiter();

    let pending = tokio::spawn(async move { waiter.wait().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(outcome);

    assert_eq!(pending.await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_value_survives_writer_drop() {
    let outcome = Outcome::new();
    let waiter = outcome.waiter();
    outcome.set(7u32);
    drop(outcome);

    assert_eq!(waiter.wait().await, Some(7));
  }

  #[test]
  fn test_update_outcome_serialization() {
    let rejected = UpdateOutcome::Rejected {
      reason: "Invalid Update argument".to_string(),
    };
    assert_eq!(
      serde_json::to_value(&rejected).unwrap(),
      serde_json::json!({"status": "rejected", "reason": "Invalid Update argument"})
    );
    assert_eq!(
      serde_json::to_value(UpdateOutcome::Cancelled).unwrap(),
      serde_json::json!({"status": "cancelled"})
    );
  }
}
