use thiserror::Error;

/// Raised by a validator to reject an update before its handler runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ValidationError {
  pub reason: String,
}

impl ValidationError {
  pub fn new(reason: impl Into<String>) -> Self {
    Self {
      reason: reason.into(),
    }
  }
}

/// Raised by an update or signal handler after validation has passed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
  pub message: String,
}

impl HandlerError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("update handler already registered: {0}")]
  DuplicateUpdate(String),

  #[error("signal handler already registered: {0}")]
  DuplicateSignal(String),

  #[error("handler name must not be empty")]
  EmptyHandlerName,
}
