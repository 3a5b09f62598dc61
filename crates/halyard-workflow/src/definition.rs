use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{HandlerError, ValidationError, WorkflowError};
use crate::state::WorkflowState;

/// Checks an update argument against the current state. Must not mutate anything.
pub type Validator =
  Arc<dyn Fn(&WorkflowState, &Value) -> Result<(), ValidationError> + Send + Sync>;

/// Body of an accepted update: maps the current state to a new state and a result.
pub type UpdateFn =
  Arc<dyn Fn(&WorkflowState, &Value) -> Result<Applied, HandlerError> + Send + Sync>;

/// Body of a signal: maps the current state to a new state. Signals have no result.
pub type SignalFn =
  Arc<dyn Fn(&WorkflowState, &Value) -> Result<WorkflowState, HandlerError> + Send + Sync>;

/// The condition a workflow instance waits on before reporting its result.
pub type CompletionPredicate = Arc<dyn Fn(&WorkflowState) -> bool + Send + Sync>;

/// Output of an update handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
  /// State to commit. May equal the state the handler was given.
  pub state: WorkflowState,
  /// Value delivered to the update's callers.
  pub result: Value,
}

impl Applied {
  pub fn new(state: impl Into<WorkflowState>, result: Value) -> Self {
    Self {
      state: state.into(),
      result,
    }
  }
}

/// A named update: optional validator plus the handler that applies it.
#[derive(Clone)]
pub struct UpdateDescriptor {
  pub name: String,
  pub validator: Option<Validator>,
  pub apply: UpdateFn,
}

impl UpdateDescriptor {
  /// Run the validator, if any. An update without a validator is always admitted.
  pub fn validate(&self, state: &WorkflowState, arg: &Value) -> Result<(), ValidationError> {
    match &self.validator {
      Some(validator) => validator(state, arg),
      None => Ok(()),
    }
  }

  pub fn apply(&self, state: &WorkflowState, arg: &Value) -> Result<Applied, HandlerError> {
    (self.apply)(state, arg)
  }

  pub fn has_validator(&self) -> bool {
    self.validator.is_some()
  }
}

impl fmt::Debug for UpdateDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UpdateDescriptor")
      .field("name", &self.name)
      .field("has_validator", &self.has_validator())
      .finish_non_exhaustive()
  }
}

#[derive(Clone)]
pub struct SignalDescriptor {
  pub name: String,
  pub apply: SignalFn,
}

impl SignalDescriptor {
  pub fn apply(&self, state: &WorkflowState, arg: &Value) -> Result<WorkflowState, HandlerError> {
    (self.apply)(state, arg)
  }
}

impl fmt::Debug for SignalDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SignalDescriptor")
      .field("name", &self.name)
      .finish_non_exhaustive()
  }
}

/// A workflow type: its update and signal handlers and its completion predicate.
///
/// The default completion predicate holds once the state has left
/// [`WorkflowState::INITIAL`].
#[derive(Clone)]
pub struct WorkflowDefinition {
  workflow_type: String,
  updates: HashMap<String, UpdateDescriptor>,
  signals: HashMap<String, SignalDescriptor>,
  completion: CompletionPredicate,
}

impl WorkflowDefinition {
  pub fn new(workflow_type: impl Into<String>) -> Self {
    Self {
      workflow_type: workflow_type.into(),
      updates: HashMap::new(),
      signals: HashMap::new(),
      completion: Arc::new(|state: &WorkflowState| !state.is_initial()),
    }
  }

  pub fn workflow_type(&self) -> &str {
    &self.workflow_type
  }

  /// Register an update handler with no validator.
  pub fn register_update<H>(&mut self, name: impl Into<String>, handler: H) -> Result<(), WorkflowError>
  where
    H: Fn(&WorkflowState, &Value) -> Result<Applied, HandlerError> + Send + Sync + 'static,
  {
    self.insert_update(name.into(), None, Arc::new(handler))
  }

  /// Register an update handler guarded by a validator.
  pub fn register_update_with_validator<V, H>(
    &mut self,
    name: impl Into<String>,
    validator: V,
    handler: H,
  ) -> Result<(), WorkflowError>
  where
    V: Fn(&WorkflowState, &Value) -> Result<(), ValidationError> + Send + Sync + 'static,
    H: Fn(&WorkflowState, &Value) -> Result<Applied, HandlerError> + Send + Sync + 'static,
  {
    self.insert_update(name.into(), Some(Arc::new(validator)), Arc::new(handler))
  }

  fn insert_update(
    &mut self,
    name: String,
    validator: Option<Validator>,
    apply: UpdateFn,
  ) -> Result<(), WorkflowError> {
    if name.is_empty() {
      return Err(WorkflowError::EmptyHandlerName);
    }
    if self.updates.contains_key(&name) {
      return Err(WorkflowError::DuplicateUpdate(name));
    }

    self.updates.insert(
      name.clone(),
      UpdateDescriptor {
        name,
        validator,
        apply,
      },
    );
    Ok(())
  }

  pub fn register_signal<H>(&mut self, name: impl Into<String>, handler: H) -> Result<(), WorkflowError>
  where
    H: Fn(&WorkflowState, &Value) -> Result<WorkflowState, HandlerError> + Send + Sync + 'static,
  {
    let name = name.into();
    if name.is_empty() {
      return Err(WorkflowError::EmptyHandlerName);
    }
    if self.signals.contains_key(&name) {
      return Err(WorkflowError::DuplicateSignal(name));
    }

    self.signals.insert(
      name.clone(),
      SignalDescriptor {
        name,
        apply: Arc::new(handler),
      },
    );
    Ok(())
  }

  /// Replace the completion predicate.
  pub fn complete_when<P>(&mut self, predicate: P)
  where
    P: Fn(&WorkflowState) -> bool + Send + Sync + 'static,
  {
    self.completion = Arc::new(predicate);
  }

  pub fn update(&self, name: &str) -> Option<&UpdateDescriptor> {
    self.updates.get(name)
  }

  pub fn signal(&self, name: &str) -> Option<&SignalDescriptor> {
    self.signals.get(name)
  }

  pub fn update_names(&self) -> impl Iterator<Item = &str> {
    self.updates.keys().map(String::as_str)
  }

  pub fn signal_names(&self) -> impl Iterator<Item = &str> {
    self.signals.keys().map(String::as_str)
  }

  /// Evaluate the completion predicate against `state`.
  pub fn is_complete(&self, state: &WorkflowState) -> bool {
    (self.completion)(state)
  }
}

impl fmt::Debug for WorkflowDefinition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WorkflowDefinition")
      .field("workflow_type", &self.workflow_type)
      .field("updates", &self.updates.keys().collect::<Vec<_>>())
      .field("signals", &self.signals.keys().collect::<Vec<_>>())
      .finish_non_exhaustive()
  }
}
