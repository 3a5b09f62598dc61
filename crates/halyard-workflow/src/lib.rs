//! Halyard Workflow
//!
//! This crate provides the definition side of a halyard workflow: the state a
//! workflow instance owns, the update and signal handlers that may change it,
//! and the completion predicate the instance waits on.
//!
//! Definitions are plain data plus closures. Handlers are resolved by name once
//! at registration time; the runtime never looks anything up by reflection.
//!
//! ```ignore
//! use halyard_workflow::{Applied, ValidationError, WorkflowDefinition};
//!
//! let mut definition = WorkflowDefinition::new("greeting");
//! definition.register_update_with_validator(
//!   "set_name",
//!   |_state, arg| match arg.as_str() {
//!     Some("") | None => Err(ValidationError::new("name must be a non-empty string")),
//!     Some(_) => Ok(()),
//!   },
//!   |_state, arg| Ok(Applied::new(arg.as_str().unwrap_or_default(), serde_json::json!("ok"))),
//! )?;
//! ```

mod definition;
mod error;
mod state;

pub use definition::{
  Applied, CompletionPredicate, SignalDescriptor, SignalFn, UpdateDescriptor, UpdateFn, Validator,
  WorkflowDefinition,
};
pub use error::{HandlerError, ValidationError, WorkflowError};
pub use state::WorkflowState;
