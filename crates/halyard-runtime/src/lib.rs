//! Workflow runtime for halyard.
//!
//! This crate runs workflow instances and mediates the updates and signals
//! sent to them.
//!
//! # Architecture
//!
//! ```text
//! WorkflowRuntime
//! ├── register(definition) - adds a workflow type
//! ├── start_workflow(type, options, cancel) -> WorkflowHandle
//! ├── workflow_handle(id) / update_handle(id, update_id) - resolve handles by id
//! └── forget(id) - drops a closed instance from the registry
//!
//! WorkflowHandle (client side, cloneable)
//! ├── start_update(name, arg) -> UpdateHandle   (returns after admission)
//! ├── signal(name, arg)
//! └── result() - waits for the completion predicate
//!
//! UpdateController
//! └── per update: validate -> (Rejected | apply -> commit -> Completed)
//!
//! WorkflowInstance (one tokio task, sole writer of the state)
//! └── run() - serves commands one at a time until the predicate holds
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use halyard_runtime::{RuntimeConfig, StartWorkflowOptions, WorkflowRuntime};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut runtime = WorkflowRuntime::new(RuntimeConfig::default())?;
//! runtime.register(definition)?;
//!
//! let handle = runtime.start_workflow("my_workflow", StartWorkflowOptions::default(), CancellationToken::new())?;
//! let update = handle.start_update("my_update", json!("update-arg")).await?;
//! let value = update.result().await?;
//! let result = handle.result().await?;
//! ```

mod controller;
mod error;
mod events;
mod handle;
mod instance;
mod outcome;
mod runtime;

pub use error::RuntimeError;
pub use events::{ChannelNotifier, InstanceEvent, InstanceNotifier, NoopNotifier};
pub use handle::{UpdateHandle, WorkflowHandle};
pub use outcome::{UpdateOutcome, WorkflowOutcome, WorkflowResult};
pub use runtime::WorkflowRuntime;

pub use halyard_config::{RuntimeConfig, StartWorkflowOptions};
pub use halyard_workflow::{
  Applied, HandlerError, ValidationError, WorkflowDefinition, WorkflowError, WorkflowState,
};
