//! Halyard Config
//!
//! Serializable configuration for the halyard runtime.
//!
//! Configuration can be loaded from:
//! - JSON files (via CLI with `--config=halyard.json`)
//! - Defaults, when no file is given
//!
//! Missing fields fall back to their defaults, so an empty object is a valid
//! configuration.

mod error;
mod options;
mod runtime;

pub use error::ConfigError;
pub use options::StartWorkflowOptions;
pub use runtime::RuntimeConfig;
