//! Feature harness.
//!
//! Each feature registers one workflow type on a fresh runtime, drives it
//! through the public handles, and checks what came back.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use tokio_util::sync::CancellationToken;
use tracing::info;

use halyard_runtime::{RuntimeConfig, WorkflowDefinition, WorkflowRuntime};

mod signal_basic;
mod update_basic;
mod update_basic_async;
mod update_self;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Feature {
  #[value(name = "update/basic")]
  UpdateBasic,
  #[value(name = "update/basic_async")]
  UpdateBasicAsync,
  #[value(name = "update/self")]
  UpdateSelf,
  #[value(name = "signal/basic")]
  SignalBasic,
}

impl Feature {
  pub const ALL: [Feature; 4] = [
    Feature::UpdateBasic,
    Feature::UpdateBasicAsync,
    Feature::UpdateSelf,
    Feature::SignalBasic,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Feature::UpdateBasic => "update/basic",
      Feature::UpdateBasicAsync => "update/basic_async",
      Feature::UpdateSelf => "update/self",
      Feature::SignalBasic => "signal/basic",
    }
  }

  fn definition(self) -> Result<WorkflowDefinition> {
    let definition = match self {
      Feature::UpdateBasic => update_basic::definition()?,
      Feature::UpdateBasicAsync => update_basic_async::definition()?,
      Feature::UpdateSelf => update_self::definition()?,
      Feature::SignalBasic => signal_basic::definition()?,
    };
    Ok(definition)
  }

  async fn check(self, runtime: Arc<WorkflowRuntime>, cancel: CancellationToken) -> Result<()> {
    match self {
      Feature::UpdateBasic => update_basic::check(&runtime, cancel).await,
      Feature::UpdateBasicAsync => update_basic_async::check(&runtime, cancel).await,
      Feature::UpdateSelf => update_self::check(runtime, cancel).await,
      Feature::SignalBasic => signal_basic::check(&runtime, cancel).await,
    }
  }
}

/// Run one feature on its own runtime. Instances still running when the
/// feature returns (or times out) are cancelled.
pub async fn run(feature: Feature, config: RuntimeConfig, timeout: Duration) -> Result<()> {
  info!(feature = feature.name(), "feature_started");

  let mut runtime = WorkflowRuntime::new(config).context("failed to create workflow runtime")?;
  runtime
    .register(feature.definition()?)
    .context("failed to register workflow")?;

  let cancel = CancellationToken::new();
  let checked = tokio::time::timeout(timeout, feature.check(Arc::new(runtime), cancel.clone())).await;
  cancel.cancel();

  match checked {
    Ok(result) => result,
    Err(_) => bail!("timed out after {}s", timeout.as_secs()),
  }
}
