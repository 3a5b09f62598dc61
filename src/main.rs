use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use halyard_runtime::RuntimeConfig;

mod features;

use features::Feature;

/// Halyard - workflow update handling with validators, handlers, and client handles
#[derive(Parser)]
#[command(name = "halyard")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to a runtime config file (JSON). Defaults apply when omitted.
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// List the available features
  List,

  /// Run one or more features against a fresh runtime
  Run {
    /// Features to run
    #[arg(value_enum, required_unless_present = "all")]
    features: Vec<Feature>,

    /// Run every feature
    #[arg(long, conflicts_with = "features")]
    all: bool,

    /// Per-feature timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "halyard=info,halyard_runtime=warn".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::List) => {
      for feature in Feature::ALL {
        println!("{}", feature.name());
      }
    }
    Some(Commands::Run {
      features,
      all,
      timeout,
    }) => {
      let config = load_config(cli.config.as_deref())?;
      let selected = if all { Feature::ALL.to_vec() } else { features };
      run_features(config, selected, Duration::from_secs(timeout))?;
    }
    None => {
      println!("halyard - use --help to see available commands");
    }
  }

  Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
  let Some(path) = path else {
    return Ok(RuntimeConfig::default());
  };

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read config file: {}", path.display()))?;
  RuntimeConfig::from_json(&content)
    .with_context(|| format!("failed to parse config file: {}", path.display()))
}

fn run_features(config: RuntimeConfig, selected: Vec<Feature>, timeout: Duration) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  let failed = rt.block_on(async {
    let mut failed = 0usize;
    for feature in selected {
      match features::run(feature, config.clone(), timeout).await {
        Ok(()) => println!("PASS {}", feature.name()),
        Err(e) => {
          failed += 1;
          println!("FAIL {}: {:#}", feature.name(), e);
        }
      }
    }
    failed
  });

  if failed > 0 {
    bail!("{} feature(s) failed", failed);
  }
  Ok(())
}
