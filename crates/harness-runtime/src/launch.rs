//! Service binary entry point
//!
//! ```rust,ignore
//! #[derive(Parser)]
//! struct Cli {
//!     #[command(flatten)]
//!     service: ServiceArgs,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let cli = Cli::parse();
//!     init_tracing(cli.service.verbose);
//!     std::process::exit(launch(&orchestrator, &MyService, &cli.service).await);
//! }
//! ```

use anyhow::Context;
use clap::Args;
use harness_core::{Overlays, load_document};
use serde_json::Value as Json;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::runner::{Orchestrator, Service};
use crate::signals::Signals;

/// Command line arguments shared by service binaries
#[derive(Debug, Clone, Args)]
pub struct ServiceArgs {
    /// Configuration file in the YAML format
    pub config: PathBuf,

    /// Merge config with a file (RFC 7396)
    #[arg(long)]
    pub merge: Option<PathBuf>,

    /// Patch config with a file (RFC 6902)
    #[arg(long)]
    pub patch: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` is honored unless `verbose` forces `debug`.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // a subscriber may already be installed by the embedding binary
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Load configuration, run one session under OS signals, return the exit code
pub async fn launch<S>(orchestrator: &Orchestrator, service: &S, args: &ServiceArgs) -> i32
where
    S: Service + ?Sized,
{
    let document = match read_config(args) {
        Ok(document) => document,
        Err(err) => {
            tracing::error!("{:#}", err);
            return 1;
        }
    };

    let signals = match Signals::os() {
        Ok(signals) => signals,
        Err(err) => {
            tracing::error!("Failed to install signal handlers: {}", err);
            return 1;
        }
    };

    orchestrator.run(service, &document, signals).await
}

fn read_config(args: &ServiceArgs) -> anyhow::Result<Json> {
    tracing::info!("Loading configuration from {}", args.config.display());

    let content = std::fs::read_to_string(&args.config)
        .with_context(|| format!("Failed to read {}", args.config.display()))?;
    let overlays = Overlays::load(args.merge.as_deref(), args.patch.as_deref())
        .context("Failed to load configuration overlays")?;
    let document = load_document(&content, &overlays).context("Failed to load configuration")?;
    Ok(document)
}
