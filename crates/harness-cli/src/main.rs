//! Harness CLI
//!
//! Developer tool for checking service configurations against their schema.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Harness - configuration validation and service bootstrapping
#[derive(Parser)]
#[command(name = "harness")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, overlay, decode and validate a configuration file
    Check {
        /// Schema descriptor document (YAML or JSON)
        schema: PathBuf,

        /// Configuration file in the YAML format
        config: PathBuf,

        /// Root message type of the configuration
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Merge config with a file (RFC 7396)
        #[arg(long)]
        merge: Option<PathBuf>,

        /// Patch config with a file (RFC 6902)
        #[arg(long)]
        patch: Option<PathBuf>,
    },

    /// Print the validation plan compiled for a message type
    Plan {
        /// Schema descriptor document (YAML or JSON)
        schema: PathBuf,

        /// Message type to compile
        #[arg(short = 't', long = "type")]
        type_name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Check {
            schema,
            config,
            type_name,
            merge,
            patch,
        } => {
            commands::check::run(
                &schema,
                &config,
                &type_name,
                merge.as_deref(),
                patch.as_deref(),
            )?;
        }
        Commands::Plan { schema, type_name } => {
            commands::plan::run(&schema, &type_name)?;
        }
    }

    Ok(())
}
