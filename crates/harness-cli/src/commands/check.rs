//! Check a configuration file

use anyhow::{Context, Result};
use harness_core::{Overlays, Schema, load_config};
use std::path::Path;

/// Run the check command
pub fn run(
    schema_path: &Path,
    config_path: &Path,
    type_name: &str,
    merge: Option<&Path>,
    patch: Option<&Path>,
) -> Result<()> {
    tracing::info!("Checking configuration: {}", config_path.display());

    let schema = Schema::load(schema_path).context("Failed to load schema")?;
    let overlays = Overlays::load(merge, patch).context("Failed to load configuration overlays")?;
    let config = load_config(&schema, type_name, config_path, &overlays)
        .context("Failed to load configuration")?;

    harness_validate::validate(&schema, &config).context("Configuration is invalid")?;

    tracing::info!("✓ Type: {}", type_name);
    tracing::info!("✓ Configuration is valid");
    Ok(())
}
