//! Print a compiled validation plan

use anyhow::{Context, Result};
use harness_core::Schema;
use std::path::Path;

/// Run the plan command
pub fn run(schema_path: &Path, type_name: &str) -> Result<()> {
    let schema = Schema::load(schema_path).context("Failed to load schema")?;
    let plan = harness_validate::render_plan(&schema, type_name)
        .with_context(|| format!("Failed to compile validator for {}", type_name))?;

    print!("{}", plan);
    Ok(())
}
