//! Harness Validator Compiler
//!
//! This crate turns the constraint rules of a schema into validators.
//!
//! # Pipeline Overview
//!
//! ```text
//! ┌─────────┐     ┌─────────┐     ┌─────────┐     ┌─────────┐
//! │ Schema  │────▶│  Plan   │────▶│  Cache  │────▶│   Run   │
//! │ + Rules │     │(Compile)│     │(per type)│    │(Interp.)│
//! └─────────┘     └─────────┘     └─────────┘     └─────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use harness_validate::validate;
//!
//! let config = harness_core::load_config(&schema, "svc.Configuration", path, &overlays)?;
//! validate(&schema, &config)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod checks;
pub mod compiler;
pub mod error;
mod interpreter;
pub mod plan;
pub mod render;
pub mod time;

use harness_core::{DynamicMessage, Schema};

pub use compiler::compile;
pub use error::{Error, Result, ValidationError};
pub use plan::MessagePlan;
pub use render::render;

/// Validate `message` against the rules of its type
///
/// Returns the first violation, in document order: oneof groups in
/// declaration order, then the remaining fields in declaration order.
pub fn validate(schema: &Schema, message: &DynamicMessage) -> Result<()> {
    let plan = cache::plan(schema, message.type_name())?;
    interpreter::run(schema, &plan, message)
}

/// Render the cached plan of `type_name` as text
pub fn render_plan(schema: &Schema, type_name: &str) -> Result<String> {
    let plan = cache::plan(schema, type_name)?;
    Ok(render(&plan))
}
