//! Harness Core Library
//!
//! This crate provides the data side of Harness:
//! - Schema model (message types, fields, oneofs, constraint rules)
//! - Dynamic message values
//! - Configuration loading with merge/patch overlays
//! - Decoding of configuration documents into dynamic messages
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Config    │────▶│   Decode    │────▶│  Dynamic    │
//! │   (YAML)    │     │  (schema)   │     │  Message    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use harness_core::{Overlays, Schema, load_config};
//!
//! let schema = Schema::load("./schema.yaml")?;
//! let config = load_config(&schema, "svc.Configuration", "./config.yaml", &Overlays::default())?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod decode;
pub mod error;
pub mod rules;
pub mod schema;
pub mod value;

pub use config::{Overlays, load_config, load_document};
pub use decode::decode;
pub use error::{Error, Result};
pub use rules::{FieldRules, RuleKind};
pub use schema::{
    FieldDescriptor, FieldType, Label, MessageDescriptor, OneofDescriptor, ScalarType, Schema,
};
pub use value::{DynamicMessage, Value};
