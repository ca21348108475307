//! Harness Runtime
//!
//! This crate bootstraps services: it validates configuration, then drives
//! the lifecycle of the service's external resources.
//!
//! # Features
//!
//! - Ordered acquisition of input resources before the business function
//! - Output resources entered after it, raced against termination signals
//! - Two-stage graceful shutdown and reverse-order release
//!
//! # Usage
//!
//! ```rust,ignore
//! use harness_runtime::{InputManifest, Orchestrator, OutputManifest, Signals};
//!
//! let orchestrator = Orchestrator::new(schema, "svc.Configuration")
//!     .inputs(InputManifest::new().required("db", Pool::default))
//!     .outputs(OutputManifest::new().required("server"));
//! let code = orchestrator.run(&service, &document, Signals::os()?).await;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod launch;
pub mod manifest;
pub mod resource;
pub mod runner;
pub mod signals;

pub use error::{Result, RunError};
pub use launch::{ServiceArgs, init_tracing, launch};
pub use manifest::{Cardinality, InputManifest, Inputs, OutputManifest, Outputs};
pub use resource::{Closer, Resource};
pub use runner::{Orchestrator, Service};
pub use signals::{SIGINT, SIGTERM, SignalSender, Signals};
