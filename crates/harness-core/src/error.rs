//! Error types for harness-core

use thiserror::Error;

/// Result type alias for harness-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in harness-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration or schema file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse a YAML document
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration document
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// JSON patch could not be applied
    #[error("failed to apply patch: {0}")]
    Patch(#[from] json_patch::PatchError),

    /// Schema descriptors are inconsistent
    #[error("invalid schema: {message}")]
    SchemaInvalid {
        /// Description of the inconsistency
        message: String,
    },

    /// Type name not present in the schema
    #[error("unknown type: {name}")]
    UnknownType {
        /// Fully qualified type name
        name: String,
    },

    /// Configuration value does not fit the schema
    #[error("failed to decode '{path}': {message}")]
    Decode {
        /// Field path of the offending value
        path: String,
        /// Description of the mismatch
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
