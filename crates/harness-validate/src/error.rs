//! Error types for validation

use thiserror::Error;

/// Result type for validation operations
pub type Result<T> = std::result::Result<T, Error>;

/// A violated constraint
///
/// Displays as the bare message so that callers can surface it verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    /// Display path of the offending value (`field`, `field[]`, `field<key>`)
    pub path: String,

    /// Human readable description, starting with the path
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Errors that can occur while compiling or running a validator
#[derive(Error, Debug)]
pub enum Error {
    /// The instance violates a constraint
    #[error(transparent)]
    Violation(#[from] ValidationError),

    /// A rule kind was attached to a field of a different type
    #[error("invalid rules for field '{field}' in '{message_type}': {message}")]
    RuleMismatch {
        /// Message type declaring the field
        message_type: String,
        /// Field name
        field: String,
        /// Error description
        message: String,
    },

    /// Invalid regex pattern
    #[error("invalid regex pattern '{pattern}': {message}")]
    InvalidRegex {
        /// The pattern that failed
        pattern: String,
        /// Error message
        message: String,
    },

    /// Schema lookup failed
    #[error(transparent)]
    Schema(#[from] harness_core::Error),
}

impl Error {
    /// The violation, if this error is one
    pub fn violation(&self) -> Option<&ValidationError> {
        match self {
            Error::Violation(v) => Some(v),
            _ => None,
        }
    }
}
