//! Runtime error types

use thiserror::Error;

/// Result type for orchestration
pub type Result<T> = std::result::Result<T, RunError>;

/// Reasons a service session ended unsuccessfully
#[derive(Error, Debug)]
pub enum RunError {
    /// Raw configuration does not fit the root message type
    #[error("failed to decode configuration: {0}")]
    Decode(#[source] harness_core::Error),

    /// Decoded configuration violates its constraints
    #[error("{0}")]
    Validation(#[source] harness_validate::Error),

    /// A required resource slot has no configuration
    #[error("missing configuration for required resource {slot}")]
    ConfigurationMissing {
        /// Slot name
        slot: String,
    },

    /// `configure` or `enter` failed
    #[error("failed to acquire resource {slot}: {error:#}")]
    Acquisition {
        /// Slot name
        slot: String,
        /// Underlying failure
        error: anyhow::Error,
    },

    /// The business function failed
    #[error("service failed: {0:#}")]
    Business(anyhow::Error),

    /// The business function returned outputs that do not fit the manifest
    #[error("output mismatch: {message}")]
    OutputMismatch {
        /// Description of the mismatch
        message: String,
    },

    /// An output resource completed with an error
    #[error("resource {slot} failed: {error:#}")]
    Output {
        /// Slot name
        slot: String,
        /// Underlying failure
        error: anyhow::Error,
    },

    /// A termination signal arrived before the service was running
    #[error("interrupted by signal {signal} during startup")]
    Interrupted {
        /// Signal number
        signal: i32,
    },

    /// Termination escalated past graceful shutdown
    #[error("terminated by signal {signal}")]
    Escalated {
        /// Signal number
        signal: i32,
    },

    /// One or more resources failed to exit
    #[error("failed to release {}: {}", .failures.len(), .failures.join("; "))]
    Release {
        /// `slot: error` per failed release
        failures: Vec<String>,
    },
}

impl RunError {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Interrupted { signal } | RunError::Escalated { signal } => 128 + signal,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RunError::Escalated { signal: 2 }, 130)]
    #[case(RunError::Escalated { signal: 15 }, 143)]
    #[case(RunError::Interrupted { signal: 15 }, 143)]
    #[case(RunError::ConfigurationMissing { slot: "db".to_string() }, 1)]
    #[case(RunError::Business(anyhow::anyhow!("boom")), 1)]
    fn test_exit_codes(#[case] err: RunError, #[case] code: i32) {
        assert_eq!(err.exit_code(), code);
    }

    #[test]
    fn test_messages() {
        let missing = RunError::ConfigurationMissing {
            slot: "db".to_string(),
        };
        assert_eq!(
            missing.to_string(),
            "missing configuration for required resource db"
        );

        let release = RunError::Release {
            failures: vec!["a: boom".to_string(), "b: bang".to_string()],
        };
        assert_eq!(release.to_string(), "failed to release 2: a: boom; b: bang");
    }
}
