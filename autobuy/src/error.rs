//! Error types for the autobuy workflow
//!
//! Every failure is terminal for a run. The variants follow the three failure
//! classes a run can end in (step, extraction, configuration) plus the I/O
//! errors raised while writing the audit log.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Process exit code for a completed run
pub const EXIT_SUCCESS: i32 = 0;

/// A step exited non-zero or could not be launched
pub const EXIT_STEP_FAILURE: i32 = 1;

/// Invalid configuration or flag combination
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// The balance check produced no usable amount
pub const EXIT_EXTRACTION_FAILURE: i32 = 3;

/// The audit log could not be written
pub const EXIT_IO_ERROR: i32 = 4;

/// The main error type for the autobuy library
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AutobuyError {
    /// An external step returned a non-zero status or failed to launch
    #[error("Step '{step}' failed with exit code {exit_code}")]
    StepFailure {
        /// Name of the failing step
        step: String,
        /// Exit status reported by the step (-1 when it never started)
        exit_code: i32,
    },

    /// The expected amount was absent from a step's output
    #[error("Step '{step}' produced no recognisable amount")]
    ExtractionFailure {
        /// Name of the step whose output could not be parsed
        step: String,
    },

    /// Invalid configuration
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl AutobuyError {
    /// Process exit code to report for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AutobuyError::StepFailure { .. } => EXIT_STEP_FAILURE,
            AutobuyError::ExtractionFailure { .. } => EXIT_EXTRACTION_FAILURE,
            AutobuyError::Configuration(_) => EXIT_CONFIG_ERROR,
            AutobuyError::Io(_) => EXIT_IO_ERROR,
        }
    }
}

/// Errors that can occur during configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        /// Path to the configuration file that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Failed to parse YAML content from a configuration file
    #[error("Invalid YAML syntax in {path}:\n{source}\n\nHint: Check for proper indentation and YAML formatting")]
    YamlParse {
        /// Path to the configuration file with invalid YAML content
        path: PathBuf,
        /// Underlying YAML parsing error
        #[source]
        source: serde_yaml::Error,
    },

    /// Invalid configuration value for a specific field
    #[error("Invalid configuration value for '{field}': {value}\n{hint}")]
    InvalidValue {
        /// Name of the configuration field
        field: String,
        /// The rejected value
        value: String,
        /// How to fix it
        hint: String,
    },

    /// No purchase step is enabled for the run
    #[error("Configuration error: no purchase steps are enabled")]
    NoPurchasesEnabled,

    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    Validation {
        /// Descriptive message about the validation failure
        message: String,
    },
}

/// Result type alias for autobuy operations
pub type Result<T> = std::result::Result<T, AutobuyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_and_non_zero() {
        let errors = [
            AutobuyError::StepFailure {
                step: "balance".to_string(),
                exit_code: 7,
            },
            AutobuyError::ExtractionFailure {
                step: "balance".to_string(),
            },
            AutobuyError::Configuration(ConfigError::NoPurchasesEnabled),
            AutobuyError::Io(io::Error::new(io::ErrorKind::Other, "disk full")),
        ];

        let codes: Vec<i32> = errors.iter().map(|e| e.exit_code()).collect();
        assert_eq!(
            codes,
            vec![
                EXIT_STEP_FAILURE,
                EXIT_EXTRACTION_FAILURE,
                EXIT_CONFIG_ERROR,
                EXIT_IO_ERROR
            ]
        );
        assert!(codes.iter().all(|c| *c != EXIT_SUCCESS));
    }

    #[test]
    fn test_step_failure_display_names_the_step() {
        let err = AutobuyError::StepFailure {
            step: "charge".to_string(),
            exit_code: 1,
        };
        assert_eq!(err.to_string(), "Step 'charge' failed with exit code 1");
    }

    #[test]
    fn test_configuration_error_is_transparent() {
        let err: AutobuyError = ConfigError::NoPurchasesEnabled.into();
        assert_eq!(
            err.to_string(),
            "Configuration error: no purchase steps are enabled"
        );
    }
}
