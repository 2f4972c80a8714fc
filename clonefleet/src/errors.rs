//! Error types for clonefleet.
//!
//! Only programming and configuration mistakes are errors. A repository whose
//! clone, unpack or compress step exits non-zero is not an error here; it is
//! recorded in the run report and the pipeline carries on.

use thiserror::Error;

/// The main error type for clonefleet operations.
#[derive(Debug, Error)]
pub enum ClonefleetError {
    /// The configuration is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A pipeline was run without any stages.
    #[error("Pipeline '{0}' has no stages")]
    EmptyPipeline(String),

    /// IO error (unreadable input list, output directory creation, ...).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The tracing subscriber could not be installed.
    #[error("Tracing setup error: {0}")]
    Tracing(String),
}

/// Error raised when a configuration value is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration for '{field}': {message}")]
pub struct ConfigError {
    /// The offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ClonefleetError>;
