//! Error types for the API case runner
//!
//! Only run setup, authentication and file handling surface these errors.
//! A single case never fails with an `Error`: its failure is recorded on
//! the `ExecutionResult` instead.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the runner
#[derive(Error, Debug)]
pub enum Error {
    // === Run Errors ===
    #[error("No test cases selected. Pick a suite with at least one active case")]
    NoCasesSelected,

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("{failed} of {total} test cases failed")]
    CasesFailed { failed: usize, total: usize },

    // === Suite Errors ===
    #[error("Suite {0} not found")]
    SuiteNotFound(u64),

    #[error("Test case {0} not found")]
    CaseNotFound(u64),

    #[error("Test case {case} belongs to suite {actual}, not suite {requested}")]
    CaseSuiteMismatch {
        case: u64,
        requested: u64,
        actual: u64,
    },

    #[error("Test case {0} is inactive")]
    CaseInactive(u64),

    #[error("Invalid suite file '{path}': {error}")]
    SuiteParse { path: String, error: String },

    // === Transport Errors ===
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a transport error for a request URL
    pub fn transport(url: &str, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a suite parse error for a file
    pub fn suite_parse(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Self::SuiteParse {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
