//! Error handling for matrix runs
//!
//! This module provides the error types for credential lookup, runner
//! discovery and group execution, with recovery guidance and the exit code
//! each failure maps to.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MatrixError`]
pub type Result<T> = std::result::Result<T, MatrixError>;

/// Errors raised while resolving the API credential
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Missing Poe credentials; set POE_API_KEY or login locally via `poe-code login`.")]
    Missing,

    #[error("Invalid JSON in {path}; set POE_API_KEY to override.")]
    MalformedFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing apiKey in {path}; set POE_API_KEY to override.")]
    MissingKey { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("API key contains a NUL byte and cannot be passed to a shell")]
    Unquotable,
}

/// Main error type for matrix runs
#[derive(Error, Debug)]
pub enum MatrixError {
    // Discovery errors
    #[error("colima runner not found at {}", path.display())]
    RunnerNotFound { path: PathBuf },

    // Credential errors
    #[error(transparent)]
    Credential(#[from] CredentialError),

    // Execution errors
    #[error("Command group {index} failed with exit code {code}: {}", commands.join(" && "))]
    GroupFailed {
        index: usize,
        code: i32,
        /// Redacted commands of the failing group, in execution order
        commands: Vec<String>,
    },

    #[error("Failed to start runner {}: {source}", path.display())]
    RunnerSpawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MatrixError {
    /// Process exit code for this failure
    ///
    /// A failing group mirrors the runner's own exit code; every other
    /// failure exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::GroupFailed { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::RunnerNotFound { .. } => "RUNNER_NOT_FOUND",
            Self::Credential(CredentialError::Missing) => "CREDENTIALS_MISSING",
            Self::Credential(CredentialError::MalformedFile { .. }) => "CREDENTIALS_MALFORMED",
            Self::Credential(CredentialError::MissingKey { .. }) => "CREDENTIALS_KEY_MISSING",
            Self::Credential(CredentialError::Unreadable { .. }) => "CREDENTIALS_UNREADABLE",
            Self::Credential(CredentialError::Unquotable) => "CREDENTIALS_UNQUOTABLE",
            Self::GroupFailed { .. } => "GROUP_FAILED",
            Self::RunnerSpawn { .. } => "RUNNER_SPAWN_FAILED",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::RunnerNotFound { .. } => vec![
                "Check that scripts/colima-runner.sh exists in the repository",
                "Pass --runner or set POE_MATRIX_RUNNER to point at the runner",
            ],
            Self::Credential(CredentialError::Missing) => vec![
                "Export POE_API_KEY (or POE_CODE_API_KEY)",
                "Run `poe-code login` to store credentials locally",
            ],
            Self::Credential(CredentialError::MalformedFile { .. })
            | Self::Credential(CredentialError::MissingKey { .. }) => vec![
                "Run `poe-code login` again to rewrite the credentials file",
                "Export POE_API_KEY to bypass the credentials file",
            ],
            Self::Credential(CredentialError::Unreadable { .. }) => {
                vec!["Check the permissions of the credentials file"]
            }
            Self::Credential(CredentialError::Unquotable) => {
                vec!["Check the API key for stray control characters"]
            }
            Self::GroupFailed { .. } => vec![
                "Scroll up to the last `>>>` line to find the failing command",
                "Set RUST_LOG=poe_code_matrix=debug for runner details",
            ],
            Self::RunnerSpawn { .. } => vec!["Check that the runner is executable"],
            Self::Config(_) => vec!["Check the matrix configuration file"],
            Self::Io(_) => vec![],
        }
    }
}
