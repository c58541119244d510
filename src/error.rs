use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::settings::ConfigError;

/// Errors that can occur during git operations
///
/// A git command that runs and exits non-zero is not an error here: its
/// output comes back as data so the caller can show it to the user.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepository,

    #[error("Failed to launch '{command}': {source}")]
    LaunchFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' did not finish within {}s and was terminated", .after.as_secs())]
    Timeout { command: String, after: Duration },

    #[error("Repository metadata file not found: {}", .0.display())]
    MissingMetadataFile(PathBuf),

    #[error("Invalid timestamp format: {0}")]
    InvalidTimestampFormat(String),

    #[error("Failed to parse git output: {0}")]
    ParseError(String),

    #[error("Git version {0} is too old. Minimum required: 2.23")]
    GitVersionTooOld(String),

    #[error("Failed to detect git version: {0}")]
    GitVersionDetectionFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Top-level application error used by the command-line front end
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Result type for application-level operations
pub type AppResult<T> = std::result::Result<T, AppError>;
