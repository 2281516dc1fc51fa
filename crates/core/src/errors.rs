//! Error types for the auto-push core library.
//!
//! Each subsystem has its own error type derived with `thiserror`.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Command execution errors
// ---------------------------------------------------------------------------

/// Why an external command did not succeed.
#[derive(Debug, Error)]
pub enum ExecutionCause {
    /// The executable was not found on `$PATH`.
    #[error("binary not found: {0}")]
    BinaryNotFound(String),

    /// The requested working directory does not exist or is not a directory.
    #[error("invalid working directory '{0}'")]
    InvalidWorkingDirectory(String),

    /// The process ran but exited with a non-zero status.
    /// `None` means it was terminated by a signal.
    #[error("exited with status {}", describe_status(.0))]
    NonZeroExit(Option<i32>),

    /// Generic spawn / wait I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "<signal>".into(),
    }
}

/// A failed external command invocation.
///
/// The captured output is preserved even on failure so callers can log it.
#[derive(Debug, Error)]
#[error("`{command}` failed: {cause}")]
pub struct ExecutionError {
    /// Human-readable command line, e.g. `git push origin main`.
    pub command: String,
    #[source]
    pub cause: ExecutionCause,
    /// Combined stdout + stderr captured before the failure.
    pub output: Vec<u8>,
}

impl ExecutionError {
    pub fn new(command: impl Into<String>, cause: ExecutionCause, output: Vec<u8>) -> Self {
        Self {
            command: command.into(),
            cause,
            output,
        }
    }

    /// Captured output decoded lossily and trimmed, for log messages.
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).trim().to_string()
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// JSON parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Sync cycle errors
// ---------------------------------------------------------------------------

/// Errors that abort a whole sync cycle.
///
/// Repository-local failures never show up here; they are logged and
/// reported through [`crate::models::RepoOutcome`] instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The directory containing the running executable could not be
    /// determined.
    #[error("failed to determine home directory: {0}")]
    HomeDirUnavailable(String),
}
