//! Error types for the reencode-core library.
//!
//! Only [`CoreError::Discovery`] and configuration errors abort a run. The
//! per-file variants are caught by the orchestrator and turned into a failed
//! outcome for that file.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors produced by the core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input root is missing, not a directory or unreadable.
    #[error("Discovery failed for {}: {message}", .root.display())]
    Discovery { root: PathBuf, message: String },

    /// A discovered file does not sit under the input root.
    #[error("Cannot map {} under input root {}: {message}", .source_path.display(), .root.display())]
    PathMapping {
        root: PathBuf,
        source_path: PathBuf,
        message: String,
    },

    /// The media inspection tool could not be invoked.
    #[error("Probe failed for {}: {message}", .path.display())]
    Probe { path: PathBuf, message: String },

    #[error("Failed to start {0}: {1}")]
    CommandStart(String, #[source] io::Error),

    #[error("Failed waiting for {0}: {1}")]
    CommandWait(String, #[source] io::Error),

    #[error("{0} exited with {1}: {2}")]
    CommandFailed(String, ExitStatus, String),

    /// Raised from inside an event loop when the run has been interrupted.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("{0}")]
    OperationFailed(String),
}

/// Result alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;

pub fn command_start_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), err)
}

pub fn command_wait_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandWait(cmd.into(), err)
}

pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed(cmd.into(), status, stderr.into())
}
