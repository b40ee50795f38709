//! Error types for dockertest-core

use std::path::PathBuf;

use thiserror::Error;

/// A required path check failed before any process was spawned.
#[derive(Error, Debug)]
pub enum PreconditionError {
    /// Compose or manifest file does not exist
    #[error("File not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    /// Path exists but is a directory or special file
    #[error("Path is not a file: {}", .path.display())]
    NotAFile { path: PathBuf },

    /// Manifest directory does not exist
    #[error("K8s directory not found: {}", .path.display())]
    DirectoryNotFound { path: PathBuf },

    /// Manifest path exists but is not a directory
    #[error("K8s path is not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    /// Manifest directory holds no `.yml`, `.yaml` or `.json` file
    #[error("No YAML/JSON files found in directory: {}", .path.display())]
    NoManifests { path: PathBuf },

    /// Working directory for a kubectl command does not exist
    #[error("Working directory not found: {}", .path.display())]
    WorkingDirectoryNotFound { path: PathBuf },
}

impl PreconditionError {
    /// The absolute path that failed the check.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::FileNotFound { path }
            | Self::NotAFile { path }
            | Self::DirectoryNotFound { path }
            | Self::NotADirectory { path }
            | Self::NoManifests { path }
            | Self::WorkingDirectoryNotFound { path } => path,
        }
    }
}

/// A process ran to completion but exited non-zero.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to execute `{command}`: Exit code {exit_code}, output: {output}")]
pub struct ExecutionError {
    /// Space-joined command line that was run
    pub command: String,
    /// Exit code reported by the child (-1 when killed by a signal)
    pub exit_code: i32,
    /// Combined stdout/stderr captured from the child
    pub output: String,
}

/// Errors that can occur while driving docker compose or kubectl
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The program could not be started at all
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Tool missing or cluster unreachable, wrapping the first failure
    #[error("{tool} is not available or cluster is not accessible")]
    Unavailable {
        tool: String,
        #[source]
        source: Box<Error>,
    },

    /// IO error while resolving paths or reading child output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error was raised before any process was spawned.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::Precondition(_))
    }

    /// The non-zero exit details, if the failure came from a finished process.
    pub fn as_execution(&self) -> Option<&ExecutionError> {
        match self {
            Error::Execution(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for dockertest operations.
pub type Result<T> = std::result::Result<T, Error>;
