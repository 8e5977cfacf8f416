//! Error taxonomy shared by the scan and cleanup passes.

use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The runtime executable could not be spawned.
    #[error("container runtime `{0}` was not found on PATH")]
    RuntimeNotFound(String),

    /// The executable exists but its daemon did not answer.
    #[error("container runtime daemon is unreachable: {0}")]
    DaemonUnreachable(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("malformed runtime output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code for errors that end the whole run.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) => 2,
            Error::RuntimeNotFound(_) => 3,
            Error::DaemonUnreachable(_) => 4,
            _ => 1,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}
