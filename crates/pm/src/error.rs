//! Errors produced while routing and executing commands

use thiserror::Error;

/// Exit code for a malformed invocation
pub const EXIT_USAGE: i32 = 2;
/// Exit code when a process could not be spawned
pub const EXIT_CANNOT_EXECUTE: i32 = 126;
/// Exit code when the target program does not exist
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code when a command outlives its timeout
pub const EXIT_TIMEOUT: i32 = 124;

/// Errors specific to dispatch and shell execution
///
/// A child that exits non-zero is not an error; it is reported through
/// [`crate::shell::ExecutionResult`].
#[derive(Error, Debug)]
pub enum PmError {
    #[error("{0}")]
    Usage(String),

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("failed to execute {command}: {source}")]
    Execution {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command timed out after {secs}s: {command}")]
    Timeout { command: String, secs: u64 },
}

impl PmError {
    /// Process exit code reported for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => EXIT_USAGE,
            Self::CommandNotFound(_) => EXIT_NOT_FOUND,
            Self::Execution { .. } => EXIT_CANNOT_EXECUTE,
            Self::Timeout { .. } => EXIT_TIMEOUT,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }
}
