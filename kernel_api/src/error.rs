//! User-visible error taxonomy

use crate::{NetworkError, StorageError};
use thiserror::Error;

/// Errors surfaced on a stage's stderr
///
/// Each variant renders as a single line. A stage that fails with one of
/// these never aborts the rest of the pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShellError {
    /// Process creation was denied for lack of memory
    #[error("Resource exhausted: {0}")]
    ResourceExhaustion(String),

    /// Unknown command, file, process or job
    #[error("{0}: not found")]
    NotFound(String),

    /// Operation requires privileges the caller does not hold
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A built-in or module failed while running
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// A command module has no usable entry point
    #[error("Invalid module: {0}")]
    InvalidModule(String),

    /// Malformed arguments, redirect or job reference
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ShellError {
    /// Short name of the error kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ShellError::ResourceExhaustion(_) => "ResourceExhaustion",
            ShellError::NotFound(_) => "NotFound",
            ShellError::PermissionDenied(_) => "PermissionDenied",
            ShellError::ExecutionError(_) => "ExecutionError",
            ShellError::InvalidModule(_) => "InvalidModule",
            ShellError::InvalidInput(_) => "InvalidInput",
        }
    }
}

impl From<StorageError> for ShellError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => ShellError::NotFound(path),
            StorageError::PermissionDenied(path) => ShellError::PermissionDenied(path),
            other => ShellError::ExecutionError(other.to_string()),
        }
    }
}

impl From<NetworkError> for ShellError {
    fn from(err: NetworkError) -> Self {
        ShellError::ExecutionError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ShellError::NotFound("frobnicate".to_string()).to_string(),
            "frobnicate: not found"
        );
        assert_eq!(
            ShellError::PermissionDenied("cannot remove /".to_string()).to_string(),
            "Permission denied: cannot remove /"
        );
    }

    #[test]
    fn test_storage_error_mapping() {
        let err: ShellError = StorageError::NotFound("/nope".to_string()).into();
        assert_eq!(err, ShellError::NotFound("/nope".to_string()));

        let err: ShellError = StorageError::IsDirectory("/tmp".to_string()).into();
        assert_eq!(err.kind(), "ExecutionError");
    }
}
