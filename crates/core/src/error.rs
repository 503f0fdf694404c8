// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by collaborator operations.
///
/// Collaborators report failure by returning one of these; they never
/// decide job status themselves. `Cancelled` is the marker the job runner
/// uses to distinguish a cooperative abort from a genuine failure.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("cancelled by user")]
    Cancelled,

    #[error("{tool} is not installed")]
    MissingBinary { tool: String },

    #[error("`{command}` exited with status {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied writing {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("unsupported platform: {0}")]
    Unsupported(String),
}

impl ToolError {
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    /// Map an IO error to the most specific variant for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}
