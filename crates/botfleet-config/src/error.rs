//! Merge error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors from reading, merging or writing a generated artifact
#[derive(Debug, Error)]
pub enum MergeError {
    /// Existing document cannot be parsed; the file is left untouched
    #[error("{path} is malformed ({source}); fix or remove it and re-run")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} must contain a JSON object at the top level")]
    NotAnObject(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MergeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MergeError::Io {
            path: path.into(),
            source,
        }
    }

    /// Artifact the error refers to
    pub fn path(&self) -> &std::path::Path {
        match self {
            MergeError::Malformed { path, .. } => path,
            MergeError::NotAnObject(path) => path,
            MergeError::Io { path, .. } => path,
        }
    }
}

/// Result type for merge operations
pub type Result<T> = std::result::Result<T, MergeError>;
