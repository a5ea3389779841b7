//! Runtime error types

use thiserror::Error;

/// Container runtime errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Container runtime is not available (is Docker running?)")]
    Unavailable,

    #[error("Failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Container not found: {0}")]
    NoSuchContainer(String),

    #[error("Image not found: {0}")]
    NoSuchImage(String),
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
