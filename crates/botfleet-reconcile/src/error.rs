//! Reconcile error types

use crate::provision::ProvisionError;
use botfleet_config::{MergeError, UnknownProvider};
use botfleet_registry::RegistryError;
use botfleet_runtime::RuntimeError;
use botfleet_types::TypesError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by bot operations
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Container runtime is not running. Start Docker/OrbStack and try again.")]
    EnvironmentUnavailable,

    #[error("Bot '{0}' not found in registry")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    InvalidProvider(#[from] UnknownProvider),

    #[error(transparent)]
    Validation(#[from] TypesError),

    /// An existing artifact could not be merged; it was left untouched
    #[error(transparent)]
    Merge {
        #[from]
        source: MergeError,
    },

    #[error("Channel provisioning failed: {source}")]
    Provisioning {
        #[from]
        source: ProvisionError,
    },

    #[error("Bot '{0}' is not running. Use 'botfleet start {0}' instead.")]
    NotRunning(String),

    #[error("No gateway token found in {0}")]
    NoToken(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Runtime(RuntimeError),
}

impl From<RuntimeError> for ReconcileError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::Unavailable => ReconcileError::EnvironmentUnavailable,
            other => ReconcileError::Runtime(other),
        }
    }
}

impl ReconcileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReconcileError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for reconcile operations
pub type Result<T> = std::result::Result<T, ReconcileError>;
