//! CLI error types

use botfleet_reconcile::{ProvisionError, ReconcileError};
use botfleet_registry::RegistryError;
use botfleet_types::TypesError;
use thiserror::Error;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Mattermost: {0}")]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Validation(#[from] TypesError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The user declined a confirmation
    #[error("Aborted")]
    Aborted,

    /// Some bots of an `--all` operation failed
    #[error("{failed} of {total} bots failed")]
    Partial { failed: usize, total: usize },

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
