//! Validation errors for core types

use thiserror::Error;

/// Errors raised while validating bot-level input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("Bot name is required")]
    EmptyName,

    #[error(
        "Invalid bot name '{0}': must start with a letter and contain only letters, numbers, hyphens, underscores"
    )]
    InvalidName(String),

    #[error("Invalid proxy target '{0}': must be host:port (e.g. myservice:80)")]
    InvalidProxyTarget(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
}

/// Result type for type-level validation
pub type Result<T> = std::result::Result<T, TypesError>;
