use crate::status::PackageStatus;
use thiserror::Error;

/// Errors raised by the domain core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The guard rejected a status change.
    #[error("Invalid status transition: {current} → {requested}")]
    InvalidTransition {
        current: PackageStatus,
        requested: PackageStatus,
    },

    #[error("Invalid package code: {0}")]
    InvalidCode(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
