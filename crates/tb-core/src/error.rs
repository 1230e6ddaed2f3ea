//! # AppError
//!
//! Centralized error handling for threadboard.
//! Every core operation fails with exactly one of these kinds; the transport
//! renders the `Display` text to the poster.

use thiserror::Error;

/// The primary error type for all tb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// A required input was missing or empty. Detected before storage is touched.
    #[error("{0}")]
    ValidationError(String),

    /// The referenced thread or reply does not exist.
    /// Carries a generic denial ("cannot report this reply"), never details.
    #[error("{0}")]
    NotFound(String),

    /// The supplied delete password did not match the stored hash.
    #[error("incorrect password")]
    Unauthorized,

    /// Infrastructure failure (store unreachable, hasher crashed, ...)
    #[error("internal service error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub(crate) fn required(field: &str) -> Self {
        Self::ValidationError(format!("{field} is a required field"))
    }

    pub(crate) fn denied(action: &str, target: &str) -> Self {
        Self::NotFound(format!("cannot {action} this {target}"))
    }
}

/// A specialized Result type for threadboard logic.
pub type Result<T> = std::result::Result<T, AppError>;
