//! Application-wide error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
///
/// This is the outermost error taxonomy. Domain crates define their own
/// error enums and convert into `AppError` at the boundary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Entity is missing or not owned by the caller.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Illegal lifecycle transition (e.g. re-confirming a paid transaction).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A transfer or withdrawal exceeds the source account balance.
    #[error("Insufficient funds: requested {requested}, available {available} (short {shortfall})")]
    InsufficientFunds {
        /// Amount the caller asked to move.
        requested: Decimal,
        /// Balance actually available.
        available: Decimal,
        /// How much the request exceeds the balance.
        shortfall: Decimal,
    },

    /// A pending occurrence was already approved or rejected.
    #[error("Already resolved: {0}")]
    AlreadyResolved(String),

    /// Malformed input (rule, template, or transaction).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persistence failure.
    #[error("Store error: {0}")]
    Store(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidState(_) | Self::AlreadyResolved(_) => 409,
            Self::InsufficientFunds { .. } => 422,
            Self::Validation(_) => 400,
            Self::Store(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::AlreadyResolved(_) => "ALREADY_RESOLVED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the operation may be retried.
    ///
    /// Store failures (timeouts, transient unavailability) are retryable;
    /// validation and lifecycle errors are terminal.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
