//! Recurrence error types.

use thiserror::Error;

use tally_shared::error::AppError;
use tally_shared::types::{OccurrenceId, RuleId};

use crate::ledger::error::LedgerError;
use crate::recurrence::types::PendingStatus;
use crate::store::StoreError;

/// Errors that can occur during recurrence operations.
#[derive(Debug, Error)]
pub enum RecurrenceError {
    /// Rule missing or not owned by the caller.
    #[error("Recurrence rule not found: {0}")]
    RuleNotFound(RuleId),

    /// Pending occurrence missing or not owned by the caller.
    #[error("Pending occurrence not found: {0}")]
    OccurrenceNotFound(OccurrenceId),

    /// The occurrence was already approved or rejected.
    #[error("Occurrence already resolved: status is {0}")]
    AlreadyResolved(PendingStatus),

    /// Interval must be at least 1.
    #[error("Rule interval must be at least 1")]
    InvalidInterval,

    /// End date precedes start date.
    #[error("Rule end date {end} precedes start date {start}")]
    EndBeforeStart {
        /// The configured start date.
        start: chrono::NaiveDate,
        /// The offending end date.
        end: chrono::NaiveDate,
    },

    /// Malformed rule or template.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A ledger mutation performed on the rule's behalf failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RecurrenceError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RuleNotFound(_) | Self::OccurrenceNotFound(_) => "NOT_FOUND",
            Self::AlreadyResolved(_) => "ALREADY_RESOLVED",
            Self::InvalidInterval | Self::EndBeforeStart { .. } | Self::Validation(_) => {
                "VALIDATION_ERROR"
            }
            Self::Ledger(e) => e.error_code(),
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns true if the operation may be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(e) => e.is_retryable(),
            Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<RecurrenceError> for AppError {
    fn from(err: RecurrenceError) -> Self {
        match err {
            RecurrenceError::RuleNotFound(_) | RecurrenceError::OccurrenceNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            RecurrenceError::AlreadyResolved(_) => Self::AlreadyResolved(err.to_string()),
            RecurrenceError::Ledger(e) => e.into(),
            RecurrenceError::Store(e) => Self::Store(e.to_string()),
            _ => Self::Validation(err.to_string()),
        }
    }
}
