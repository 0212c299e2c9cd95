//! Ledger error types for validation and state errors.

use rust_decimal::Decimal;
use thiserror::Error;

use tally_shared::error::AppError;
use tally_shared::types::{AccountId, TransactionId};

use crate::ledger::types::TransactionStatus;
use crate::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Lookup Errors ==========
    /// Account missing or not owned by the caller.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Transaction missing or not owned by the caller.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    // ========== Validation Errors ==========
    /// Transaction value must be non-negative.
    #[error("Transaction value cannot be negative")]
    NegativeValue,

    /// Account is inactive and cannot accept transactions.
    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    /// Transfer endpoints must be two distinct accounts.
    #[error("Transfer source and destination must differ")]
    SameAccountTransfer,

    /// Transfer value must be positive.
    #[error("Transfer value must be positive")]
    NonPositiveTransfer,

    /// Malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    // ========== State Errors ==========
    /// Illegal lifecycle transition.
    #[error("Invalid state: expected {expected}, transaction is {actual}")]
    InvalidState {
        /// The status the operation requires.
        expected: TransactionStatus,
        /// The status actually found.
        actual: TransactionStatus,
    },

    /// Transfer legs cannot be mutated independently.
    #[error("Transaction {0} is part of a transfer and cannot be edited directly")]
    TransferLegImmutable(TransactionId),

    // ========== Funds Errors ==========
    /// Source balance cannot cover the requested amount.
    #[error(
        "Insufficient funds: requested {requested}, available {available} (short {shortfall})"
    )]
    InsufficientFunds {
        /// Amount the caller asked to move.
        requested: Decimal,
        /// Balance actually available.
        available: Decimal,
        /// How much the request exceeds the balance.
        shortfall: Decimal,
    },

    // ========== Store Errors ==========
    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) | Self::TransactionNotFound(_) => "NOT_FOUND",
            Self::NegativeValue
            | Self::AccountInactive(_)
            | Self::SameAccountTransfer
            | Self::NonPositiveTransfer
            | Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidState { .. } | Self::TransferLegImmutable(_) => "INVALID_STATE",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns true if the operation may be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound(_) | LedgerError::TransactionNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            LedgerError::InvalidState { .. } | LedgerError::TransferLegImmutable(_) => {
                Self::InvalidState(err.to_string())
            }
            LedgerError::InsufficientFunds {
                requested,
                available,
                shortfall,
            } => Self::InsufficientFunds {
                requested,
                available,
                shortfall,
            },
            LedgerError::Store(e) => Self::Store(e.to_string()),
            _ => Self::Validation(err.to_string()),
        }
    }
}
