//! Business rule validation for ledger operations.
//!
//! Inputs are validated at the boundary, before any lock is taken or any
//! write is attempted.

use rust_decimal::Decimal;

use tally_shared::types::UserId;

use super::error::LedgerError;
use super::types::{Account, NewTransaction, Transaction};

/// Validates an account for posting on behalf of a user.
///
/// # Errors
///
/// Returns `AccountNotFound` for an unowned account (ownership failures are
/// indistinguishable from missing entities to the caller) and
/// `AccountInactive` for a closed one.
pub fn validate_account_for_posting(account: &Account, owner: UserId) -> Result<(), LedgerError> {
    if account.owner != owner {
        return Err(LedgerError::AccountNotFound(account.id));
    }
    if !account.is_active {
        return Err(LedgerError::AccountInactive(account.id));
    }
    Ok(())
}

/// Validates a new transaction's fields.
///
/// # Errors
///
/// Returns `NegativeValue` or `Validation` on malformed input.
pub fn validate_new_transaction(input: &NewTransaction) -> Result<(), LedgerError> {
    if input.value < Decimal::ZERO {
        return Err(LedgerError::NegativeValue);
    }
    if input.description.trim().is_empty() {
        return Err(LedgerError::Validation(
            "description must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the candidate state produced by an update.
///
/// Transfer legs are immutable through the generic update path; unlinking or
/// re-valuing one leg would break the pair invariant.
///
/// # Errors
///
/// Returns `TransferLegImmutable` for linked transactions and value errors as
/// for creation.
pub fn validate_updated_transaction(
    current: &Transaction,
    candidate: &Transaction,
) -> Result<(), LedgerError> {
    if current.related_transaction_id.is_some() {
        return Err(LedgerError::TransferLegImmutable(current.id));
    }
    if candidate.value < Decimal::ZERO {
        return Err(LedgerError::NegativeValue);
    }
    if candidate.description.trim().is_empty() {
        return Err(LedgerError::Validation(
            "description must not be empty".to_string(),
        ));
    }
    Ok(())
}
