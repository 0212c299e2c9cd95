//! Transfers between two accounts of the same owner.
//!
//! A transfer is a linked pair of Paid transactions: an expense on the source
//! and an income on the destination, equal in magnitude and pointing at each
//! other through `related_transaction_id`. Both legs become visible together
//! or not at all.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use tally_shared::types::{AccountId, TransactionId, UserId};

use crate::store::LedgerStore;

use super::error::LedgerError;
use super::mutator::LedgerMutator;
use super::types::{Transaction, TransactionKind, TransactionStatus};
use super::validation::validate_account_for_posting;

/// The two legs created by a successful transfer.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// The Expense leg on the source account.
    pub withdrawal: Transaction,
    /// The Income leg on the destination account.
    pub deposit: Transaction,
}

/// Creates linked transaction pairs across two accounts.
pub struct TransferOrchestrator<S> {
    mutator: LedgerMutator<S>,
}

impl<S: LedgerStore> TransferOrchestrator<S> {
    /// Creates an orchestrator sharing the mutator's store and lock registry.
    ///
    /// Sharing the registry is what serializes transfers against single
    /// account mutations on the same accounts.
    #[must_use]
    pub fn new(mutator: LedgerMutator<S>) -> Self {
        Self { mutator }
    }

    /// Atomically moves `value` from one account to another.
    ///
    /// Both accounts are locked in ascending id order before the source
    /// balance is checked, so a concurrent withdrawal cannot slip between
    /// the check and the debit.
    pub async fn create_transfer(
        &self,
        owner: UserId,
        from: AccountId,
        to: AccountId,
        value: Decimal,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Result<TransferOutcome, LedgerError> {
        if from == to {
            return Err(LedgerError::SameAccountTransfer);
        }
        if value <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveTransfer);
        }

        let locks = self.mutator.locks();
        let _guards = locks.lock_pair(from.into_inner(), to.into_inner()).await;

        let mut source = self.mutator.load_owned_account(owner, from).await?;
        let mut destination = self.mutator.load_owned_account(owner, to).await?;
        validate_account_for_posting(&source, owner)?;
        validate_account_for_posting(&destination, owner)?;

        if source.current_balance < value {
            return Err(LedgerError::InsufficientFunds {
                requested: value,
                available: source.current_balance,
                shortfall: value - source.current_balance,
            });
        }

        let description = description.into();
        let withdrawal_id = TransactionId::new();
        let deposit_id = TransactionId::new();
        let now = chrono::Utc::now();

        let withdrawal = Transaction {
            id: withdrawal_id,
            owner,
            account_id: from,
            value,
            kind: TransactionKind::Expense,
            status: TransactionStatus::Paid,
            description: description.clone(),
            category: None,
            date,
            related_transaction_id: Some(deposit_id),
            rule_id: None,
            created_at: now,
        };
        let deposit = Transaction {
            id: deposit_id,
            owner,
            account_id: to,
            value,
            kind: TransactionKind::Income,
            status: TransactionStatus::Paid,
            description,
            category: None,
            date,
            related_transaction_id: Some(withdrawal_id),
            rule_id: None,
            created_at: now,
        };

        let store = self.mutator.store();
        store.insert_transaction(withdrawal.clone()).await?;
        if let Err(e) = store.insert_transaction(deposit.clone()).await {
            let _ = store.delete_transaction(withdrawal_id).await;
            return Err(e.into());
        }

        source.current_balance -= value;
        if let Err(e) = store.update_account(source.clone()).await {
            let _ = store.delete_transaction(withdrawal_id).await;
            let _ = store.delete_transaction(deposit_id).await;
            return Err(e.into());
        }

        destination.current_balance += value;
        if let Err(e) = store.update_account(destination).await {
            // Restore the debited source before removing the legs.
            source.current_balance += value;
            let _ = store.update_account(source).await;
            let _ = store.delete_transaction(withdrawal_id).await;
            let _ = store.delete_transaction(deposit_id).await;
            return Err(e.into());
        }

        debug!(
            from = %from,
            to = %to,
            value = %value,
            "transfer created"
        );
        Ok(TransferOutcome {
            withdrawal,
            deposit,
        })
    }
}
