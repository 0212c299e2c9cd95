//! The single funnel for every balance-affecting mutation.
//!
//! Create, update, delete, and payment confirmation all go through one
//! recompute-and-diff procedure: the balance delta is always
//! `effect(new) - effect(old)`, never an ad hoc increment at a call site.
//! All mutations for a given account are serialized through a shared
//! [`LockRegistry`].

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use tally_shared::types::{AccountId, RuleId, TransactionId, UserId};

use crate::locks::LockRegistry;
use crate::store::LedgerStore;

use super::error::LedgerError;
use super::types::{
    Account, NewTransaction, Transaction, TransactionStatus, TransactionUpdate,
};
use super::validation::{
    validate_account_for_posting, validate_new_transaction, validate_updated_transaction,
};

/// Applies balance-affecting mutations atomically, one account at a time.
pub struct LedgerMutator<S> {
    store: Arc<S>,
    locks: Arc<LockRegistry>,
}

impl<S> Clone for LedgerMutator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S: LedgerStore> LedgerMutator<S> {
    /// Creates a mutator over a store and a shared account lock registry.
    ///
    /// The registry must be the same one used by every other component that
    /// mutates balances (the transfer orchestrator in particular), or the
    /// per-account serialization guarantee is void.
    #[must_use]
    pub fn new(store: Arc<S>, locks: Arc<LockRegistry>) -> Self {
        Self { store, locks }
    }

    /// The underlying store handle.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The shared account lock registry.
    #[must_use]
    pub fn locks(&self) -> &Arc<LockRegistry> {
        &self.locks
    }

    /// Creates a transaction, applying its effect iff it is already Paid.
    pub async fn create(
        &self,
        owner: UserId,
        input: NewTransaction,
    ) -> Result<Transaction, LedgerError> {
        self.create_with_provenance(owner, input, None).await
    }

    /// Creates a transaction materialized from a recurrence rule.
    ///
    /// Identical to [`create`](Self::create) except the resulting record
    /// carries the rule id, which backs the once-per-`(rule_id, date)`
    /// materialization guarantee.
    pub async fn create_with_provenance(
        &self,
        owner: UserId,
        input: NewTransaction,
        rule_id: Option<RuleId>,
    ) -> Result<Transaction, LedgerError> {
        validate_new_transaction(&input)?;

        let _guard = self.locks.lock(input.account_id.into_inner()).await;

        let account = self.load_owned_account(owner, input.account_id).await?;
        validate_account_for_posting(&account, owner)?;

        let tx = Transaction {
            id: TransactionId::new(),
            owner,
            account_id: input.account_id,
            value: input.value,
            kind: input.kind,
            status: input.status,
            description: input.description,
            category: input.category,
            date: input.date,
            related_transaction_id: None,
            rule_id,
            created_at: chrono::Utc::now(),
        };

        self.store.insert_transaction(tx.clone()).await?;

        let delta = tx.effect();
        if let Err(e) = self.apply_delta(account, delta).await {
            // Roll back the insert so a failed balance write leaves no
            // orphan record.
            let _ = self.store.delete_transaction(tx.id).await;
            return Err(e);
        }

        debug!(transaction_id = %tx.id, account_id = %tx.account_id, delta = %delta, "transaction created");
        Ok(tx)
    }

    /// Updates a transaction, applying a single net delta.
    ///
    /// When the account changes, the old effect is reverted on the old
    /// account and the new effect applied on the new one, with both accounts
    /// locked in id order for the duration.
    pub async fn update(
        &self,
        owner: UserId,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> Result<Transaction, LedgerError> {
        loop {
            let current = self.load_owned_tx(owner, id).await?;
            let candidate = update.apply_to(&current);

            let _guards = self
                .lock_accounts(current.account_id, candidate.account_id)
                .await;

            // The transaction may have moved accounts between the read and
            // the lock acquisition; retry against the fresh state.
            let fresh = self.load_owned_tx(owner, id).await?;
            if fresh.account_id != current.account_id {
                continue;
            }

            let candidate = update.apply_to(&fresh);
            validate_updated_transaction(&fresh, &candidate)?;

            if candidate.account_id != fresh.account_id {
                let new_account = self.load_owned_account(owner, candidate.account_id).await?;
                validate_account_for_posting(&new_account, owner)?;
            }

            self.store.update_transaction(candidate.clone()).await?;

            let result = if candidate.account_id == fresh.account_id {
                let account = self.load_owned_account(owner, fresh.account_id).await?;
                self.apply_delta(account, candidate.effect() - fresh.effect())
                    .await
            } else {
                self.apply_split_delta(owner, &fresh, &candidate).await
            };

            if let Err(e) = result {
                let _ = self.store.update_transaction(fresh.clone()).await;
                return Err(e);
            }

            debug!(transaction_id = %id, "transaction updated");
            return Ok(candidate);
        }
    }

    /// Deletes a transaction, reverting its effect iff it is Paid.
    pub async fn delete(
        &self,
        owner: UserId,
        id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        loop {
            let current = self.load_owned_tx(owner, id).await?;
            let _guard = self.locks.lock(current.account_id.into_inner()).await;

            let fresh = self.load_owned_tx(owner, id).await?;
            if fresh.account_id != current.account_id {
                continue;
            }

            self.store.delete_transaction(id).await?;

            let account = self.load_owned_account(owner, fresh.account_id).await?;
            if let Err(e) = self.apply_delta(account, -fresh.effect()).await {
                let _ = self.store.insert_transaction(fresh.clone()).await;
                return Err(e);
            }

            debug!(transaction_id = %id, "transaction deleted");
            return Ok(fresh);
        }
    }

    /// Confirms payment of a Pending transaction, applying its forward
    /// effect exactly once.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the transaction is not Pending, which guards
    /// against double confirmation.
    pub async fn confirm_payment(
        &self,
        owner: UserId,
        id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        loop {
            let current = self.load_owned_tx(owner, id).await?;
            let _guard = self.locks.lock(current.account_id.into_inner()).await;

            let fresh = self.load_owned_tx(owner, id).await?;
            if fresh.account_id != current.account_id {
                continue;
            }

            if fresh.status != TransactionStatus::Pending {
                return Err(LedgerError::InvalidState {
                    expected: TransactionStatus::Pending,
                    actual: fresh.status,
                });
            }

            let mut confirmed = fresh.clone();
            confirmed.status = TransactionStatus::Paid;

            self.store.update_transaction(confirmed.clone()).await?;

            let account = self.load_owned_account(owner, fresh.account_id).await?;
            if let Err(e) = self.apply_delta(account, confirmed.effect()).await {
                let _ = self.store.update_transaction(fresh.clone()).await;
                return Err(e);
            }

            debug!(transaction_id = %id, "payment confirmed");
            return Ok(confirmed);
        }
    }

    /// Fetches a transaction, mapping missing-or-unowned to `NotFound`.
    pub async fn load_owned_tx(
        &self,
        owner: UserId,
        id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        match self.store.transaction(id).await? {
            Some(tx) if tx.owner == owner => Ok(tx),
            _ => Err(LedgerError::TransactionNotFound(id)),
        }
    }

    /// Fetches an account, mapping missing-or-unowned to `NotFound`.
    pub async fn load_owned_account(
        &self,
        owner: UserId,
        id: AccountId,
    ) -> Result<Account, LedgerError> {
        match self.store.account(id).await? {
            Some(account) if account.owner == owner => Ok(account),
            _ => Err(LedgerError::AccountNotFound(id)),
        }
    }

    async fn lock_accounts(
        &self,
        a: AccountId,
        b: AccountId,
    ) -> Vec<tokio::sync::OwnedMutexGuard<()>> {
        if a == b {
            vec![self.locks.lock(a.into_inner()).await]
        } else {
            let (first, second) = self.locks.lock_pair(a.into_inner(), b.into_inner()).await;
            vec![first, second]
        }
    }

    async fn apply_delta(&self, mut account: Account, delta: Decimal) -> Result<(), LedgerError> {
        if delta == Decimal::ZERO {
            return Ok(());
        }
        account.current_balance += delta;
        self.store.update_account(account).await?;
        Ok(())
    }

    /// Reverts the old effect on the old account and applies the new effect
    /// on the new one. If the second half fails, the first is compensated so
    /// the old account's balance is back where it started.
    async fn apply_split_delta(
        &self,
        owner: UserId,
        old: &Transaction,
        new: &Transaction,
    ) -> Result<(), LedgerError> {
        let old_account = self.load_owned_account(owner, old.account_id).await?;
        self.apply_delta(old_account, -old.effect()).await?;

        let forward = match self.load_owned_account(owner, new.account_id).await {
            Ok(new_account) => self.apply_delta(new_account, new.effect()).await,
            Err(e) => Err(e),
        };
        if let Err(e) = forward {
            // Put the reverted effect back before surfacing the failure.
            if let Ok(account) = self.load_owned_account(owner, old.account_id).await {
                let _ = self.apply_delta(account, old.effect()).await;
            }
            return Err(e);
        }
        Ok(())
    }
}
