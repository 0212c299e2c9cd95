//! End-to-end ledger behavior against the in-memory store.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal_macros::dec;

use common::{expense, income, ledger, seed_account, ymd};
use tally_core::ledger::types::{
    Account, Transaction, TransactionKind, TransactionStatus, TransactionUpdate,
};
use tally_core::ledger::{LedgerError, LedgerMutator};
use tally_core::locks::LockRegistry;
use tally_core::store::{
    AccountStore, StoreError, TransactionFilter, TransactionStore,
};
use tally_shared::types::{AccountId, RuleId, TransactionId, UserId};
use tally_store::MemoryStore;

#[tokio::test]
async fn test_paid_expense_then_pending_then_confirmation() {
    let (store, mutator) = ledger();
    let owner = UserId::new();
    let account = seed_account(&store, owner, dec!(1500.50)).await;

    // Paid expense applies immediately.
    mutator
        .create(owner, expense(account.id, dec!(100), TransactionStatus::Paid))
        .await
        .unwrap();
    let balance = store.account(account.id).await.unwrap().unwrap().current_balance;
    assert_eq!(balance, dec!(1400.50));

    // Pending expense changes nothing.
    let pending = mutator
        .create(owner, expense(account.id, dec!(50), TransactionStatus::Pending))
        .await
        .unwrap();
    let balance = store.account(account.id).await.unwrap().unwrap().current_balance;
    assert_eq!(balance, dec!(1400.50));

    // Confirmation applies the effect exactly once.
    mutator.confirm_payment(owner, pending.id).await.unwrap();
    let balance = store.account(account.id).await.unwrap().unwrap().current_balance;
    assert_eq!(balance, dec!(1350.50));
}

#[tokio::test]
async fn test_double_confirmation_is_rejected() {
    let (store, mutator) = ledger();
    let owner = UserId::new();
    let account = seed_account(&store, owner, dec!(500)).await;

    let pending = mutator
        .create(owner, expense(account.id, dec!(50), TransactionStatus::Pending))
        .await
        .unwrap();
    mutator.confirm_payment(owner, pending.id).await.unwrap();

    let second = mutator.confirm_payment(owner, pending.id).await;
    assert!(matches!(
        second,
        Err(LedgerError::InvalidState {
            expected: TransactionStatus::Pending,
            actual: TransactionStatus::Paid,
        })
    ));

    // The effect landed once, not twice.
    let balance = store.account(account.id).await.unwrap().unwrap().current_balance;
    assert_eq!(balance, dec!(450));
}

#[tokio::test]
async fn test_income_increases_balance() {
    let (store, mutator) = ledger();
    let owner = UserId::new();
    let account = seed_account(&store, owner, dec!(0)).await;

    mutator
        .create(owner, income(account.id, dec!(2000), TransactionStatus::Paid))
        .await
        .unwrap();
    let balance = store.account(account.id).await.unwrap().unwrap().current_balance;
    assert_eq!(balance, dec!(2000));
}

#[tokio::test]
async fn test_update_value_applies_net_delta() {
    let (store, mutator) = ledger();
    let owner = UserId::new();
    let account = seed_account(&store, owner, dec!(1000)).await;

    let tx = mutator
        .create(owner, expense(account.id, dec!(100), TransactionStatus::Paid))
        .await
        .unwrap();

    let update = TransactionUpdate {
        value: Some(dec!(60)),
        ..TransactionUpdate::default()
    };
    mutator.update(owner, tx.id, update).await.unwrap();

    let balance = store.account(account.id).await.unwrap().unwrap().current_balance;
    assert_eq!(balance, dec!(940));
}

#[tokio::test]
async fn test_update_flipping_kind_reverses_effect() {
    let (store, mutator) = ledger();
    let owner = UserId::new();
    let account = seed_account(&store, owner, dec!(1000)).await;

    let tx = mutator
        .create(owner, expense(account.id, dec!(100), TransactionStatus::Paid))
        .await
        .unwrap();

    let update = TransactionUpdate {
        kind: Some(TransactionKind::Income),
        ..TransactionUpdate::default()
    };
    mutator.update(owner, tx.id, update).await.unwrap();

    // -100 reverted, +100 applied.
    let balance = store.account(account.id).await.unwrap().unwrap().current_balance;
    assert_eq!(balance, dec!(1100));
}

#[tokio::test]
async fn test_update_demoting_to_pending_reverts_effect() {
    let (store, mutator) = ledger();
    let owner = UserId::new();
    let account = seed_account(&store, owner, dec!(1000)).await;

    let tx = mutator
        .create(owner, expense(account.id, dec!(75), TransactionStatus::Paid))
        .await
        .unwrap();

    let update = TransactionUpdate {
        status: Some(TransactionStatus::Pending),
        ..TransactionUpdate::default()
    };
    mutator.update(owner, tx.id, update).await.unwrap();

    let balance = store.account(account.id).await.unwrap().unwrap().current_balance;
    assert_eq!(balance, dec!(1000));
}

#[tokio::test]
async fn test_update_moving_accounts_moves_effect() {
    let (store, mutator) = ledger();
    let owner = UserId::new();
    let first = seed_account(&store, owner, dec!(500)).await;
    let second = seed_account(&store, owner, dec!(500)).await;

    let tx = mutator
        .create(owner, expense(first.id, dec!(200), TransactionStatus::Paid))
        .await
        .unwrap();
    assert_eq!(
        store.account(first.id).await.unwrap().unwrap().current_balance,
        dec!(300)
    );

    let update = TransactionUpdate {
        account_id: Some(second.id),
        ..TransactionUpdate::default()
    };
    mutator.update(owner, tx.id, update).await.unwrap();

    assert_eq!(
        store.account(first.id).await.unwrap().unwrap().current_balance,
        dec!(500)
    );
    assert_eq!(
        store.account(second.id).await.unwrap().unwrap().current_balance,
        dec!(300)
    );
}

#[tokio::test]
async fn test_delete_paid_reverts_effect_and_pending_does_not() {
    let (store, mutator) = ledger();
    let owner = UserId::new();
    let account = seed_account(&store, owner, dec!(1000)).await;

    let paid = mutator
        .create(owner, expense(account.id, dec!(100), TransactionStatus::Paid))
        .await
        .unwrap();
    let pending = mutator
        .create(owner, expense(account.id, dec!(40), TransactionStatus::Pending))
        .await
        .unwrap();

    mutator.delete(owner, paid.id).await.unwrap();
    mutator.delete(owner, pending.id).await.unwrap();

    let balance = store.account(account.id).await.unwrap().unwrap().current_balance;
    assert_eq!(balance, dec!(1000));
}

#[tokio::test]
async fn test_inactive_account_rejects_postings() {
    let (store, mutator) = ledger();
    let owner = UserId::new();
    let mut account = seed_account(&store, owner, dec!(100)).await;
    account.is_active = false;
    store.update_account(account.clone()).await.unwrap();

    let result = mutator
        .create(owner, expense(account.id, dec!(10), TransactionStatus::Paid))
        .await;
    assert!(matches!(result, Err(LedgerError::AccountInactive(_))));
}

#[tokio::test]
async fn test_foreign_account_and_transaction_are_invisible() {
    let (store, mutator) = ledger();
    let owner = UserId::new();
    let stranger = UserId::new();
    let account = seed_account(&store, owner, dec!(100)).await;

    let result = mutator
        .create(stranger, expense(account.id, dec!(10), TransactionStatus::Paid))
        .await;
    assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));

    let tx = mutator
        .create(owner, expense(account.id, dec!(10), TransactionStatus::Paid))
        .await
        .unwrap();
    let result = mutator.delete(stranger, tx.id).await;
    assert!(matches!(result, Err(LedgerError::TransactionNotFound(_))));
}

#[tokio::test]
async fn test_negative_value_is_rejected() {
    let (store, mutator) = ledger();
    let owner = UserId::new();
    let account = seed_account(&store, owner, dec!(100)).await;

    let result = mutator
        .create(owner, expense(account.id, dec!(-5), TransactionStatus::Paid))
        .await;
    assert!(matches!(result, Err(LedgerError::NegativeValue)));
}

#[tokio::test]
async fn test_missing_transaction_is_not_found() {
    let (_store, mutator) = ledger();
    let result = mutator.delete(UserId::new(), TransactionId::new()).await;
    assert!(matches!(result, Err(LedgerError::TransactionNotFound(_))));
}

#[tokio::test]
async fn test_balance_matches_recomputation_after_mixed_sequence() {
    let (store, mutator) = ledger();
    let owner = UserId::new();
    let account = seed_account(&store, owner, dec!(250.75)).await;

    let a = mutator
        .create(owner, income(account.id, dec!(1000), TransactionStatus::Paid))
        .await
        .unwrap();
    let b = mutator
        .create(owner, expense(account.id, dec!(333.33), TransactionStatus::Paid))
        .await
        .unwrap();
    let c = mutator
        .create(owner, expense(account.id, dec!(50), TransactionStatus::Pending))
        .await
        .unwrap();

    mutator.confirm_payment(owner, c.id).await.unwrap();
    mutator
        .update(
            owner,
            b.id,
            TransactionUpdate {
                value: Some(dec!(300)),
                ..TransactionUpdate::default()
            },
        )
        .await
        .unwrap();
    mutator.delete(owner, a.id).await.unwrap();

    // initial + sum of surviving Paid effects: 250.75 - 300 - 50
    let balance = store.account(account.id).await.unwrap().unwrap().current_balance;
    assert_eq!(balance, dec!(-99.25));
}

#[tokio::test]
async fn test_statistics_bucket_by_kind_and_status() {
    let (store, mutator) = ledger();
    let owner = UserId::new();
    let account = seed_account(&store, owner, dec!(0)).await;

    mutator
        .create(owner, income(account.id, dec!(2000), TransactionStatus::Paid))
        .await
        .unwrap();
    mutator
        .create(owner, expense(account.id, dec!(120.50), TransactionStatus::Paid))
        .await
        .unwrap();
    mutator
        .create(owner, expense(account.id, dec!(80), TransactionStatus::Pending))
        .await
        .unwrap();

    let reporting = tally_core::reporting::ReportingService::new(std::sync::Arc::clone(&store));
    let stats = reporting.statistics(owner).await.unwrap();

    assert_eq!(stats.paid_income.count, 1);
    assert_eq!(stats.paid_income.total, dec!(2000));
    assert_eq!(stats.paid_expense.total, dec!(120.50));
    assert_eq!(stats.pending_expense.count, 1);
    assert_eq!(stats.pending_income.count, 0);
    assert_eq!(stats.net_paid(), dec!(1879.50));
    assert_eq!(stats.transaction_count(), 3);

    // Another user sees nothing.
    let empty = reporting.statistics(UserId::new()).await.unwrap();
    assert_eq!(empty.transaction_count(), 0);
}

#[tokio::test]
async fn test_create_on_unknown_account_is_not_found() {
    let (_store, mutator) = ledger();
    let result = mutator
        .create(
            UserId::new(),
            expense(AccountId::new(), dec!(10), TransactionStatus::Paid),
        )
        .await;
    assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
}

/// Store wrapper whose balance writes fail for one designated account, for
/// exercising the mutator's compensation paths.
struct PoisonedBalanceStore {
    inner: MemoryStore,
    poisoned: AccountId,
}

impl PoisonedBalanceStore {
    fn new(poisoned: AccountId) -> Self {
        Self {
            inner: MemoryStore::new(),
            poisoned,
        }
    }
}

#[async_trait]
impl AccountStore for PoisonedBalanceStore {
    async fn insert_account(&self, account: Account) -> Result<(), StoreError> {
        self.inner.insert_account(account).await
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.inner.account(id).await
    }

    async fn accounts_by_owner(&self, owner: UserId) -> Result<Vec<Account>, StoreError> {
        self.inner.accounts_by_owner(owner).await
    }

    async fn update_account(&self, account: Account) -> Result<(), StoreError> {
        if account.id == self.poisoned {
            return Err(StoreError::Unavailable("balance shard down".to_string()));
        }
        self.inner.update_account(account).await
    }
}

#[async_trait]
impl TransactionStore for PoisonedBalanceStore {
    async fn insert_transaction(&self, tx: Transaction) -> Result<(), StoreError> {
        self.inner.insert_transaction(tx).await
    }

    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        self.inner.transaction(id).await
    }

    async fn update_transaction(&self, tx: Transaction) -> Result<(), StoreError> {
        self.inner.update_transaction(tx).await
    }

    async fn delete_transaction(&self, id: TransactionId) -> Result<bool, StoreError> {
        self.inner.delete_transaction(id).await
    }

    async fn find_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.inner.find_transactions(filter).await
    }

    async fn rule_has_transaction_on(
        &self,
        rule_id: RuleId,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        self.inner.rule_has_transaction_on(rule_id, date).await
    }
}

#[tokio::test]
async fn test_failed_cross_account_move_restores_source_balance() {
    let owner = UserId::new();
    let source = Account::new(owner, "source", dec!(500));
    let target = Account::new(owner, "target", dec!(500));

    // Balance writes on the target account fail; everything else works.
    let store = Arc::new(PoisonedBalanceStore::new(target.id));
    store.insert_account(source.clone()).await.unwrap();
    store.insert_account(target.clone()).await.unwrap();
    let mutator = LedgerMutator::new(Arc::clone(&store), Arc::new(LockRegistry::new()));

    let tx = mutator
        .create(owner, expense(source.id, dec!(200), TransactionStatus::Paid))
        .await
        .unwrap();
    assert_eq!(
        store.account(source.id).await.unwrap().unwrap().current_balance,
        dec!(300)
    );

    let update = TransactionUpdate {
        account_id: Some(target.id),
        ..TransactionUpdate::default()
    };
    let result = mutator.update(owner, tx.id, update).await;
    assert!(matches!(result, Err(LedgerError::Store(_))));

    // The source got its reverted effect back, the target never moved, and
    // the transaction record is unchanged.
    assert_eq!(
        store.account(source.id).await.unwrap().unwrap().current_balance,
        dec!(300)
    );
    assert_eq!(
        store.account(target.id).await.unwrap().unwrap().current_balance,
        dec!(500)
    );
    let stored = store.transaction(tx.id).await.unwrap().unwrap();
    assert_eq!(stored.account_id, source.id);
    assert_eq!(stored.value, dec!(200));
    assert_eq!(stored.status, TransactionStatus::Paid);
}

#[tokio::test]
async fn test_dates_do_not_gate_effects() {
    // A Paid transaction dated in the future still affects the balance;
    // settlement is the only gate.
    let (store, mutator) = ledger();
    let owner = UserId::new();
    let account = seed_account(&store, owner, dec!(100)).await;

    let mut input = expense(account.id, dec!(25), TransactionStatus::Paid);
    input.date = ymd(2030, 1, 1);
    mutator.create(owner, input).await.unwrap();

    let balance = store.account(account.id).await.unwrap().unwrap().current_balance;
    assert_eq!(balance, dec!(75));
}
