//! Shared fixtures for the engine integration suite.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use tally_core::clock::FixedClock;
use tally_core::ledger::types::{Account, NewTransaction, TransactionKind, TransactionStatus};
use tally_core::ledger::LedgerMutator;
use tally_core::locks::LockRegistry;
use tally_core::recurrence::types::{NewRule, RecurrencePattern, TransactionTemplate};
use tally_core::recurrence::RecurrenceProcessor;
use tally_core::store::AccountStore;
use tally_shared::types::{AccountId, UserId};
use tally_store::MemoryStore;

pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn ledger() -> (Arc<MemoryStore>, LedgerMutator<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let mutator = LedgerMutator::new(Arc::clone(&store), Arc::new(LockRegistry::new()));
    (store, mutator)
}

pub fn engine(
    today: NaiveDate,
) -> (
    Arc<MemoryStore>,
    LedgerMutator<MemoryStore>,
    RecurrenceProcessor<MemoryStore, FixedClock>,
) {
    let store = Arc::new(MemoryStore::new());
    let mutator = LedgerMutator::new(Arc::clone(&store), Arc::new(LockRegistry::new()));
    let processor = RecurrenceProcessor::new(
        Arc::clone(&store),
        mutator.clone(),
        Arc::new(FixedClock::on(today)),
    );
    (store, mutator, processor)
}

pub async fn seed_account(store: &MemoryStore, owner: UserId, balance: Decimal) -> Account {
    let account = Account::new(owner, "checking", balance);
    store.insert_account(account.clone()).await.unwrap();
    account
}

pub fn expense(account_id: AccountId, value: Decimal, status: TransactionStatus) -> NewTransaction {
    NewTransaction {
        account_id,
        value,
        kind: TransactionKind::Expense,
        status,
        description: "groceries".to_string(),
        category: Some("food".to_string()),
        date: ymd(2025, 6, 15),
    }
}

pub fn income(account_id: AccountId, value: Decimal, status: TransactionStatus) -> NewTransaction {
    NewTransaction {
        account_id,
        value,
        kind: TransactionKind::Income,
        status,
        description: "salary".to_string(),
        category: None,
        date: ymd(2025, 6, 1),
    }
}

pub fn monthly_rule(
    account_id: AccountId,
    start: NaiveDate,
    value: Decimal,
    auto_create: bool,
    require_confirmation: bool,
) -> NewRule {
    NewRule {
        pattern: RecurrencePattern::Monthly,
        interval: 1,
        start_date: start,
        end_date: None,
        template: TransactionTemplate {
            account_id,
            value,
            kind: TransactionKind::Expense,
            description: "rent".to_string(),
            category: Some("housing".to_string()),
        },
        auto_create,
        require_confirmation,
    }
}
