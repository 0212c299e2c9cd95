//! Owner-scoped ledger statistics.
//!
//! Everything here is derived by reading transactions through the store
//! traits; nothing is cached or incrementally maintained, so the numbers are
//! always consistent with the records that back them.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use tally_shared::types::UserId;

use crate::ledger::error::LedgerError;
use crate::ledger::types::{TransactionKind, TransactionStatus};
use crate::store::{TransactionFilter, TransactionStore};

/// Count and summed value of one `(kind, status)` bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Bucket {
    /// Number of transactions in the bucket.
    pub count: u64,
    /// Sum of their values.
    pub total: Decimal,
}

impl Bucket {
    fn add(&mut self, value: Decimal) {
        self.count += 1;
        self.total += value;
    }
}

/// A user's transaction totals broken down by direction and settlement.
///
/// Only `paid_income` and `paid_expense` have touched balances; the pending
/// buckets are commitments that will move money when confirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStatistics {
    /// Settled income.
    pub paid_income: Bucket,
    /// Settled expenses.
    pub paid_expense: Bucket,
    /// Unsettled income.
    pub pending_income: Bucket,
    /// Unsettled expenses.
    pub pending_expense: Bucket,
}

impl LedgerStatistics {
    /// Total number of transactions across all buckets.
    #[must_use]
    pub fn transaction_count(&self) -> u64 {
        self.paid_income.count
            + self.paid_expense.count
            + self.pending_income.count
            + self.pending_expense.count
    }

    /// Net settled flow: paid income minus paid expenses.
    #[must_use]
    pub fn net_paid(&self) -> Decimal {
        self.paid_income.total - self.paid_expense.total
    }

    fn bucket_mut(&mut self, kind: TransactionKind, status: TransactionStatus) -> &mut Bucket {
        match (kind, status) {
            (TransactionKind::Income, TransactionStatus::Paid) => &mut self.paid_income,
            (TransactionKind::Expense, TransactionStatus::Paid) => &mut self.paid_expense,
            (TransactionKind::Income, TransactionStatus::Pending) => &mut self.pending_income,
            (TransactionKind::Expense, TransactionStatus::Pending) => &mut self.pending_expense,
        }
    }
}

/// Computes statistics over a user's transactions.
pub struct ReportingService<S> {
    store: Arc<S>,
}

impl<S: TransactionStore> ReportingService<S> {
    /// Creates a reporting service over a transaction store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Aggregates every transaction the user owns into per-bucket counts and
    /// sums.
    pub async fn statistics(&self, owner: UserId) -> Result<LedgerStatistics, LedgerError> {
        let transactions = self
            .store
            .find_transactions(TransactionFilter::for_owner(owner))
            .await?;

        let mut stats = LedgerStatistics::default();
        for tx in transactions {
            stats.bucket_mut(tx.kind, tx.status).add(tx.value);
        }
        Ok(stats)
    }
}
