//! Persistence traits consumed by the engines.
//!
//! The ledger and recurrence engines never talk to a concrete database; they
//! depend on these narrow traits and receive an implementation at
//! construction. All four entity collections are addressable by id and
//! filterable by owner.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use tally_shared::types::{AccountId, OccurrenceId, RuleId, TransactionId, UserId};

use crate::ledger::types::{Account, Transaction, TransactionKind, TransactionStatus};
use crate::recurrence::types::{PendingOccurrence, RecurrenceRule};

/// Errors surfaced by a store implementation.
///
/// Retryable and terminal failures are distinguished so callers can retry
/// timeouts without ever treating one as a silent mutation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The persistence call did not complete within its bound.
    #[error("Store operation timed out")]
    Timeout,

    /// The store is temporarily unreachable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint rejected the write.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Unrecoverable store failure.
    #[error("Store internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns true if the operation may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable(_))
    }
}

/// Filter options for listing transactions.
///
/// Backed by the store's `(owner, account_id, date)` index.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Filter by owning user.
    pub owner: Option<UserId>,
    /// Filter by account.
    pub account_id: Option<AccountId>,
    /// Filter by settlement status.
    pub status: Option<TransactionStatus>,
    /// Filter by direction.
    pub kind: Option<TransactionKind>,
    /// Filter by date range start (inclusive).
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end (inclusive).
    pub date_to: Option<NaiveDate>,
}

impl TransactionFilter {
    /// Filter for everything a user owns.
    #[must_use]
    pub fn for_owner(owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    /// Returns true if the transaction matches every set field.
    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.owner.is_none_or(|owner| tx.owner == owner)
            && self.account_id.is_none_or(|account| tx.account_id == account)
            && self.status.is_none_or(|status| tx.status == status)
            && self.kind.is_none_or(|kind| tx.kind == kind)
            && self.date_from.is_none_or(|from| tx.date >= from)
            && self.date_to.is_none_or(|to| tx.date <= to)
    }
}

/// Persisted account records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts a new account.
    async fn insert_account(&self, account: Account) -> Result<(), StoreError>;

    /// Fetches an account by id.
    async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Lists all accounts belonging to a user.
    async fn accounts_by_owner(&self, owner: UserId) -> Result<Vec<Account>, StoreError>;

    /// Replaces an account record (balance updates included).
    async fn update_account(&self, account: Account) -> Result<(), StoreError>;
}

/// Persisted transaction records.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Inserts a new transaction.
    async fn insert_transaction(&self, tx: Transaction) -> Result<(), StoreError>;

    /// Fetches a transaction by id.
    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Replaces a transaction record.
    async fn update_transaction(&self, tx: Transaction) -> Result<(), StoreError>;

    /// Removes a transaction, returning true if it existed.
    async fn delete_transaction(&self, id: TransactionId) -> Result<bool, StoreError>;

    /// Lists transactions matching the filter, ordered by date.
    async fn find_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// Returns true if a rule has already materialized a transaction on the
    /// given date.
    async fn rule_has_transaction_on(
        &self,
        rule_id: RuleId,
        date: NaiveDate,
    ) -> Result<bool, StoreError>;
}

/// Persisted recurrence rules.
#[async_trait]
pub trait RecurrenceRuleStore: Send + Sync {
    /// Inserts a new rule.
    async fn insert_rule(&self, rule: RecurrenceRule) -> Result<(), StoreError>;

    /// Fetches a rule by id.
    async fn rule(&self, id: RuleId) -> Result<Option<RecurrenceRule>, StoreError>;

    /// Lists all rules belonging to a user.
    async fn rules_by_owner(&self, owner: UserId) -> Result<Vec<RecurrenceRule>, StoreError>;

    /// Lists every active rule across all users (batch scan input).
    async fn active_rules(&self) -> Result<Vec<RecurrenceRule>, StoreError>;

    /// Replaces a rule record (watermark advances included).
    async fn update_rule(&self, rule: RecurrenceRule) -> Result<(), StoreError>;

    /// Removes a rule, returning true if it existed.
    async fn delete_rule(&self, id: RuleId) -> Result<bool, StoreError>;
}

/// Persisted pending occurrences awaiting confirmation.
#[async_trait]
pub trait PendingOccurrenceStore: Send + Sync {
    /// Inserts a new occurrence.
    ///
    /// Implementations must enforce `(rule_id, due_date)` uniqueness
    /// atomically and reject duplicates with [`StoreError::DuplicateKey`].
    async fn insert_occurrence(&self, occurrence: PendingOccurrence) -> Result<(), StoreError>;

    /// Fetches an occurrence by id.
    async fn occurrence(&self, id: OccurrenceId) -> Result<Option<PendingOccurrence>, StoreError>;

    /// Returns true if any occurrence exists for `(rule_id, due_date)`,
    /// whatever its resolution status.
    async fn occurrence_exists(
        &self,
        rule_id: RuleId,
        due_date: NaiveDate,
    ) -> Result<bool, StoreError>;

    /// Lists a user's occurrences still awaiting confirmation.
    async fn awaiting_by_owner(&self, owner: UserId)
        -> Result<Vec<PendingOccurrence>, StoreError>;

    /// Replaces an occurrence record (resolution included).
    async fn update_occurrence(&self, occurrence: PendingOccurrence) -> Result<(), StoreError>;
}

/// Everything the ledger engine needs from persistence.
pub trait LedgerStore: AccountStore + TransactionStore {}

impl<S: AccountStore + TransactionStore> LedgerStore for S {}

/// Everything the full engine (ledger + recurrence) needs from persistence.
pub trait EngineStore: LedgerStore + RecurrenceRuleStore + PendingOccurrenceStore {}

impl<S: LedgerStore + RecurrenceRuleStore + PendingOccurrenceStore> EngineStore for S {}
