//! Ledger domain types.
//!
//! This module defines accounts, transactions, and the inputs used to create
//! and update them. A transaction's balance effect is defined here so every
//! mutation path shares one definition.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tally_shared::types::{AccountId, RuleId, TransactionId, UserId};

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money flowing into the account.
    Income,
    /// Money flowing out of the account.
    Expense,
}

impl TransactionKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }

    /// Returns the opposite direction.
    #[must_use]
    pub fn inverse(&self) -> Self {
        match self {
            Self::Income => Self::Expense,
            Self::Expense => Self::Income,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settlement status of a transaction.
///
/// Only Paid transactions contribute to an account's balance; a Pending
/// transaction is recorded but has no effect until confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Recorded but not yet settled; contributes nothing to the balance.
    Pending,
    /// Settled; its value has been applied to the account balance.
    Paid,
}

impl TransactionStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }

    /// Returns true if the transaction has been applied to the balance.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Owning user.
    pub owner: UserId,
    /// Display name.
    pub name: String,
    /// Balance at account creation.
    pub initial_balance: Decimal,
    /// Cached balance. Derived: initial_balance plus the effect of every
    /// Paid transaction on this account.
    pub current_balance: Decimal,
    /// Whether the account accepts new transactions.
    pub is_active: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new active account whose current balance starts at the
    /// initial balance.
    #[must_use]
    pub fn new(owner: UserId, name: impl Into<String>, initial_balance: Decimal) -> Self {
        Self {
            id: AccountId::new(),
            owner,
            name: name.into(),
            initial_balance,
            current_balance: initial_balance,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// A categorized transaction on a single account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// Owning user.
    pub owner: UserId,
    /// Account this transaction posts to.
    pub account_id: AccountId,
    /// Non-negative magnitude; direction comes from `kind`.
    pub value: Decimal,
    /// Income or expense.
    pub kind: TransactionKind,
    /// Pending or paid.
    pub status: TransactionStatus,
    /// Human-readable description.
    pub description: String,
    /// Optional category label.
    pub category: Option<String>,
    /// Transaction date.
    pub date: NaiveDate,
    /// The paired transaction when this is one leg of a transfer.
    pub related_transaction_id: Option<TransactionId>,
    /// The recurrence rule that materialized this transaction, if any.
    pub rule_id: Option<RuleId>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// The signed balance effect of this transaction.
    ///
    /// Paid income contributes `+value`, paid expense `-value`; a Pending
    /// transaction contributes zero. Every mutation path computes balance
    /// deltas by diffing this value, never by ad hoc increments.
    #[must_use]
    pub fn effect(&self) -> Decimal {
        if !self.status.is_settled() {
            return Decimal::ZERO;
        }
        match self.kind {
            TransactionKind::Income => self.value,
            TransactionKind::Expense => -self.value,
        }
    }
}

/// Input for creating a transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Account to post to.
    pub account_id: AccountId,
    /// Non-negative magnitude.
    pub value: Decimal,
    /// Income or expense.
    pub kind: TransactionKind,
    /// Initial settlement status.
    pub status: TransactionStatus,
    /// Human-readable description.
    pub description: String,
    /// Optional category label.
    pub category: Option<String>,
    /// Transaction date.
    pub date: NaiveDate,
}

/// Partial update for a transaction. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    /// New account, possibly different from the current one.
    pub account_id: Option<AccountId>,
    /// New magnitude.
    pub value: Option<Decimal>,
    /// New direction.
    pub kind: Option<TransactionKind>,
    /// New settlement status.
    pub status: Option<TransactionStatus>,
    /// New description.
    pub description: Option<String>,
    /// New category label.
    pub category: Option<String>,
    /// New transaction date.
    pub date: Option<NaiveDate>,
}

impl TransactionUpdate {
    /// Applies this update on top of an existing transaction, returning the
    /// candidate new state. Identity, ownership, links, and provenance are
    /// never touched by an update.
    #[must_use]
    pub fn apply_to(&self, current: &Transaction) -> Transaction {
        Transaction {
            id: current.id,
            owner: current.owner,
            account_id: self.account_id.unwrap_or(current.account_id),
            value: self.value.unwrap_or(current.value),
            kind: self.kind.unwrap_or(current.kind),
            status: self.status.unwrap_or(current.status),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| current.description.clone()),
            category: self.category.clone().or_else(|| current.category.clone()),
            date: self.date.unwrap_or(current.date),
            related_transaction_id: current.related_transaction_id,
            rule_id: current.rule_id,
            created_at: current.created_at,
        }
    }
}
