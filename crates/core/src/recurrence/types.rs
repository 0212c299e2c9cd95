//! Recurrence domain types.
//!
//! A rule describes a repeating transaction; the projector turns it into
//! concrete due dates, and the processor either materializes those dates
//! directly or parks them in the pending confirmation queue.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use tally_shared::types::{AccountId, OccurrenceId, RuleId, UserId};

use crate::ledger::types::TransactionKind;

/// Repetition pattern of a recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    /// Every `interval` days.
    Daily,
    /// Every `interval` weeks.
    Weekly,
    /// Every `interval` months, clamped to the target month's last day.
    Monthly,
    /// Every `interval` years; Feb 29 clamps to Feb 28 off leap years.
    Annual,
}

impl RecurrencePattern {
    /// Returns the string representation of the pattern.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    /// Parses a pattern from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "annual" | "yearly" => Some(Self::Annual),
            _ => None,
        }
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The transaction fields a rule stamps onto each occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionTemplate {
    /// Account the materialized transaction posts to.
    pub account_id: AccountId,
    /// Non-negative magnitude.
    pub value: Decimal,
    /// Income or expense.
    pub kind: TransactionKind,
    /// Description stamped onto each occurrence.
    pub description: String,
    /// Optional category label.
    pub category: Option<String>,
}

/// A recurring-transaction rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceRule {
    /// Unique identifier.
    pub id: RuleId,
    /// Owning user.
    pub owner: UserId,
    /// Repetition pattern.
    pub pattern: RecurrencePattern,
    /// Pattern multiplier; 1 means every period.
    pub interval: u32,
    /// First date an occurrence can fall on.
    pub start_date: NaiveDate,
    /// Last date an occurrence can fall on, if bounded.
    pub end_date: Option<NaiveDate>,
    /// Transaction fields for each occurrence.
    pub template: TransactionTemplate,
    /// Whether due occurrences may be materialized without a human in the
    /// loop. Only honored when `require_confirmation` is false.
    pub auto_create: bool,
    /// Whether every occurrence must be explicitly confirmed before it can
    /// touch a balance.
    pub require_confirmation: bool,
    /// Watermark: the latest date through which this rule's occurrences have
    /// been considered. `None` means the rule has never been processed.
    pub last_processed_date: Option<NaiveDate>,
    /// Inactive rules are skipped by the batch pass.
    pub is_active: bool,
    /// When the rule was created.
    pub created_at: DateTime<Utc>,
}

impl RecurrenceRule {
    /// Returns true if this rule materializes due occurrences without
    /// confirmation.
    #[must_use]
    pub fn materializes_directly(&self) -> bool {
        self.auto_create && !self.require_confirmation
    }
}

/// Input for creating a rule.
#[derive(Debug, Clone)]
pub struct NewRule {
    /// Repetition pattern.
    pub pattern: RecurrencePattern,
    /// Pattern multiplier; must be at least 1.
    pub interval: u32,
    /// First date an occurrence can fall on.
    pub start_date: NaiveDate,
    /// Last date an occurrence can fall on, if bounded.
    pub end_date: Option<NaiveDate>,
    /// Transaction fields for each occurrence.
    pub template: TransactionTemplate,
    /// Materialize without a human in the loop.
    pub auto_create: bool,
    /// Require explicit confirmation per occurrence.
    pub require_confirmation: bool,
}

/// Partial update for a rule. `None` fields are left unchanged.
///
/// The watermark is deliberately absent: editing a rule never rewinds or
/// advances `last_processed_date`.
#[derive(Debug, Clone, Default)]
pub struct RuleUpdate {
    /// New pattern.
    pub pattern: Option<RecurrencePattern>,
    /// New interval.
    pub interval: Option<u32>,
    /// New start date.
    pub start_date: Option<NaiveDate>,
    /// New end date (`Some(None)` clears the bound).
    pub end_date: Option<Option<NaiveDate>>,
    /// New template.
    pub template: Option<TransactionTemplate>,
    /// New auto-create flag.
    pub auto_create: Option<bool>,
    /// New confirmation flag.
    pub require_confirmation: Option<bool>,
    /// Activate or deactivate the rule.
    pub is_active: Option<bool>,
}

impl RuleUpdate {
    /// Applies this update on top of an existing rule, returning the
    /// candidate new state.
    #[must_use]
    pub fn apply_to(&self, current: &RecurrenceRule) -> RecurrenceRule {
        RecurrenceRule {
            id: current.id,
            owner: current.owner,
            pattern: self.pattern.unwrap_or(current.pattern),
            interval: self.interval.unwrap_or(current.interval),
            start_date: self.start_date.unwrap_or(current.start_date),
            end_date: self.end_date.unwrap_or(current.end_date),
            template: self.template.clone().unwrap_or_else(|| current.template.clone()),
            auto_create: self.auto_create.unwrap_or(current.auto_create),
            require_confirmation: self
                .require_confirmation
                .unwrap_or(current.require_confirmation),
            last_processed_date: current.last_processed_date,
            is_active: self.is_active.unwrap_or(current.is_active),
            created_at: current.created_at,
        }
    }
}

/// Resolution status of a pending occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingStatus {
    /// Waiting for a human decision.
    Awaiting,
    /// Approved and materialized into a transaction.
    Approved,
    /// Rejected; no balance effect will ever result.
    Rejected,
}

impl PendingStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Awaiting => "awaiting",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A human decision on a pending occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingResolution {
    /// Materialize the snapshot into a Paid transaction.
    Approve,
    /// Discard with no balance effect.
    Reject,
}

/// One projected occurrence parked for confirmation.
///
/// At most one exists per `(rule_id, due_date)`; the store enforces this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOccurrence {
    /// Unique identifier.
    pub id: OccurrenceId,
    /// The rule that projected this occurrence.
    pub rule_id: RuleId,
    /// Owning user (copied from the rule for owner-scoped listing).
    pub owner: UserId,
    /// The projected date.
    pub due_date: NaiveDate,
    /// Template snapshot taken at projection time, so a later rule edit
    /// cannot change what was offered for confirmation.
    pub template: TransactionTemplate,
    /// Resolution status.
    pub status: PendingStatus,
    /// When the occurrence was resolved, if it has been.
    pub resolved_at: Option<DateTime<Utc>>,
    /// When the occurrence was created.
    pub created_at: DateTime<Utc>,
}

/// Counters reported by one batch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Active rules examined.
    pub rules_scanned: u64,
    /// Pending occurrences queued for confirmation.
    pub occurrences_created: u64,
    /// Transactions materialized directly.
    pub transactions_materialized: u64,
    /// Rules skipped because processing them failed.
    pub rules_failed: u64,
}
