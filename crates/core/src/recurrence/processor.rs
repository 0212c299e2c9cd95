//! Rule lifecycle and the batch materialization pass.
//!
//! The processor owns everything stateful about recurrence: rule CRUD, the
//! periodic batch pass that turns due dates into transactions or pending
//! occurrences, previews, and confirmation of queued occurrences.
//!
//! Idempotency is layered: the per-rule watermark makes repeat passes cheap,
//! per-rule locks serialize concurrent passes, and the store's unique
//! `(rule_id, due_date)` constraints backstop anything that slips through.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use tally_shared::types::{OccurrenceId, RuleId, UserId};

use crate::clock::Clock;
use crate::ledger::mutator::LedgerMutator;
use crate::ledger::types::{NewTransaction, Transaction, TransactionStatus};
use crate::locks::LockRegistry;
use crate::store::{EngineStore, StoreError};

use super::error::RecurrenceError;
use super::projector;
use super::types::{
    BatchOutcome, NewRule, PendingOccurrence, PendingResolution, PendingStatus, RecurrenceRule,
    RuleUpdate, TransactionTemplate,
};

/// Preview horizon used when the caller does not specify one.
pub const DEFAULT_PREVIEW_MONTHS: u32 = 12;

/// Drives recurrence rules: CRUD, batch processing, preview, confirmation.
pub struct RecurrenceProcessor<S, C> {
    store: Arc<S>,
    mutator: LedgerMutator<S>,
    // Keyed by rule id during batch passes and by occurrence id during
    // resolution. Distinct from the mutator's account lock registry.
    rule_locks: Arc<LockRegistry>,
    clock: Arc<C>,
    preview_months: u32,
}

impl<S, C> RecurrenceProcessor<S, C>
where
    S: EngineStore,
    C: Clock,
{
    /// Creates a processor over a store, a ledger mutator, and a clock.
    ///
    /// The mutator must share its store with `store`; materialized
    /// transactions go through the same funnel as manual ones.
    #[must_use]
    pub fn new(store: Arc<S>, mutator: LedgerMutator<S>, clock: Arc<C>) -> Self {
        Self {
            store,
            mutator,
            rule_locks: Arc::new(LockRegistry::new()),
            clock,
            preview_months: DEFAULT_PREVIEW_MONTHS,
        }
    }

    /// Overrides the default preview horizon.
    #[must_use]
    pub fn with_preview_months(mut self, months: u32) -> Self {
        self.preview_months = months;
        self
    }

    // --- rule lifecycle ---

    /// Creates a rule after validating it and its template's account.
    pub async fn create_rule(
        &self,
        owner: UserId,
        input: NewRule,
    ) -> Result<RecurrenceRule, RecurrenceError> {
        validate_schedule(input.interval, input.start_date, input.end_date)?;
        validate_template(&input.template)?;
        self.mutator
            .load_owned_account(owner, input.template.account_id)
            .await?;

        let rule = RecurrenceRule {
            id: RuleId::new(),
            owner,
            pattern: input.pattern,
            interval: input.interval,
            start_date: input.start_date,
            end_date: input.end_date,
            template: input.template,
            auto_create: input.auto_create,
            require_confirmation: input.require_confirmation,
            last_processed_date: None,
            is_active: true,
            created_at: chrono::Utc::now(),
        };
        self.store.insert_rule(rule.clone()).await?;

        info!(rule_id = %rule.id, pattern = %rule.pattern, "recurrence rule created");
        Ok(rule)
    }

    /// Fetches a rule, mapping missing-or-unowned to `RuleNotFound`.
    pub async fn rule(&self, owner: UserId, id: RuleId) -> Result<RecurrenceRule, RecurrenceError> {
        match self.store.rule(id).await? {
            Some(rule) if rule.owner == owner => Ok(rule),
            _ => Err(RecurrenceError::RuleNotFound(id)),
        }
    }

    /// Lists a user's rules.
    pub async fn rules(&self, owner: UserId) -> Result<Vec<RecurrenceRule>, RecurrenceError> {
        Ok(self.store.rules_by_owner(owner).await?)
    }

    /// Applies a partial update to a rule.
    ///
    /// The watermark is untouched: dates already considered stay considered,
    /// even if the edit would have projected differently for them.
    pub async fn update_rule(
        &self,
        owner: UserId,
        id: RuleId,
        update: RuleUpdate,
    ) -> Result<RecurrenceRule, RecurrenceError> {
        let _guard = self.rule_locks.lock(id.into_inner()).await;

        let current = self.rule(owner, id).await?;
        let candidate = update.apply_to(&current);
        validate_schedule(candidate.interval, candidate.start_date, candidate.end_date)?;
        validate_template(&candidate.template)?;
        if candidate.template.account_id != current.template.account_id {
            self.mutator
                .load_owned_account(owner, candidate.template.account_id)
                .await?;
        }

        self.store.update_rule(candidate.clone()).await?;
        debug!(rule_id = %id, "recurrence rule updated");
        Ok(candidate)
    }

    /// Deletes a rule. Already-materialized transactions and resolved
    /// occurrences survive; only future projection stops.
    pub async fn delete_rule(&self, owner: UserId, id: RuleId) -> Result<(), RecurrenceError> {
        let _guard = self.rule_locks.lock(id.into_inner()).await;

        self.rule(owner, id).await?;
        self.store.delete_rule(id).await?;
        info!(rule_id = %id, "recurrence rule deleted");
        Ok(())
    }

    // --- batch pass ---

    /// Runs one batch pass over every active rule.
    ///
    /// Each rule is handled independently: a failure is logged, counted, and
    /// skipped without aborting the pass. A failed rule's watermark does not
    /// advance, so its window is retried next pass; the uniqueness backstops
    /// make that retry safe.
    pub async fn process(&self) -> Result<BatchOutcome, RecurrenceError> {
        let today = self.clock.today();
        let rules = self.store.active_rules().await?;

        let mut outcome = BatchOutcome::default();
        for rule in rules {
            outcome.rules_scanned += 1;
            match self.process_rule(rule.id, today).await {
                Ok((queued, materialized)) => {
                    outcome.occurrences_created += queued;
                    outcome.transactions_materialized += materialized;
                }
                Err(e) => {
                    warn!(rule_id = %rule.id, error = %e, "rule processing failed, skipping");
                    outcome.rules_failed += 1;
                }
            }
        }

        info!(
            rules_scanned = outcome.rules_scanned,
            occurrences_created = outcome.occurrences_created,
            transactions_materialized = outcome.transactions_materialized,
            rules_failed = outcome.rules_failed,
            "recurrence batch pass finished"
        );
        Ok(outcome)
    }

    /// Processes one rule's due window under its lock.
    async fn process_rule(
        &self,
        id: RuleId,
        today: NaiveDate,
    ) -> Result<(u64, u64), RecurrenceError> {
        let _guard = self.rule_locks.lock(id.into_inner()).await;

        // Re-read under the lock; a concurrent pass may have advanced the
        // watermark already.
        let Some(mut rule) = self.store.rule(id).await? else {
            return Ok((0, 0));
        };
        if !rule.is_active {
            return Ok((0, 0));
        }

        let Some((from, to)) = due_window(&rule, today) else {
            return Ok((0, 0));
        };

        let mut queued = 0;
        let mut materialized = 0;
        for due_date in projector::project(&rule, from, to) {
            if rule.materializes_directly() {
                if self.materialize(&rule, due_date).await? {
                    materialized += 1;
                }
            } else if self.queue_occurrence(&rule, due_date).await? {
                queued += 1;
            }
        }

        // Every date through today has now been considered exactly once.
        rule.last_processed_date = Some(to);
        self.store.update_rule(rule).await?;

        Ok((queued, materialized))
    }

    /// Creates the Paid transaction for a due date, unless one already
    /// exists for `(rule_id, due_date)`.
    async fn materialize(
        &self,
        rule: &RecurrenceRule,
        due_date: NaiveDate,
    ) -> Result<bool, RecurrenceError> {
        if self.store.rule_has_transaction_on(rule.id, due_date).await? {
            debug!(rule_id = %rule.id, %due_date, "already materialized, skipping");
            return Ok(false);
        }

        let tx = self
            .mutator
            .create_with_provenance(
                rule.owner,
                template_to_transaction(&rule.template, due_date),
                Some(rule.id),
            )
            .await?;
        debug!(rule_id = %rule.id, transaction_id = %tx.id, %due_date, "occurrence materialized");
        Ok(true)
    }

    /// Queues a pending occurrence for a due date. A duplicate-key rejection
    /// means another pass got there first and is not an error.
    async fn queue_occurrence(
        &self,
        rule: &RecurrenceRule,
        due_date: NaiveDate,
    ) -> Result<bool, RecurrenceError> {
        let occurrence = PendingOccurrence {
            id: OccurrenceId::new(),
            rule_id: rule.id,
            owner: rule.owner,
            due_date,
            template: rule.template.clone(),
            status: PendingStatus::Awaiting,
            resolved_at: None,
            created_at: chrono::Utc::now(),
        };

        match self.store.insert_occurrence(occurrence).await {
            Ok(()) => {
                debug!(rule_id = %rule.id, %due_date, "occurrence queued for confirmation");
                Ok(true)
            }
            Err(StoreError::DuplicateKey(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // --- preview ---

    /// Projects a rule's upcoming due dates without touching any state.
    ///
    /// The window is `[today, today + months)`, further narrowed by the
    /// rule's own bounds; the exclusive horizon caps a monthly rule at
    /// `months` dates even when one falls due today. Repeated calls are free
    /// of side effects.
    pub async fn preview(
        &self,
        owner: UserId,
        id: RuleId,
        months: Option<u32>,
    ) -> Result<Vec<NaiveDate>, RecurrenceError> {
        let rule = self.rule(owner, id).await?;
        let today = self.clock.today();
        let months = months.unwrap_or(self.preview_months);
        let Some(horizon) = today
            .checked_add_months(chrono::Months::new(months))
            .and_then(|end| end.pred_opt())
        else {
            return Ok(Vec::new());
        };
        Ok(projector::project(&rule, today, horizon))
    }

    // --- pending confirmation queue ---

    /// Lists a user's occurrences still awaiting a decision.
    pub async fn list_pending(
        &self,
        owner: UserId,
    ) -> Result<Vec<PendingOccurrence>, RecurrenceError> {
        Ok(self.store.awaiting_by_owner(owner).await?)
    }

    /// Resolves a pending occurrence.
    ///
    /// Approval materializes the snapshot into a Paid transaction through the
    /// ledger funnel; rejection discards it with no balance effect. Either
    /// way the occurrence leaves the Awaiting state exactly once — a second
    /// resolution fails with `AlreadyResolved`.
    pub async fn resolve_pending(
        &self,
        owner: UserId,
        id: OccurrenceId,
        resolution: PendingResolution,
    ) -> Result<Option<Transaction>, RecurrenceError> {
        let _guard = self.rule_locks.lock(id.into_inner()).await;

        let occurrence = match self.store.occurrence(id).await? {
            Some(occ) if occ.owner == owner => occ,
            _ => return Err(RecurrenceError::OccurrenceNotFound(id)),
        };
        if occurrence.status != PendingStatus::Awaiting {
            return Err(RecurrenceError::AlreadyResolved(occurrence.status));
        }

        let (status, tx) = match resolution {
            PendingResolution::Approve => {
                // Materialize first; a failed ledger write leaves the
                // occurrence Awaiting so the decision can be retried.
                let tx = self
                    .mutator
                    .create_with_provenance(
                        owner,
                        template_to_transaction(&occurrence.template, occurrence.due_date),
                        Some(occurrence.rule_id),
                    )
                    .await?;
                (PendingStatus::Approved, Some(tx))
            }
            PendingResolution::Reject => (PendingStatus::Rejected, None),
        };

        let mut resolved = occurrence;
        resolved.status = status;
        resolved.resolved_at = Some(chrono::Utc::now());
        self.store.update_occurrence(resolved).await?;

        info!(occurrence_id = %id, %status, "pending occurrence resolved");
        Ok(tx)
    }
}

/// The inclusive window of dates one batch pass owes this rule, or `None`
/// when nothing is due.
///
/// Opens just past the watermark, or at the rule's start for a never
/// processed rule, and closes at today.
fn due_window(rule: &RecurrenceRule, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let from = match rule.last_processed_date {
        Some(watermark) => watermark.succ_opt()?,
        None => rule.start_date,
    };
    if from > today {
        return None;
    }
    Some((from, today))
}

fn template_to_transaction(template: &TransactionTemplate, date: NaiveDate) -> NewTransaction {
    NewTransaction {
        account_id: template.account_id,
        value: template.value,
        kind: template.kind,
        status: TransactionStatus::Paid,
        description: template.description.clone(),
        category: template.category.clone(),
        date,
    }
}

fn validate_schedule(
    interval: u32,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<(), RecurrenceError> {
    if interval == 0 {
        return Err(RecurrenceError::InvalidInterval);
    }
    if let Some(end) = end {
        if end < start {
            return Err(RecurrenceError::EndBeforeStart { start, end });
        }
    }
    Ok(())
}

fn validate_template(template: &TransactionTemplate) -> Result<(), RecurrenceError> {
    if template.value < Decimal::ZERO {
        return Err(RecurrenceError::Validation(
            "template value cannot be negative".to_string(),
        ));
    }
    if template.description.trim().is_empty() {
        return Err(RecurrenceError::Validation(
            "template description cannot be blank".to_string(),
        ));
    }
    Ok(())
}
