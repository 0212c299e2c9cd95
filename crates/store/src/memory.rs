//! Process-local store backed by concurrent maps.
//!
//! Every collection is a [`DashMap`] keyed by id, plus one auxiliary index
//! enforcing the `(rule_id, due_date)` uniqueness the recurrence engine
//! relies on. Each trait method is individually atomic; cross-record
//! atomicity is the engines' job, via their lock registries and
//! compensating writes.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

use tally_core::ledger::types::{Account, Transaction};
use tally_core::recurrence::types::{PendingOccurrence, PendingStatus, RecurrenceRule};
use tally_core::store::{
    AccountStore, PendingOccurrenceStore, RecurrenceRuleStore, StoreError, TransactionFilter,
    TransactionStore,
};
use tally_shared::types::{AccountId, OccurrenceId, RuleId, TransactionId, UserId};

/// In-memory store implementing all four persistence traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: DashMap<AccountId, Account>,
    transactions: DashMap<TransactionId, Transaction>,
    rules: DashMap<RuleId, RecurrenceRule>,
    occurrences: DashMap<OccurrenceId, PendingOccurrence>,
    // Unique index backing the once-per-(rule, date) guarantee. Claimed
    // atomically via the entry API before the occurrence record is written.
    occurrence_index: DashMap<(RuleId, NaiveDate), OccurrenceId>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_account(&self, account: Account) -> Result<(), StoreError> {
        match self.accounts.entry(account.id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey(format!(
                "account {}",
                account.id
            ))),
            Entry::Vacant(slot) => {
                trace!(account_id = %account.id, "account inserted");
                slot.insert(account);
                Ok(())
            }
        }
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).map(|entry| entry.clone()))
    }

    async fn accounts_by_owner(&self, owner: UserId) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|entry| entry.owner == owner)
            .map(|entry| entry.clone())
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    async fn update_account(&self, account: Account) -> Result<(), StoreError> {
        match self.accounts.entry(account.id) {
            Entry::Occupied(mut slot) => {
                slot.insert(account);
                Ok(())
            }
            Entry::Vacant(_) => Err(StoreError::Internal(format!(
                "update of missing account {}",
                account.id
            ))),
        }
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn insert_transaction(&self, tx: Transaction) -> Result<(), StoreError> {
        match self.transactions.entry(tx.id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey(format!("transaction {}", tx.id))),
            Entry::Vacant(slot) => {
                trace!(transaction_id = %tx.id, "transaction inserted");
                slot.insert(tx);
                Ok(())
            }
        }
    }

    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.transactions.get(&id).map(|entry| entry.clone()))
    }

    async fn update_transaction(&self, tx: Transaction) -> Result<(), StoreError> {
        match self.transactions.entry(tx.id) {
            Entry::Occupied(mut slot) => {
                slot.insert(tx);
                Ok(())
            }
            Entry::Vacant(_) => Err(StoreError::Internal(format!(
                "update of missing transaction {}",
                tx.id
            ))),
        }
    }

    async fn delete_transaction(&self, id: TransactionId) -> Result<bool, StoreError> {
        Ok(self.transactions.remove(&id).is_some())
    }

    async fn find_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut matches: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.clone())
            .collect();
        matches.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        Ok(matches)
    }

    async fn rule_has_transaction_on(
        &self,
        rule_id: RuleId,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        Ok(self
            .transactions
            .iter()
            .any(|entry| entry.rule_id == Some(rule_id) && entry.date == date))
    }
}

#[async_trait]
impl RecurrenceRuleStore for MemoryStore {
    async fn insert_rule(&self, rule: RecurrenceRule) -> Result<(), StoreError> {
        match self.rules.entry(rule.id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey(format!("rule {}", rule.id))),
            Entry::Vacant(slot) => {
                slot.insert(rule);
                Ok(())
            }
        }
    }

    async fn rule(&self, id: RuleId) -> Result<Option<RecurrenceRule>, StoreError> {
        Ok(self.rules.get(&id).map(|entry| entry.clone()))
    }

    async fn rules_by_owner(&self, owner: UserId) -> Result<Vec<RecurrenceRule>, StoreError> {
        let mut rules: Vec<RecurrenceRule> = self
            .rules
            .iter()
            .filter(|entry| entry.owner == owner)
            .map(|entry| entry.clone())
            .collect();
        rules.sort_by_key(|rule| rule.created_at);
        Ok(rules)
    }

    async fn active_rules(&self) -> Result<Vec<RecurrenceRule>, StoreError> {
        let mut rules: Vec<RecurrenceRule> = self
            .rules
            .iter()
            .filter(|entry| entry.is_active)
            .map(|entry| entry.clone())
            .collect();
        rules.sort_by_key(|rule| rule.created_at);
        Ok(rules)
    }

    async fn update_rule(&self, rule: RecurrenceRule) -> Result<(), StoreError> {
        match self.rules.entry(rule.id) {
            Entry::Occupied(mut slot) => {
                slot.insert(rule);
                Ok(())
            }
            Entry::Vacant(_) => Err(StoreError::Internal(format!(
                "update of missing rule {}",
                rule.id
            ))),
        }
    }

    async fn delete_rule(&self, id: RuleId) -> Result<bool, StoreError> {
        Ok(self.rules.remove(&id).is_some())
    }
}

#[async_trait]
impl PendingOccurrenceStore for MemoryStore {
    async fn insert_occurrence(&self, occurrence: PendingOccurrence) -> Result<(), StoreError> {
        // Claim the (rule, date) slot first; whoever wins the entry race
        // owns the occurrence.
        match self
            .occurrence_index
            .entry((occurrence.rule_id, occurrence.due_date))
        {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey(format!(
                "occurrence for rule {} on {}",
                occurrence.rule_id, occurrence.due_date
            ))),
            Entry::Vacant(slot) => {
                slot.insert(occurrence.id);
                trace!(occurrence_id = %occurrence.id, "occurrence inserted");
                self.occurrences.insert(occurrence.id, occurrence);
                Ok(())
            }
        }
    }

    async fn occurrence(
        &self,
        id: OccurrenceId,
    ) -> Result<Option<PendingOccurrence>, StoreError> {
        Ok(self.occurrences.get(&id).map(|entry| entry.clone()))
    }

    async fn occurrence_exists(
        &self,
        rule_id: RuleId,
        due_date: NaiveDate,
    ) -> Result<bool, StoreError> {
        Ok(self.occurrence_index.contains_key(&(rule_id, due_date)))
    }

    async fn awaiting_by_owner(
        &self,
        owner: UserId,
    ) -> Result<Vec<PendingOccurrence>, StoreError> {
        let mut awaiting: Vec<PendingOccurrence> = self
            .occurrences
            .iter()
            .filter(|entry| entry.owner == owner && entry.status == PendingStatus::Awaiting)
            .map(|entry| entry.clone())
            .collect();
        awaiting.sort_by_key(|occ| occ.due_date);
        Ok(awaiting)
    }

    async fn update_occurrence(&self, occurrence: PendingOccurrence) -> Result<(), StoreError> {
        match self.occurrences.entry(occurrence.id) {
            Entry::Occupied(mut slot) => {
                slot.insert(occurrence);
                Ok(())
            }
            Entry::Vacant(_) => Err(StoreError::Internal(format!(
                "update of missing occurrence {}",
                occurrence.id
            ))),
        }
    }
}
