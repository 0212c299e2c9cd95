//! Runnable walkthrough of the ledger and recurrence engines.
//!
//! Seeds an in-memory store with one user and two accounts, then exercises
//! the main flows: settled and pending transactions, payment confirmation, a
//! transfer, a recurrence batch pass, and the confirmation queue.

use std::sync::Arc;

use anyhow::Result;
use chrono::Months;
use rust_decimal_macros::dec;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use tally_core::clock::{Clock, SystemClock};
use tally_core::ledger::types::{
    Account, NewTransaction, TransactionKind, TransactionStatus,
};
use tally_core::ledger::{LedgerMutator, TransferOrchestrator};
use tally_core::locks::LockRegistry;
use tally_core::recurrence::types::{NewRule, RecurrencePattern, TransactionTemplate};
use tally_core::recurrence::{PendingResolution, RecurrenceProcessor};
use tally_core::reporting::ReportingService;
use tally_core::store::AccountStore;
use tally_shared::config::AppConfig;
use tally_shared::types::UserId;
use tally_store::MemoryStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tally=debug,info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    info!(
        preview_months = config.recurrence.preview_months,
        batch_interval_secs = config.recurrence.batch_interval_secs,
        store_op_timeout_ms = config.store.op_timeout_ms,
        "configuration loaded"
    );

    let clock = Arc::new(SystemClock);
    let today = clock.today();

    let store = Arc::new(MemoryStore::new());
    let mutator = LedgerMutator::new(Arc::clone(&store), Arc::new(LockRegistry::new()));
    let transfers = TransferOrchestrator::new(mutator.clone());
    let processor = RecurrenceProcessor::new(Arc::clone(&store), mutator.clone(), clock)
        .with_preview_months(config.recurrence.preview_months);
    let reporting = ReportingService::new(Arc::clone(&store));

    // One user, two accounts.
    let owner = UserId::new();
    let checking = Account::new(owner, "checking", dec!(1500.50));
    let savings = Account::new(owner, "savings", dec!(5000));
    store.insert_account(checking.clone()).await?;
    store.insert_account(savings.clone()).await?;
    info!(checking = %checking.id, savings = %savings.id, "accounts seeded");

    // A settled expense applies immediately.
    mutator
        .create(
            owner,
            NewTransaction {
                account_id: checking.id,
                value: dec!(100),
                kind: TransactionKind::Expense,
                status: TransactionStatus::Paid,
                description: "groceries".to_string(),
                category: Some("food".to_string()),
                date: today,
            },
        )
        .await?;
    print_balance(&store, checking.id, "after paid expense").await?;

    // A pending bill changes nothing until confirmed.
    let bill = mutator
        .create(
            owner,
            NewTransaction {
                account_id: checking.id,
                value: dec!(50),
                kind: TransactionKind::Expense,
                status: TransactionStatus::Pending,
                description: "electricity bill".to_string(),
                category: Some("utilities".to_string()),
                date: today,
            },
        )
        .await?;
    print_balance(&store, checking.id, "after pending bill").await?;

    mutator.confirm_payment(owner, bill.id).await?;
    print_balance(&store, checking.id, "after confirmation").await?;

    // Move money between accounts as a linked pair.
    let outcome = transfers
        .create_transfer(owner, savings.id, checking.id, dec!(250), "monthly top-up", today)
        .await?;
    info!(
        withdrawal = %outcome.withdrawal.id,
        deposit = %outcome.deposit.id,
        "transfer legs created"
    );
    print_balance(&store, checking.id, "after transfer in").await?;
    print_balance(&store, savings.id, "after transfer out").await?;

    // A recurring subscription that started two months ago; the batch pass
    // materializes the backlog.
    let start = today
        .checked_sub_months(Months::new(2))
        .unwrap_or(today);
    let subscription = processor
        .create_rule(
            owner,
            NewRule {
                pattern: RecurrencePattern::Monthly,
                interval: 1,
                start_date: start,
                end_date: None,
                template: TransactionTemplate {
                    account_id: checking.id,
                    value: dec!(9.99),
                    kind: TransactionKind::Expense,
                    description: "streaming subscription".to_string(),
                    category: Some("entertainment".to_string()),
                },
                auto_create: true,
                require_confirmation: false,
            },
        )
        .await?;

    // A rent rule that insists on confirmation.
    let rent = processor
        .create_rule(
            owner,
            NewRule {
                pattern: RecurrencePattern::Monthly,
                interval: 1,
                start_date: start,
                end_date: None,
                template: TransactionTemplate {
                    account_id: checking.id,
                    value: dec!(800),
                    kind: TransactionKind::Expense,
                    description: "rent".to_string(),
                    category: Some("housing".to_string()),
                },
                auto_create: true,
                require_confirmation: true,
            },
        )
        .await?;

    let batch = processor.process().await?;
    info!(
        rules_scanned = batch.rules_scanned,
        transactions_materialized = batch.transactions_materialized,
        occurrences_created = batch.occurrences_created,
        "batch pass complete"
    );
    print_balance(&store, checking.id, "after batch pass").await?;

    // A second pass finds nothing new to do.
    let rerun = processor.process().await?;
    info!(
        transactions_materialized = rerun.transactions_materialized,
        occurrences_created = rerun.occurrences_created,
        "repeat pass is a no-op"
    );

    // Approve the oldest rent occurrence, reject the rest.
    let pending = processor.list_pending(owner).await?;
    info!(count = pending.len(), rule = %rent.id, "rent occurrences awaiting confirmation");
    for (index, occurrence) in pending.iter().enumerate() {
        let resolution = if index == 0 {
            PendingResolution::Approve
        } else {
            PendingResolution::Reject
        };
        let tx = processor
            .resolve_pending(owner, occurrence.id, resolution)
            .await?;
        info!(
            due_date = %occurrence.due_date,
            materialized = tx.is_some(),
            "occurrence resolved"
        );
    }
    print_balance(&store, checking.id, "after confirmations").await?;

    // Upcoming subscription charges, read-only.
    let upcoming = processor.preview(owner, subscription.id, None).await?;
    info!(count = upcoming.len(), "upcoming subscription dates");
    for date in upcoming.iter().take(3) {
        info!(%date, "next charge");
    }

    let stats = reporting.statistics(owner).await?;
    info!(
        transactions = stats.transaction_count(),
        paid_income = %stats.paid_income.total,
        paid_expense = %stats.paid_expense.total,
        net_paid = %stats.net_paid(),
        "ledger statistics"
    );

    Ok(())
}

async fn print_balance(
    store: &MemoryStore,
    account_id: tally_shared::types::AccountId,
    label: &str,
) -> Result<()> {
    let account = store
        .account(account_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("account vanished"))?;
    info!(balance = %account.current_balance, "{label}");
    Ok(())
}
