//! Ledger consistency engine.
//!
//! This module implements the balance-affecting half of the system:
//! - Domain types for accounts and transactions
//! - Business rule validation
//! - The mutation funnel (create / update / delete / confirm payment)
//! - The transfer orchestrator for linked cross-account pairs
//! - Error types for ledger operations

pub mod error;
pub mod mutator;
pub mod transfer;
pub mod types;
pub mod validation;

pub use error::LedgerError;
pub use mutator::LedgerMutator;
pub use transfer::{TransferOrchestrator, TransferOutcome};
pub use types::{
    Account, NewTransaction, Transaction, TransactionKind, TransactionStatus, TransactionUpdate,
};
