//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. All domain types, validation rules, and calculations live
//! here; persistence is consumed through the narrow store traits in
//! [`store`].
//!
//! # Modules
//!
//! - `ledger` - Balance-affecting mutations, transfers, and settlement
//! - `recurrence` - Recurrence projection, materialization, and confirmation
//! - `store` - Persistence traits and store errors
//! - `clock` - Time source abstraction
//! - `locks` - Per-entity serialization primitives
//! - `reporting` - Aggregate transaction statistics

pub mod clock;
pub mod ledger;
pub mod locks;
pub mod recurrence;
pub mod reporting;
pub mod store;
