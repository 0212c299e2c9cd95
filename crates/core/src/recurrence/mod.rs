//! Recurrence scheduling engine.
//!
//! Split along a purity seam:
//! - The projector is a pure function from a rule and a window to due dates
//! - The processor owns all state: rule CRUD, the batch materialization pass
//!   with its watermark, previews, and the pending confirmation queue

pub mod error;
pub mod processor;
pub mod projector;
pub mod types;

#[cfg(test)]
mod projector_props;

pub use error::RecurrenceError;
pub use processor::{RecurrenceProcessor, DEFAULT_PREVIEW_MONTHS};
pub use types::{
    BatchOutcome, NewRule, PendingOccurrence, PendingResolution, PendingStatus, RecurrencePattern,
    RecurrenceRule, RuleUpdate, TransactionTemplate,
};
