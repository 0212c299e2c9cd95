//! Time source abstraction.
//!
//! The recurrence engine decides due-ness against "today", so tests need to
//! pin the clock instead of reading the wall clock.

use chrono::{DateTime, NaiveDate, Utc};

/// Supplies the current instant and calendar date.
pub trait Clock: Send + Sync {
    /// The current UTC instant.
    fn now(&self) -> DateTime<Utc>;

    /// The current UTC calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a fixed date, for tests and previews.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    /// Creates a clock pinned to midnight UTC on the given date.
    #[must_use]
    pub fn on(date: NaiveDate) -> Self {
        Self {
            instant: date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}
