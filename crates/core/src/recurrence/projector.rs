//! Pure date projection for recurrence rules.
//!
//! Given a rule and a window, produces the ordered, deduplicated, finite
//! sequence of due dates. No side effects and no store access, so it is safe
//! to call repeatedly for previews.

use chrono::{Datelike, Days, Months, NaiveDate};

use super::types::{RecurrencePattern, RecurrenceRule};

/// Projects a rule's due dates within `[from, to]` (both inclusive).
///
/// The rule's own `start_date`/`end_date` further narrow the window; the
/// window bounds unbounded rules. Dates are strictly increasing by
/// construction.
#[must_use]
pub fn project(rule: &RecurrenceRule, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    occurrences(
        rule.pattern,
        rule.interval,
        rule.start_date,
        rule.end_date,
        from,
        to,
    )
}

/// Projects due dates for a pattern without needing a full rule.
#[must_use]
pub fn occurrences(
    pattern: RecurrencePattern,
    interval: u32,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<NaiveDate> {
    if interval == 0 {
        return Vec::new();
    }

    let lo = from.max(start_date);
    let hi = match end_date {
        Some(end) => to.min(end),
        None => to,
    };
    if lo > hi {
        return Vec::new();
    }

    match pattern {
        RecurrencePattern::Daily => fixed_step(start_date, u64::from(interval), lo, hi),
        RecurrencePattern::Weekly => fixed_step(start_date, u64::from(interval) * 7, lo, hi),
        RecurrencePattern::Monthly => month_step(start_date, interval, lo, hi),
        RecurrencePattern::Annual => year_step(start_date, interval, lo, hi),
    }
}

/// Daily/weekly: every `step_days` from the anchor. The first in-window
/// occurrence index is computed arithmetically so old anchors cost nothing.
fn fixed_step(start: NaiveDate, step_days: u64, lo: NaiveDate, hi: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();

    let gap = (lo - start).num_days();
    #[allow(clippy::cast_sign_loss)]
    let first = if gap <= 0 {
        0
    } else {
        (gap as u64).div_ceil(step_days)
    };

    let mut k = first;
    loop {
        let Some(date) = start.checked_add_days(Days::new(k * step_days)) else {
            break;
        };
        if date > hi {
            break;
        }
        if date >= lo {
            dates.push(date);
        }
        k += 1;
    }
    dates
}

/// Monthly: the anchor's day-of-month every `interval` months, clamped to
/// the target month's last day. Anchoring every occurrence to the original
/// start date keeps Jan 31 producing Mar 31, not Mar 28.
fn month_step(start: NaiveDate, interval: u32, lo: NaiveDate, hi: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let anchor_day = start.day();

    let mut k: u32 = 0;
    loop {
        let Some(shifted) = start.checked_add_months(Months::new(k.saturating_mul(interval)))
        else {
            break;
        };
        // checked_add_months clamps, but re-derive from the anchor day so a
        // clamped February does not shorten every later month.
        let date = clamped_ymd(shifted.year(), shifted.month(), anchor_day);
        if date > hi {
            break;
        }
        if date >= lo {
            dates.push(date);
        }
        match k.checked_add(1) {
            Some(next) => k = next,
            None => break,
        }
    }
    dates
}

/// Annual: the anchor's month/day every `interval` years; Feb 29 clamps to
/// Feb 28 in non-leap years.
fn year_step(start: NaiveDate, interval: u32, lo: NaiveDate, hi: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();

    let mut k: i32 = 0;
    loop {
        let Some(year) = start.year().checked_add(k.saturating_mul(interval as i32)) else {
            break;
        };
        let date = clamped_ymd(year, start.month(), start.day());
        if date > hi {
            break;
        }
        if date >= lo {
            dates.push(date);
        }
        match k.checked_add(1) {
            Some(next) => k = next,
            None => break,
        }
    }
    dates
}

/// Builds a date, clamping the day to the month's last valid day.
fn clamped_ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| {
        let last = last_day_of_month(year, month);
        NaiveDate::from_ymd_opt(year, month, last)
            .expect("last day of month is always a valid date")
    })
}

/// The number of days in the given month.
fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(28, |last| last.day())
}
