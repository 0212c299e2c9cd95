//! Property-based tests for the projector.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use super::projector::occurrences;
use super::types::RecurrencePattern;

fn arb_pattern() -> impl Strategy<Value = RecurrencePattern> {
    prop_oneof![
        Just(RecurrencePattern::Daily),
        Just(RecurrencePattern::Weekly),
        Just(RecurrencePattern::Monthly),
        Just(RecurrencePattern::Annual),
    ]
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    // 2020-01-01 plus up to ~8 years of days covers leap years and month
    // boundaries.
    (0u64..3000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(offset))
            .unwrap()
    })
}

proptest! {
    #[test]
    fn prop_dates_are_strictly_increasing(
        pattern in arb_pattern(),
        interval in 1u32..=12,
        start in arb_date(),
        window_offset in 0u64..400,
        window_len in 0u64..400,
    ) {
        let from = start.checked_add_days(Days::new(window_offset)).unwrap();
        let to = from.checked_add_days(Days::new(window_len)).unwrap();
        let dates = occurrences(pattern, interval, start, None, from, to);
        for pair in dates.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn prop_dates_stay_inside_window_and_bounds(
        pattern in arb_pattern(),
        interval in 1u32..=12,
        start in arb_date(),
        window_offset in 0u64..400,
        window_len in 0u64..400,
        end_offset in proptest::option::of(0u64..800),
    ) {
        let from = start.checked_add_days(Days::new(window_offset)).unwrap();
        let to = from.checked_add_days(Days::new(window_len)).unwrap();
        let end = end_offset.map(|o| start.checked_add_days(Days::new(o)).unwrap());
        let dates = occurrences(pattern, interval, start, end, from, to);
        for date in dates {
            prop_assert!(date >= from);
            prop_assert!(date <= to);
            prop_assert!(date >= start);
            if let Some(end) = end {
                prop_assert!(date <= end);
            }
        }
    }

    #[test]
    fn prop_daily_spacing_is_exact(
        interval in 1u32..=30,
        start in arb_date(),
        window_len in 0u64..500,
    ) {
        let to = start.checked_add_days(Days::new(window_len)).unwrap();
        let dates = occurrences(RecurrencePattern::Daily, interval, start, None, start, to);
        for (k, date) in dates.iter().enumerate() {
            let expected = start
                .checked_add_days(Days::new(k as u64 * u64::from(interval)))
                .unwrap();
            prop_assert_eq!(*date, expected);
        }
    }

    #[test]
    fn prop_projection_is_deterministic(
        pattern in arb_pattern(),
        interval in 1u32..=12,
        start in arb_date(),
        window_len in 0u64..400,
    ) {
        let to = start.checked_add_days(Days::new(window_len)).unwrap();
        let first = occurrences(pattern, interval, start, None, start, to);
        let second = occurrences(pattern, interval, start, None, start, to);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_adjacent_windows_partition_the_sequence(
        pattern in arb_pattern(),
        interval in 1u32..=6,
        start in arb_date(),
        split in 1u64..200,
        total in 200u64..400,
    ) {
        // Projecting [start, split] and (split, total] must together equal
        // projecting [start, total] — the watermark handoff relies on this.
        let mid = start.checked_add_days(Days::new(split)).unwrap();
        let to = start.checked_add_days(Days::new(total)).unwrap();

        let whole = occurrences(pattern, interval, start, None, start, to);
        let mut halves = occurrences(pattern, interval, start, None, start, mid);
        halves.extend(occurrences(
            pattern,
            interval,
            start,
            None,
            mid.succ_opt().unwrap(),
            to,
        ));
        prop_assert_eq!(whole, halves);
    }
}
