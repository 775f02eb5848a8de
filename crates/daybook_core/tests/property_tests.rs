//! Property-based tests for daybook_core.
//!
//! Uses proptest to verify invariants that must hold for ALL possible inputs,
//! not just hand-picked examples.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use daybook_core::{end_of_day, DailyTime, Mood};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_day() -> impl Strategy<Value = NaiveDate> {
    // 1970-01-01 .. roughly 2100
    (0i64..47_000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(1970, 1, 1).unwrap() + Duration::days(offset)
    })
}

fn arb_datetime() -> impl Strategy<Value = NaiveDateTime> {
    (arb_day(), 0u32..86_400).prop_map(|(day, secs)| {
        day.and_hms_opt(secs / 3600, (secs / 60) % 60, secs % 60).unwrap()
    })
}

fn arb_daily_time() -> impl Strategy<Value = DailyTime> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| DailyTime::new(h, m).unwrap())
}

// ============================================================================
// Mood validation boundary
// ============================================================================

proptest! {
    /// Arbitrary model output always resolves to a vocabulary member.
    #[test]
    fn mood_output_always_in_vocabulary(raw in ".*") {
        let mood = Mood::from_model_output(&raw, Mood::Neutral);
        prop_assert!(Mood::ALL.contains(&mood));
    }

    /// Any tag survives whitespace and quoting noise.
    #[test]
    fn mood_tag_survives_padding(idx in 0usize..15, pad in "[ \t\n]{0,4}") {
        let mood = Mood::ALL[idx];
        let raw = format!("{pad}\"{}\"{pad}", mood.as_str());
        prop_assert_eq!(Mood::from_model_output(&raw, Mood::Neutral), mood);
    }

    /// Strings containing a character outside the tag alphabet are never accepted
    /// as anything but the fallback.
    #[test]
    fn mood_with_foreign_chars_falls_back(raw in "[a-z_]{1,12}[0-9#@]{1,3}") {
        prop_assert_eq!(Mood::from_model_output(&raw, Mood::Tired), Mood::Tired);
    }
}

// ============================================================================
// Day attribution
// ============================================================================

proptest! {
    /// End-of-day attribution never leaves the target day.
    #[test]
    fn end_of_day_stays_on_day(day in arb_day()) {
        let ts = end_of_day(day);
        prop_assert_eq!(ts.date(), day);
        prop_assert!(ts + Duration::seconds(1) > ts);
        prop_assert_ne!((ts + Duration::seconds(1)).date(), day);
    }

    /// The next firing instant is in the future and less than a day away.
    #[test]
    fn next_fire_is_within_one_day(now in arb_datetime(), time in arb_daily_time()) {
        let next = time.next_fire_after(now);
        prop_assert!(next > now);
        prop_assert!(next - now <= Duration::days(1));
        prop_assert_eq!(next.time(), time.on(next.date()).time());
    }
}
