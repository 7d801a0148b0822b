//! SM-2 spaced repetition.
//!
//! Per-item interval and ease computation following the SuperMemo SM-2
//! scheme:
//! 1. Quality is clamped to 0-5
//! 2. Ease moves by `0.1 - (5-q) * (0.08 + (5-q) * 0.02)`, floored at 1.3
//! 3. A pass (q >= 3) grows the interval 1 → 6 → round(interval * new ease)
//! 4. A fail resets interval and repetitions but keeps the lowered ease
//!
//! Intervals are capped at [`MAX_INTERVAL_DAYS`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::item::ReviewState;

/// Lowest ease factor an item can reach.
pub const MIN_EASE: f64 = 1.3;

/// Highest quality score.
pub const MAX_QUALITY: i64 = 5;

/// Lowest passing quality score.
pub const PASS_QUALITY: u8 = 3;

/// Interval after the first pass.
pub const FIRST_INTERVAL_DAYS: u32 = 1;

/// Interval after the second pass.
pub const SECOND_INTERVAL_DAYS: u32 = 6;

/// Longest interval an item can be scheduled out (about a century).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Clamp a raw quality score into 0-5.
pub fn clamp_quality(quality: i64) -> u8 {
    quality.clamp(0, MAX_QUALITY) as u8
}

/// Whether a (clamped) quality counts as a pass.
pub fn is_pass(quality: u8) -> bool {
    quality >= PASS_QUALITY
}

/// Outcome of one SM-2 step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sm2Result {
    pub ease: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub next_review_at: DateTime<Utc>,
}

/// Compute the next scheduling state for an item.
///
/// Out-of-range quality is clamped; the function cannot fail.
pub fn update(
    quality: i64,
    ease: f64,
    interval_days: u32,
    repetitions: u32,
    now: DateTime<Utc>,
) -> Sm2Result {
    let q = clamp_quality(quality);
    let miss = (5 - q) as f64;
    let new_ease = (ease + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE);

    let (new_interval, new_repetitions) = if is_pass(q) {
        let interval = match repetitions {
            0 => FIRST_INTERVAL_DAYS,
            1 => SECOND_INTERVAL_DAYS,
            _ => ((interval_days as f64 * new_ease).round() as u32).min(MAX_INTERVAL_DAYS),
        };
        (interval, repetitions.saturating_add(1))
    } else {
        (FIRST_INTERVAL_DAYS, 0)
    };

    Sm2Result {
        ease: new_ease,
        interval_days: new_interval,
        repetitions: new_repetitions,
        next_review_at: now
            .checked_add_signed(Duration::days(new_interval as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
}

/// Apply a review to a stored state, stamping the review time.
pub fn apply(state: &mut ReviewState, quality: i64, now: DateTime<Utc>) -> Sm2Result {
    let result = update(
        quality,
        state.ease,
        state.interval_days,
        state.repetitions,
        now,
    );
    state.ease = result.ease;
    state.interval_days = result.interval_days;
    state.repetitions = result.repetitions;
    state.next_review_at = result.next_review_at;
    state.last_reviewed_at = Some(now);
    result
}

/// Derive a quality score from correctness and optional response latency.
///
/// - incorrect: 1 (remembered when shown the answer)
/// - correct, no latency: 4
/// - under 2s: 5, under 5s: 4, otherwise 3
pub fn quality_from_performance(correct: bool, latency_ms: Option<u64>) -> u8 {
    if !correct {
        return 1;
    }
    match latency_ms {
        None => 4,
        Some(ms) if ms < 2000 => 5,
        Some(ms) if ms < 5000 => 4,
        Some(_) => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::INITIAL_EASE;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_first_two_passes_are_fixed() {
        let first = update(4, INITIAL_EASE, 0, 0, now());
        assert_eq!(first.interval_days, 1);
        assert_eq!(first.repetitions, 1);

        let second = update(3, first.ease, first.interval_days, first.repetitions, now());
        assert_eq!(second.interval_days, 6);
        assert_eq!(second.repetitions, 2);
    }

    #[test]
    fn test_three_perfect_reviews() {
        let r1 = update(5, 2.5, 0, 0, now());
        let r2 = update(5, r1.ease, r1.interval_days, r1.repetitions, now());
        let r3 = update(5, r2.ease, r2.interval_days, r2.repetitions, now());

        assert_eq!(r1.interval_days, 1);
        assert_eq!(r2.interval_days, 6);
        assert_eq!(r3.interval_days, (6.0 * r3.ease).round() as u32);
        assert!(2.5 < r1.ease && r1.ease < r2.ease && r2.ease < r3.ease);
        assert!((r3.ease - 2.8).abs() < 1e-9);
        assert_eq!(r3.interval_days, 17);
    }

    #[test]
    fn test_third_interval_uses_new_ease() {
        // q=3 lowers ease from 2.5 to 2.36; 6 * 2.36 = 14.16
        let r = update(3, 2.5, 6, 2, now());
        assert!((r.ease - 2.36).abs() < 1e-9);
        assert_eq!(r.interval_days, 14);
    }

    #[test]
    fn test_fail_resets_but_keeps_lowered_ease() {
        let r = update(1, 2.5, 20, 5, now());
        assert_eq!(r.interval_days, 1);
        assert_eq!(r.repetitions, 0);
        assert!((r.ease - 1.96).abs() < 1e-9);
    }

    #[test]
    fn test_ease_floor() {
        let r = update(0, 1.3, 0, 0, now());
        assert_eq!(r.ease, MIN_EASE);
    }

    #[test]
    fn test_quality_clamped() {
        assert_eq!(update(42, 2.5, 0, 0, now()), update(5, 2.5, 0, 0, now()));
        assert_eq!(update(-7, 2.5, 3, 2, now()), update(0, 2.5, 3, 2, now()));
    }

    #[test]
    fn test_next_review_at() {
        let r = update(5, 2.5, 6, 2, now());
        assert_eq!(r.next_review_at, now() + Duration::days(r.interval_days as i64));
    }

    #[test]
    fn test_interval_capped() {
        let r = update(5, 2.5, MAX_INTERVAL_DAYS, 30, now());
        assert_eq!(r.interval_days, MAX_INTERVAL_DAYS);
        assert_eq!(r.repetitions, 31);

        // Stored intervals from older data are pulled back under the cap
        let r = update(4, 2.5, u32::MAX, 40, now());
        assert_eq!(r.interval_days, MAX_INTERVAL_DAYS);
    }

    #[test]
    fn test_next_review_saturates_near_end_of_calendar() {
        let late = DateTime::<Utc>::MAX_UTC - Duration::days(10);
        let r = update(5, 2.5, 6, 2, late);
        assert_eq!(r.next_review_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_apply_updates_state() {
        let mut state = ReviewState::new("ana", 1, now());
        let result = apply(&mut state, 5, now());
        assert_eq!(state.interval_days, 1);
        assert_eq!(state.repetitions, 1);
        assert_eq!(state.ease, result.ease);
        assert_eq!(state.last_reviewed_at, Some(now()));
        assert!(!state.is_due(now()));
    }

    #[test]
    fn test_quality_from_performance() {
        assert_eq!(quality_from_performance(false, Some(100)), 1);
        assert_eq!(quality_from_performance(true, None), 4);
        assert_eq!(quality_from_performance(true, Some(1500)), 5);
        assert_eq!(quality_from_performance(true, Some(2000)), 4);
        assert_eq!(quality_from_performance(true, Some(4999)), 4);
        assert_eq!(quality_from_performance(true, Some(8000)), 3);
    }

    // =========================================================================
    // Property-based tests
    // =========================================================================

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Property: ease never drops below the floor
            #[test]
            fn prop_ease_floor(
                quality in -10i64..15,
                ease in 1.3f64..4.0,
                interval in 0u32..400,
                reps in 0u32..50,
            ) {
                let r = update(quality, ease, interval, reps, now());
                prop_assert!(r.ease >= MIN_EASE);
            }

            // Property: a pass increments repetitions, a fail resets
            #[test]
            fn prop_pass_and_fail_semantics(
                quality in 0i64..=5,
                ease in 1.3f64..4.0,
                interval in 0u32..400,
                reps in 0u32..50,
            ) {
                let r = update(quality, ease, interval, reps, now());
                if quality >= 3 {
                    prop_assert_eq!(r.repetitions, reps + 1);
                } else {
                    prop_assert_eq!(r.repetitions, 0);
                    prop_assert_eq!(r.interval_days, 1);
                }
            }

            // Property: fresh items graduate 1 then 6 regardless of ease
            #[test]
            fn prop_fixed_first_intervals(
                q1 in 3i64..=5,
                q2 in 3i64..=5,
                ease in 1.3f64..4.0,
            ) {
                let r1 = update(q1, ease, 0, 0, now());
                let r2 = update(q2, r1.ease, r1.interval_days, r1.repetitions, now());
                prop_assert_eq!(r1.interval_days, 1);
                prop_assert_eq!(r2.interval_days, 6);
            }

            // Property: long runs of passes stay bounded and never panic
            #[test]
            fn prop_long_pass_runs_bounded(
                qualities in proptest::collection::vec(3i64..=5, 1..120),
            ) {
                let mut state = ReviewState::new("ana", 1, now());
                for q in qualities {
                    let r = apply(&mut state, q, now());
                    prop_assert!(r.interval_days <= MAX_INTERVAL_DAYS);
                    prop_assert!(r.next_review_at > now());
                }
            }

            // Property: higher quality never yields lower ease
            #[test]
            fn prop_ease_monotonic_in_quality(
                q in 0i64..5,
                ease in 1.3f64..4.0,
            ) {
                let low = update(q, ease, 0, 0, now());
                let high = update(q + 1, ease, 0, 0, now());
                prop_assert!(high.ease >= low.ease);
            }
        }
    }
}
