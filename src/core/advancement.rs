//! Skill advancement state machine.
//!
//! Each skill dimension moves NONE → EXPOSURE → RECOGNITION → PRODUCTION →
//! FLUENT on streaks of passing responses:
//! - 1 → 2: one pass
//! - 2 → 3: two consecutive passes
//! - 3 → 4: two consecutive passes
//! - 4 → 5: three consecutive passes, each under the latency threshold when
//!   latency was measured
//!
//! Streaks are held per session and are not persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::skills::{clamp_level, SkillName, SkillVector, MAX_LEVEL};
use crate::core::sm2::is_pass;

/// Default latency threshold for PRODUCTION → FLUENT.
pub const DEFAULT_FLUENCY_LATENCY_MS: u64 = 3000;

/// Consecutive-pass tracking for one skill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillStreak {
    /// Passing responses in a row.
    pub consecutive: u32,
    /// Whether any timed response in the streak reached the threshold.
    pub slow: bool,
}

impl SkillStreak {
    /// Record one response.
    pub fn record(&mut self, passed: bool, latency_ms: Option<u64>, threshold_ms: u64) {
        if !passed {
            self.reset();
            return;
        }
        self.consecutive += 1;
        if latency_ms.is_some_and(|ms| ms >= threshold_ms) {
            self.slow = true;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Whether a skill at `current_level` should advance given its streak.
pub fn should_advance(current_level: u8, streak: &SkillStreak) -> bool {
    match current_level {
        1 => streak.consecutive >= 1,
        2 | 3 => streak.consecutive >= 2,
        4 => streak.consecutive >= 3 && !streak.slow,
        _ => false,
    }
}

/// A single level change produced by practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advancement {
    pub skill: SkillName,
    pub from: u8,
    pub to: u8,
}

/// Merge externally observed skill levels into an item's declared
/// contributions, keeping the higher target per skill.
///
/// Observations come from a probabilistic judge: unknown skill names are
/// dropped and levels are clamped into 1-5.
pub fn merge_contributions(
    declared: &BTreeMap<SkillName, u8>,
    observed: &BTreeMap<String, i64>,
) -> BTreeMap<SkillName, u8> {
    let mut merged = declared.clone();
    for (name, level) in observed {
        let Ok(skill) = name.parse::<SkillName>() else {
            continue;
        };
        let level = clamp_level(*level);
        let target = merged.entry(skill).or_insert(0);
        *target = (*target).max(level);
    }
    merged
}

/// Per-session streak tracker for one learner.
#[derive(Debug, Clone, Default)]
pub struct SkillStreaks {
    streaks: BTreeMap<SkillName, SkillStreak>,
    fluency_latency_ms: u64,
}

impl SkillStreaks {
    pub fn new(fluency_latency_ms: u64) -> Self {
        Self {
            streaks: BTreeMap::new(),
            fluency_latency_ms,
        }
    }

    /// Current streak for a skill.
    pub fn streak(&self, skill: SkillName) -> SkillStreak {
        self.streaks.get(&skill).copied().unwrap_or_default()
    }

    /// Record a response against every skill the item contributes to and
    /// advance those that qualify.
    ///
    /// A skill never advances past the item's contribution level for it.
    /// Streaks reset right after an advancement.
    pub fn record(
        &mut self,
        skills: &mut SkillVector,
        contributions: &BTreeMap<SkillName, u8>,
        quality: u8,
        latency_ms: Option<u64>,
    ) -> Vec<Advancement> {
        let passed = is_pass(quality);
        let mut advanced = Vec::new();

        for (skill, target) in contributions {
            let streak = self.streaks.entry(*skill).or_default();
            streak.record(passed, latency_ms, self.fluency_latency_ms);

            let current = skills.get(*skill);
            if current >= MAX_LEVEL || current >= *target {
                continue;
            }
            if should_advance(current, streak) {
                let next = current + 1;
                skills.set(*skill, next as i64);
                streak.reset();
                advanced.push(Advancement {
                    skill: *skill,
                    from: current,
                    to: next,
                });
            }
        }

        advanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contrib(pairs: &[(SkillName, u8)]) -> BTreeMap<SkillName, u8> {
        pairs.iter().copied().collect()
    }

    fn streak(consecutive: u32) -> SkillStreak {
        SkillStreak {
            consecutive,
            slow: false,
        }
    }

    #[test]
    fn test_should_advance_thresholds() {
        assert!(!should_advance(1, &streak(0)));
        assert!(should_advance(1, &streak(1)));
        assert!(!should_advance(2, &streak(1)));
        assert!(should_advance(2, &streak(2)));
        assert!(!should_advance(3, &streak(1)));
        assert!(should_advance(3, &streak(2)));
        assert!(!should_advance(4, &streak(2)));
        assert!(should_advance(4, &streak(3)));
        assert!(!should_advance(5, &streak(100)));
    }

    #[test]
    fn test_fluency_requires_fast_responses() {
        let mut s = SkillStreak::default();
        s.record(true, Some(1200), 3000);
        s.record(true, Some(3500), 3000);
        s.record(true, Some(900), 3000);
        assert_eq!(s.consecutive, 3);
        assert!(!should_advance(4, &s));

        // Untimed responses fall back to the count-only rule
        let mut untimed = SkillStreak::default();
        for _ in 0..3 {
            untimed.record(true, None, 3000);
        }
        assert!(should_advance(4, &untimed));
    }

    #[test]
    fn test_fail_resets_streak() {
        let mut s = SkillStreak::default();
        s.record(true, Some(5000), 3000);
        s.record(false, None, 3000);
        assert_eq!(s, SkillStreak::default());
    }

    #[test]
    fn test_record_advances_and_resets() {
        let mut tracker = SkillStreaks::new(DEFAULT_FLUENCY_LATENCY_MS);
        let mut skills = SkillVector::new();
        let c = contrib(&[(SkillName::VocabularyRecognition, 3)]);

        let adv = tracker.record(&mut skills, &c, 5, None);
        assert_eq!(
            adv,
            vec![Advancement {
                skill: SkillName::VocabularyRecognition,
                from: 1,
                to: 2
            }]
        );
        assert_eq!(tracker.streak(SkillName::VocabularyRecognition).consecutive, 0);

        // Level 2 needs two passes
        assert!(tracker.record(&mut skills, &c, 4, None).is_empty());
        let adv = tracker.record(&mut skills, &c, 4, None);
        assert_eq!(adv.len(), 1);
        assert_eq!(skills.get(SkillName::VocabularyRecognition), 3);
    }

    #[test]
    fn test_contribution_caps_advancement() {
        let mut tracker = SkillStreaks::new(DEFAULT_FLUENCY_LATENCY_MS);
        let mut skills = SkillVector::new();
        let c = contrib(&[(SkillName::Pronunciation, 3)]);

        for _ in 0..20 {
            tracker.record(&mut skills, &c, 5, Some(500));
        }
        assert_eq!(skills.get(SkillName::Pronunciation), 3);
    }

    #[test]
    fn test_skills_advance_independently() {
        let mut tracker = SkillStreaks::new(DEFAULT_FLUENCY_LATENCY_MS);
        let mut skills = SkillVector::new().with(SkillName::Narration, 2);
        let c = contrib(&[(SkillName::Narration, 5), (SkillName::Conditionals, 5)]);

        let adv = tracker.record(&mut skills, &c, 5, None);
        assert_eq!(adv.len(), 1);
        assert_eq!(adv[0].skill, SkillName::Conditionals);
        assert_eq!(tracker.streak(SkillName::Narration).consecutive, 1);

        let adv = tracker.record(&mut skills, &c, 5, None);
        assert_eq!(adv.len(), 1);
        assert_eq!(adv[0].skill, SkillName::Narration);
        assert_eq!(skills.get(SkillName::Narration), 3);
    }

    #[test]
    fn test_failing_quality_never_advances() {
        let mut tracker = SkillStreaks::new(DEFAULT_FLUENCY_LATENCY_MS);
        let mut skills = SkillVector::new();
        let c = contrib(&[(SkillName::GrammarProductive, 5)]);
        for q in 0..3 {
            assert!(tracker.record(&mut skills, &c, q, None).is_empty());
        }
        assert_eq!(skills.get(SkillName::GrammarProductive), 1);
    }

    #[test]
    fn test_merge_contributions() {
        let declared = contrib(&[(SkillName::VocabularyProduction, 3)]);
        let observed: BTreeMap<String, i64> = [
            ("vocabulary_production".to_string(), 2),
            ("pronunciation".to_string(), 9),
            ("telepathy".to_string(), 4),
        ]
        .into_iter()
        .collect();

        let merged = merge_contributions(&declared, &observed);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[&SkillName::VocabularyProduction], 3);
        assert_eq!(merged[&SkillName::Pronunciation], 5);
        // Inputs untouched
        assert_eq!(declared.len(), 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Property: practice never lowers a level or exceeds FLUENT
            #[test]
            fn prop_advancement_monotonic(
                start in 1i64..=5,
                target in 1u8..=5,
                responses in prop::collection::vec((0u8..=5, prop::option::of(0u64..6000)), 0..40),
            ) {
                let mut tracker = SkillStreaks::new(DEFAULT_FLUENCY_LATENCY_MS);
                let mut skills = SkillVector::new().with(SkillName::Narration, start);
                let c = contrib(&[(SkillName::Narration, target)]);
                let mut previous = skills.get(SkillName::Narration);

                for (quality, latency) in responses {
                    tracker.record(&mut skills, &c, quality, latency);
                    let level = skills.get(SkillName::Narration);
                    prop_assert!(level >= previous);
                    prop_assert!(level <= 5);
                    prop_assert!(level <= previous.max(target));
                    previous = level;
                }
            }
        }
    }
}
