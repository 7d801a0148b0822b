//! Daily plan generation.
//!
//! A plan bundles the session's review and new items with a suggested
//! topic, a one-line lesson focus for a conversational tutor, exercise
//! descriptors for a text front end, and an interleaved topic sequence.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PlanConfig;
use crate::core::item::{CurriculumItem, ItemId};
use crate::core::prompt::{item_mastery, select_by_mastery, PromptType};
use crate::core::selector::{
    interleaved_topics, pick_topic, select_next_items, SelectionContext, SelectionLimits,
};
use crate::core::skills::{SkillName, SkillVector};
use crate::error::{FailOpen, Result};
use crate::storage::CurriculumStore;

/// Focus text used when a plan has no items.
pub const FALLBACK_FOCUS: &str = "Free conversation practice";

const FOCUS_REVIEW_TERMS: usize = 5;
const TRANSLATION_EXERCISES: usize = 3;
const INTRODUCTION_EXERCISES: usize = 2;
/// Review positions (0-based, exclusive end) eligible for fill-in-the-blank.
const FILL_BLANK_RANGE: std::ops::Range<usize> = 3..5;
const BLANK: &str = "______";

/// One exercise descriptor for a text front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Exercise {
    /// Target-language term to native-language gloss.
    TranslateToNative {
        item_id: ItemId,
        prompt: String,
        answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
        prompt_type: PromptType,
    },
    /// Native-language gloss to target-language term.
    TranslateToTarget {
        item_id: ItemId,
        prompt: String,
        answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
        prompt_type: PromptType,
    },
    /// Introduction of a new item.
    NewVocab {
        item_id: ItemId,
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        prompt_type: PromptType,
        skill_contributions: BTreeMap<SkillName, u8>,
    },
    /// Example sentence with the term blanked out.
    FillBlank {
        item_id: ItemId,
        prompt: String,
        answer: String,
        prompt_type: PromptType,
    },
}

impl Exercise {
    pub fn item_id(&self) -> ItemId {
        match self {
            Exercise::TranslateToNative { item_id, .. }
            | Exercise::TranslateToTarget { item_id, .. }
            | Exercise::NewVocab { item_id, .. }
            | Exercise::FillBlank { item_id, .. } => *item_id,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Exercise::TranslateToNative { prompt, .. }
            | Exercise::TranslateToTarget { prompt, .. }
            | Exercise::NewVocab { prompt, .. }
            | Exercise::FillBlank { prompt, .. } => prompt,
        }
    }

    /// Short kind label, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Exercise::TranslateToNative { .. } => "translate_to_native",
            Exercise::TranslateToTarget { .. } => "translate_to_target",
            Exercise::NewVocab { .. } => "new_vocab",
            Exercise::FillBlank { .. } => "fill_blank",
        }
    }
}

/// Today's practice plan. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub learner_id: String,
    pub review_items: Vec<CurriculumItem>,
    pub new_items: Vec<CurriculumItem>,
    pub suggested_topic: String,
    pub lesson_focus: String,
    pub exercises: Vec<Exercise>,
    pub interleaved_topics: Vec<String>,
}

impl DailyPlan {
    /// Whether the plan has nothing to practice.
    pub fn is_empty(&self) -> bool {
        self.review_items.is_empty() && self.new_items.is_empty()
    }
}

/// Summarize the session as `Review: a, b | New: c`.
///
/// Lists up to five review terms and every new term.
pub fn lesson_focus(review_items: &[CurriculumItem], new_items: &[CurriculumItem]) -> String {
    let mut parts = Vec::new();

    if !review_items.is_empty() {
        let terms: Vec<&str> = review_items
            .iter()
            .take(FOCUS_REVIEW_TERMS)
            .map(|item| item.term.as_str())
            .collect();
        parts.push(format!("Review: {}", terms.join(", ")));
    }

    if !new_items.is_empty() {
        let terms: Vec<&str> = new_items.iter().map(|item| item.term.as_str()).collect();
        parts.push(format!("New: {}", terms.join(", ")));
    }

    if parts.is_empty() {
        return FALLBACK_FOCUS.to_string();
    }
    parts.join(" | ")
}

fn translation(item: &CurriculumItem, skills: &SkillVector) -> Exercise {
    let prompt_type = select_by_mastery(item_mastery(skills, item), item);
    if prompt_type.is_receptive() {
        Exercise::TranslateToNative {
            item_id: item.id,
            prompt: format!("What does '{}' mean?", item.term),
            answer: item.gloss.clone(),
            hint: item.cultural_note.clone(),
            prompt_type,
        }
    } else {
        Exercise::TranslateToTarget {
            item_id: item.id,
            prompt: format!("How do you say '{}' in Spanish?", item.gloss),
            answer: item.term.clone(),
            hint: item.cultural_note.clone(),
            prompt_type,
        }
    }
}

fn introduction(item: &CurriculumItem) -> Exercise {
    let mut prompt = format!("New word: {}\n\n{}", item.term, item.gloss);
    if let Some(example) = &item.example_sentence {
        prompt.push_str(&format!("\n\nExample: {}", example));
    }
    Exercise::NewVocab {
        item_id: item.id,
        prompt,
        note: item.cultural_note.clone(),
        prompt_type: PromptType::Recognition,
        skill_contributions: item.skill_contributions.clone(),
    }
}

fn fill_blank(item: &CurriculumItem) -> Option<Exercise> {
    let example = item.example_sentence.as_deref()?;
    if item.term.is_empty() || !example.contains(item.term.as_str()) {
        return None;
    }
    let blanked = example.replace(item.term.as_str(), BLANK);
    Some(Exercise::FillBlank {
        item_id: item.id,
        prompt: format!("Fill in the blank:\n\n{}\n\n(Hint: {})", blanked, item.gloss),
        answer: item.term.clone(),
        prompt_type: PromptType::Application,
    })
}

/// Build exercise descriptors.
///
/// - First 3 reviews: translation, direction from prompt progression
/// - First 2 new items: introduction
/// - Reviews 4 and 5: fill-in-the-blank when the example contains the term
pub fn generate_exercises(
    review_items: &[CurriculumItem],
    new_items: &[CurriculumItem],
    skills: &SkillVector,
) -> Vec<Exercise> {
    let mut exercises: Vec<Exercise> = review_items
        .iter()
        .take(TRANSLATION_EXERCISES)
        .map(|item| translation(item, skills))
        .collect();

    exercises.extend(
        new_items
            .iter()
            .take(INTRODUCTION_EXERCISES)
            .map(introduction),
    );

    exercises.extend(
        review_items
            .iter()
            .skip(FILL_BLANK_RANGE.start)
            .take(FILL_BLANK_RANGE.len())
            .filter_map(fill_blank),
    );

    exercises
}

/// Builds daily plans from a store.
#[derive(Debug, Clone)]
pub struct CurriculumScheduler<S: CurriculumStore> {
    store: S,
    config: PlanConfig,
}

impl<S: CurriculumStore> CurriculumScheduler<S> {
    pub fn new(store: S, config: PlanConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build today's plan for a learner.
    ///
    /// Missing learner state is created with defaults; an empty curriculum
    /// yields an empty plan with fallback topic and focus.
    pub fn build_plan(&self, learner_id: &str, now: DateTime<Utc>) -> Result<DailyPlan> {
        let skills = self.store.skill_vector(learner_id)?;
        let profile = self.store.learner_profile(learner_id)?;
        let recent_topics = self
            .store
            .recent_session_topics(learner_id, self.config.recent_sessions)
            .fail_open_default("loading recent session topics");

        let context = SelectionContext {
            learner_id: learner_id.to_string(),
            skills,
            profile,
            recent_topics,
        };
        let limits = SelectionLimits {
            review_limit: self.config.review_limit,
            new_limit: self.config.new_limit,
            candidate_pool: self.config.candidate_pool,
        };
        let selection = select_next_items(&self.store, &context, limits, now)?;

        let all_items = self.store.all_items()?;
        let interleaved = interleaved_topics(
            &all_items,
            &context.profile,
            &context.recent_topics,
            self.config.interleave_length,
        );

        let suggested_topic = pick_topic(&selection.review_items, &selection.new_items, &interleaved);
        let lesson_focus = lesson_focus(&selection.review_items, &selection.new_items);
        let exercises =
            generate_exercises(&selection.review_items, &selection.new_items, &context.skills);

        tracing::debug!(
            learner = learner_id,
            topic = %suggested_topic,
            exercises = exercises.len(),
            "built daily plan"
        );

        Ok(DailyPlan {
            learner_id: learner_id.to_string(),
            review_items: selection.review_items,
            new_items: selection.new_items,
            suggested_topic,
            lesson_focus,
            exercises,
            interleaved_topics: interleaved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::PromptKind;
    use crate::core::selector::FALLBACK_TOPIC;
    use crate::storage::MemoryStore;

    fn item(id: u64, term: &str, topic: &str) -> CurriculumItem {
        CurriculumItem::new(term, format!("{} (en)", term), topic).with_id(id)
    }

    fn scheduler(items: Vec<CurriculumItem>) -> CurriculumScheduler<MemoryStore> {
        CurriculumScheduler::new(
            MemoryStore::with_items(items).unwrap(),
            PlanConfig::default(),
        )
    }

    #[test]
    fn test_empty_curriculum_plan() {
        let plan = scheduler(Vec::new()).build_plan("ana", Utc::now()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.suggested_topic, FALLBACK_TOPIC);
        assert_eq!(plan.lesson_focus, FALLBACK_FOCUS);
        assert!(plan.exercises.is_empty());
        assert!(plan.interleaved_topics.is_empty());
    }

    #[test]
    fn test_lesson_focus() {
        let reviews: Vec<_> = (1..=7).map(|i| item(i, &format!("r{}", i), "t")).collect();
        let new = vec![item(20, "n1", "t"), item(21, "n2", "t")];
        assert_eq!(
            lesson_focus(&reviews, &new),
            "Review: r1, r2, r3, r4, r5 | New: n1, n2"
        );
        assert_eq!(lesson_focus(&[], &new), "New: n1, n2");
        assert_eq!(lesson_focus(&[], &[]), FALLBACK_FOCUS);
    }

    #[test]
    fn test_translation_direction_follows_mastery() {
        // No contributions: default mastery 3 → cued production → to native
        let plain = item(1, "hola", "greetings");
        let ex = generate_exercises(&[plain], &[], &SkillVector::new());
        assert_eq!(ex[0].kind(), "translate_to_native");

        // Learner at PRODUCTION in the primary skill → free production → to target
        let skilled = item(2, "la cuenta", "food").contributes(SkillName::VocabularyProduction, 4);
        let skills = SkillVector::new().with(SkillName::VocabularyProduction, 4);
        let ex = generate_exercises(&[skilled], &[], &skills);
        match &ex[0] {
            Exercise::TranslateToTarget {
                answer,
                prompt_type,
                ..
            } => {
                assert_eq!(answer, "la cuenta");
                assert_eq!(*prompt_type, PromptType::FreeProduction);
            }
            other => panic!("unexpected exercise: {:?}", other),
        }

        // Recognition-only items always translate to native
        let recog = item(3, "chido", "expressions")
            .contributes(SkillName::VocabularyProduction, 4)
            .with_prompt_types(vec![PromptKind::Recognition]);
        let ex = generate_exercises(&[recog], &[], &skills);
        assert_eq!(ex[0].kind(), "translate_to_native");
    }

    #[test]
    fn test_exercise_counts_and_fill_blank() {
        let reviews = vec![
            item(1, "a", "t"),
            item(2, "b", "t"),
            item(3, "c", "t"),
            item(4, "la cuenta", "food").with_example("Me trae la cuenta, por favor."),
            item(5, "chido", "t").with_example("Qué padre."),
            item(6, "f", "t").with_example("f f f"),
        ];
        let new = vec![
            item(10, "n1", "t").with_example("n1 example"),
            item(11, "n2", "t"),
            item(12, "n3", "t"),
        ];

        let ex = generate_exercises(&reviews, &new, &SkillVector::new());
        let kinds: Vec<_> = ex.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "translate_to_native",
                "translate_to_native",
                "translate_to_native",
                "new_vocab",
                "new_vocab",
                "fill_blank",
            ]
        );
        assert_eq!(ex[5].item_id(), 4);
        assert!(ex[5].prompt().contains("Me trae ______, por favor."));
        assert!(ex[3].prompt().contains("Example: n1 example"));
        assert!(!ex[4].prompt().contains("Example"));
    }

    #[test]
    fn test_fill_blank_replaces_every_occurrence() {
        let i = item(1, "ya", "t").with_example("ya, ya, ya");
        let ex = fill_blank(&i).unwrap();
        assert!(ex.prompt().contains("______, ______, ______"));
    }

    #[test]
    fn test_exercise_serde_tag() {
        let ex = introduction(&item(1, "hola", "greetings"));
        let json = serde_json::to_value(&ex).unwrap();
        assert_eq!(json["type"], "new_vocab");
        assert_eq!(json["prompt_type"], "recognition");
    }

    #[test]
    fn test_build_plan_end_to_end() {
        let s = scheduler(vec![
            item(0, "hola", "greetings"),
            item(0, "la cuenta", "food"),
            item(0, "el camión", "transport"),
            item(0, "ojalá", "conditionals").requires(SkillName::Conditionals, 5),
        ]);
        let now = Utc::now();
        s.store().review_state("ana", 1, now).unwrap();

        let mut profile = s.store().learner_profile("ana").unwrap();
        profile.add_weak("food");
        s.store().put_learner_profile(&profile).unwrap();

        let plan = s.build_plan("ana", now).unwrap();
        assert_eq!(plan.review_items.len(), 1);
        assert!(plan.new_items.len() <= 3);
        assert!(plan.new_items.iter().all(|i| i.term != "ojalá"));
        assert_eq!(plan.new_items[0].topic, "food");
        assert_eq!(plan.interleaved_topics[0], "food");
        assert_eq!(plan.suggested_topic, "food");
        assert!(plan.lesson_focus.starts_with("Review: hola | New: la cuenta"));
    }

    #[test]
    fn test_build_plan_respects_limits() {
        let items: Vec<_> = (0..20).map(|i| item(0, &format!("w{}", i), "t")).collect();
        let store = MemoryStore::with_items(items).unwrap();
        let now = Utc::now();
        for id in 1..=10 {
            store.review_state("ana", id, now).unwrap();
        }
        let config = PlanConfig {
            review_limit: 4,
            new_limit: 2,
            ..Default::default()
        };
        let plan = CurriculumScheduler::new(store, config)
            .build_plan("ana", now)
            .unwrap();
        assert_eq!(plan.review_items.len(), 4);
        assert!(plan.new_items.len() <= 2);
    }
}
