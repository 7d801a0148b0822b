//! Curriculum and learner record types.
//!
//! These are the records the engine reads from and writes to the store:
//! immutable curriculum items, per-(learner, item) review state, the
//! learner's topic profile, and finished practice sessions.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::skills::{clamp_level, CefrLevel, SkillName};

/// Curriculum item identifier.
pub type ItemId = u64;

/// Initial ease factor for a fresh review state.
pub const INITIAL_EASE: f64 = 2.5;

/// Kind of content an item teaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Vocabulary,
    Phrase,
    Grammar,
    Texting,
}

/// Prompt styles an item declares support for.
///
/// `Production` covers both cued and free production prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Recognition,
    Production,
    Application,
}

fn default_prompt_kinds() -> Vec<PromptKind> {
    vec![PromptKind::Recognition, PromptKind::Production]
}

/// A single learnable unit: word, phrase or grammar point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumItem {
    /// Store-assigned identifier.
    #[serde(default)]
    pub id: ItemId,
    #[serde(default)]
    pub content_type: ContentType,
    /// Target-language text.
    pub term: String,
    /// Native-language gloss.
    pub gloss: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_sentence: Option<String>,
    /// Usage or cultural note shown as a hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cultural_note: Option<String>,
    pub topic: String,
    #[serde(default)]
    pub prerequisite_items: Vec<ItemId>,
    /// Minimum level per skill needed to attempt this item.
    #[serde(default)]
    pub skill_requirements: BTreeMap<SkillName, u8>,
    /// Level per skill this item develops when mastered.
    #[serde(default)]
    pub skill_contributions: BTreeMap<SkillName, u8>,
    #[serde(default)]
    pub cefr_level: CefrLevel,
    /// Supported prompt styles; empty means recognition and production.
    #[serde(default)]
    pub prompt_types: Vec<PromptKind>,
}

impl CurriculumItem {
    /// Create an entry-level item with no requirements or contributions.
    pub fn new(term: impl Into<String>, gloss: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id: 0,
            content_type: ContentType::default(),
            term: term.into(),
            gloss: gloss.into(),
            example_sentence: None,
            cultural_note: None,
            topic: topic.into(),
            prerequisite_items: Vec::new(),
            skill_requirements: BTreeMap::new(),
            skill_contributions: BTreeMap::new(),
            cefr_level: CefrLevel::default(),
            prompt_types: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: ItemId) -> Self {
        self.id = id;
        self
    }

    pub fn with_example(mut self, sentence: impl Into<String>) -> Self {
        self.example_sentence = Some(sentence.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.cultural_note = Some(note.into());
        self
    }

    /// Add a skill requirement, clamped into 1-5.
    pub fn requires(mut self, skill: SkillName, level: i64) -> Self {
        self.skill_requirements.insert(skill, clamp_level(level));
        self
    }

    /// Add a skill contribution, clamped into 1-5.
    pub fn contributes(mut self, skill: SkillName, level: i64) -> Self {
        self.skill_contributions.insert(skill, clamp_level(level));
        self
    }

    pub fn with_prompt_types(mut self, kinds: Vec<PromptKind>) -> Self {
        self.prompt_types = kinds;
        self
    }

    pub fn with_cefr(mut self, cefr: CefrLevel) -> Self {
        self.cefr_level = cefr;
        self
    }

    /// Supported prompt kinds, with the recognition+production default
    /// applied when none are declared.
    pub fn supported_prompt_kinds(&self) -> Vec<PromptKind> {
        if self.prompt_types.is_empty() {
            default_prompt_kinds()
        } else {
            self.prompt_types.clone()
        }
    }

    /// Whether the item supports a prompt kind.
    pub fn supports(&self, kind: PromptKind) -> bool {
        self.supported_prompt_kinds().contains(&kind)
    }

    /// Clamp requirement and contribution levels into 1-5.
    pub fn normalize(&mut self) {
        for level in self.skill_requirements.values_mut() {
            *level = clamp_level(*level as i64);
        }
        for level in self.skill_contributions.values_mut() {
            *level = clamp_level(*level as i64);
        }
    }
}

/// Spaced-repetition state for one (learner, item) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    pub learner_id: String,
    pub item_id: ItemId,
    /// Ease factor, never below 1.3.
    pub ease: f64,
    /// Current interval in days.
    pub interval_days: u32,
    /// Consecutive passing reviews.
    pub repetitions: u32,
    pub next_review_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl ReviewState {
    /// Fresh state for an item the learner just encountered; due immediately.
    pub fn new(learner_id: impl Into<String>, item_id: ItemId, now: DateTime<Utc>) -> Self {
        Self {
            learner_id: learner_id.into(),
            item_id,
            ease: INITIAL_EASE,
            interval_days: 0,
            repetitions: 0,
            next_review_at: now,
            last_reviewed_at: None,
        }
    }

    /// Whether the item is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }
}

/// Topic-level learner profile used to bias selection.
///
/// Topics are labels or free-form descriptions written by an external
/// extraction process, kept in insertion order without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerProfile {
    pub learner_id: String,
    pub weak_topics: Vec<String>,
    pub strong_topics: Vec<String>,
}

impl LearnerProfile {
    pub fn new(learner_id: impl Into<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
            ..Default::default()
        }
    }

    /// Add a weak topic; returns false if already present.
    pub fn add_weak(&mut self, topic: impl Into<String>) -> bool {
        push_unique(&mut self.weak_topics, topic.into())
    }

    /// Add a strong topic; returns false if already present.
    pub fn add_strong(&mut self, topic: impl Into<String>) -> bool {
        push_unique(&mut self.strong_topics, topic.into())
    }

    pub fn weak_set(&self) -> BTreeSet<&str> {
        self.weak_topics.iter().map(String::as_str).collect()
    }

    pub fn strong_set(&self) -> BTreeSet<&str> {
        self.strong_topics.iter().map(String::as_str).collect()
    }
}

fn push_unique(list: &mut Vec<String>, value: String) -> bool {
    if value.is_empty() || list.contains(&value) {
        return false;
    }
    list.push(value);
    true
}

/// A finished practice session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub learner_id: String,
    /// Topic the session focused on, if any.
    pub topic: Option<String>,
    pub items_covered: Vec<ItemId>,
    /// Mean quality over the session's responses.
    pub performance_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}
