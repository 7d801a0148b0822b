//! Core types and algorithms for Span.
//!
//! This module contains the skill model, spaced repetition, readiness,
//! advancement, prompt progression, content selection, daily plans and
//! practice recording.

pub mod advancement;
pub mod item;
pub mod plan;
pub mod practice;
pub mod prompt;
pub mod readiness;
pub mod selector;
pub mod skills;
pub mod sm2;

pub use advancement::{
    merge_contributions, should_advance, Advancement, SkillStreak, SkillStreaks,
    DEFAULT_FLUENCY_LATENCY_MS,
};
pub use item::{
    ContentType, CurriculumItem, ItemId, LearnerProfile, PromptKind, ReviewState, SessionRecord,
    INITIAL_EASE,
};
pub use plan::{
    generate_exercises, lesson_focus, CurriculumScheduler, DailyPlan, Exercise, FALLBACK_FOCUS,
};
pub use practice::{
    CurriculumEngine, Hint, PracticeRecord, PracticeSession, RecordResult, SessionSummary,
};
pub use prompt::{
    item_mastery, prompt_card, select_by_encounters, select_by_mastery, PromptCard, PromptType,
};
pub use readiness::{compute_readiness, Readiness};
pub use selector::{
    interleaved_topics, pick_topic, select_new_items, select_next_items, topic_universe,
    Selection, SelectionContext, SelectionLimits, TopicInterleaver, FALLBACK_TOPIC,
};
pub use skills::{
    estimate_cefr, level_description, CefrLevel, LevelDescription, SkillLevel, SkillName,
    SkillVector,
};
pub use sm2::{quality_from_performance, Sm2Result};
