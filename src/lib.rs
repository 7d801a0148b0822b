//! Span - adaptive curriculum engine for second-language practice
//!
//! Span tracks a per-learner skill vector, schedules reviews with SM-2,
//! selects new material in the learner's zone of proximal development, and
//! builds daily plans for a conversational tutor.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;

pub use config::Config;
pub use core::{
    CurriculumEngine, CurriculumItem, CurriculumScheduler, DailyPlan, Exercise, PracticeSession,
    Readiness, SkillName, SkillVector,
};
pub use error::{Result, SpanError};
pub use storage::{CurriculumStore, FileStore, MemoryStore};

// CLI commands
pub use cli::{
    HintCommand, ImportCommand, IntroduceCommand, PlanCommand, PracticeCommand, ProfileCommand,
    SkillsCommand,
};
