//! CLI commands for Span.
//!
//! This module provides CLI commands for Span, organized into:
//! - **Learner commands**: plan, practice, introduce, hint
//! - **State commands**: skills, profile
//! - **Catalog commands**: import

// Learner commands
pub mod hint;
pub mod introduce;
pub mod plan;
pub mod practice;

// State commands
pub mod profile;
pub mod skills;

// Catalog commands
pub mod import;

pub use hint::HintCommand;
pub use import::ImportCommand;
pub use introduce::IntroduceCommand;
pub use plan::PlanCommand;
pub use practice::PracticeCommand;
pub use profile::ProfileCommand;
pub use skills::SkillsCommand;
