//! Curriculum storage for Span.
//!
//! This module provides persistence for the item catalog and per-learner
//! state, supporting file-based and in-memory backends.

pub mod file;
pub mod learner;
pub mod memory;
pub mod traits;

pub use file::FileStore;
pub use learner::LearnerRecord;
pub use memory::MemoryStore;
pub use traits::{validate_learner_id, CurriculumStore};
