//! Curriculum storage traits for Span.
//!
//! This module defines the `CurriculumStore` trait the engine reads
//! learner state from and writes practice results to.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::item::{CurriculumItem, ItemId, LearnerProfile, ReviewState, SessionRecord};
use crate::core::skills::SkillVector;
use crate::error::{Result, SpanError};

/// Longest accepted learner id.
pub const MAX_LEARNER_ID_LEN: usize = 64;

/// Check that a learner id is 1-64 characters of `[A-Za-z0-9_-]`.
pub fn validate_learner_id(learner_id: &str) -> Result<()> {
    let valid = !learner_id.is_empty()
        && learner_id.len() <= MAX_LEARNER_ID_LEN
        && learner_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(SpanError::invalid_learner_id(learner_id))
    }
}

/// Trait for curriculum storage backends.
///
/// Getters named after a record (`skill_vector`, `review_state`,
/// `learner_profile`) create and persist a default record the first time a
/// learner or (learner, item) pair is referenced.
pub trait CurriculumStore: Send + Sync {
    /// All curriculum items, ordered by id.
    fn all_items(&self) -> Result<Vec<CurriculumItem>>;

    /// Retrieve an item by id.
    ///
    /// Returns `Ok(None)` if the item doesn't exist.
    fn item(&self, id: ItemId) -> Result<Option<CurriculumItem>>;

    /// Add an item to the catalog, returning its id.
    ///
    /// An item with id 0 is assigned the next free id; any other id
    /// replaces the stored item with that id.
    fn add_item(&self, item: CurriculumItem) -> Result<ItemId>;

    /// Items due for review at `now`, soonest-due first.
    fn due_reviews(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CurriculumItem>>;

    /// Items the learner has never reviewed, ordered by CEFR level then id.
    fn new_candidates(&self, learner_id: &str, limit: usize) -> Result<Vec<CurriculumItem>>;

    /// Fetch or create the learner's skill vector.
    fn skill_vector(&self, learner_id: &str) -> Result<SkillVector>;

    /// Save the learner's skill vector.
    fn put_skill_vector(&self, learner_id: &str, skills: &SkillVector) -> Result<()>;

    /// Fetch or create review state for a (learner, item) pair.
    ///
    /// A created state is due at `now`.
    fn review_state(
        &self,
        learner_id: &str,
        item_id: ItemId,
        now: DateTime<Utc>,
    ) -> Result<ReviewState>;

    /// Save review state.
    fn put_review_state(&self, state: &ReviewState) -> Result<()>;

    /// Apply one practice response to the learner's review state for
    /// `item_id` and their skill vector, and persist both in one write.
    ///
    /// A missing review state is created due at `now`. Concurrent calls for
    /// the same learner are serialized, so `update` always sees the latest
    /// stored vector. Returns what was written.
    fn update_practice(
        &self,
        learner_id: &str,
        item_id: ItemId,
        now: DateTime<Utc>,
        update: &mut dyn FnMut(&mut ReviewState, &mut SkillVector),
    ) -> Result<(ReviewState, SkillVector)>;

    /// Read-modify-write the learner's skill vector in one step.
    fn update_skills(
        &self,
        learner_id: &str,
        update: &mut dyn FnMut(&mut SkillVector),
    ) -> Result<SkillVector>;

    /// Fetch or create the learner's topic profile.
    fn learner_profile(&self, learner_id: &str) -> Result<LearnerProfile>;

    /// Save the learner's topic profile.
    fn put_learner_profile(&self, profile: &LearnerProfile) -> Result<()>;

    /// Append a finished practice session.
    fn record_session(&self, session: &SessionRecord) -> Result<()>;

    /// Topics of the learner's most recent sessions, newest first.
    ///
    /// Sessions without a topic are skipped; at most `limit` sessions are
    /// consulted.
    fn recent_session_topics(&self, learner_id: &str, limit: usize) -> Result<Vec<String>>;

    /// Look up an item by its exact target-language term.
    fn item_by_term(&self, term: &str) -> Result<Option<CurriculumItem>> {
        Ok(self.all_items()?.into_iter().find(|item| item.term == term))
    }
}

/// Blanket implementation of CurriculumStore for Arc-wrapped stores.
///
/// This allows sharing one store between the scheduler, the practice
/// engine and tests.
impl<T: CurriculumStore + ?Sized> CurriculumStore for Arc<T> {
    fn all_items(&self) -> Result<Vec<CurriculumItem>> {
        (**self).all_items()
    }

    fn item(&self, id: ItemId) -> Result<Option<CurriculumItem>> {
        (**self).item(id)
    }

    fn add_item(&self, item: CurriculumItem) -> Result<ItemId> {
        (**self).add_item(item)
    }

    fn due_reviews(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CurriculumItem>> {
        (**self).due_reviews(learner_id, now, limit)
    }

    fn new_candidates(&self, learner_id: &str, limit: usize) -> Result<Vec<CurriculumItem>> {
        (**self).new_candidates(learner_id, limit)
    }

    fn skill_vector(&self, learner_id: &str) -> Result<SkillVector> {
        (**self).skill_vector(learner_id)
    }

    fn put_skill_vector(&self, learner_id: &str, skills: &SkillVector) -> Result<()> {
        (**self).put_skill_vector(learner_id, skills)
    }

    fn review_state(
        &self,
        learner_id: &str,
        item_id: ItemId,
        now: DateTime<Utc>,
    ) -> Result<ReviewState> {
        (**self).review_state(learner_id, item_id, now)
    }

    fn put_review_state(&self, state: &ReviewState) -> Result<()> {
        (**self).put_review_state(state)
    }

    fn update_practice(
        &self,
        learner_id: &str,
        item_id: ItemId,
        now: DateTime<Utc>,
        update: &mut dyn FnMut(&mut ReviewState, &mut SkillVector),
    ) -> Result<(ReviewState, SkillVector)> {
        (**self).update_practice(learner_id, item_id, now, update)
    }

    fn update_skills(
        &self,
        learner_id: &str,
        update: &mut dyn FnMut(&mut SkillVector),
    ) -> Result<SkillVector> {
        (**self).update_skills(learner_id, update)
    }

    fn learner_profile(&self, learner_id: &str) -> Result<LearnerProfile> {
        (**self).learner_profile(learner_id)
    }

    fn put_learner_profile(&self, profile: &LearnerProfile) -> Result<()> {
        (**self).put_learner_profile(profile)
    }

    fn record_session(&self, session: &SessionRecord) -> Result<()> {
        (**self).record_session(session)
    }

    fn recent_session_topics(&self, learner_id: &str, limit: usize) -> Result<Vec<String>> {
        (**self).recent_session_topics(learner_id, limit)
    }

    fn item_by_term(&self, term: &str) -> Result<Option<CurriculumItem>> {
        (**self).item_by_term(term)
    }
}
