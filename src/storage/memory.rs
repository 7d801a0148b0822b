//! In-memory curriculum storage.
//!
//! This module provides a thread-safe in-memory implementation of the
//! CurriculumStore trait, used by tests and by callers that embed the
//! engine with their own persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::core::item::{CurriculumItem, ItemId, LearnerProfile, ReviewState, SessionRecord};
use crate::core::skills::SkillVector;
use crate::error::Result;
use crate::storage::learner::LearnerRecord;
use crate::storage::traits::{validate_learner_id, CurriculumStore};

/// In-memory curriculum store.
///
/// Thread-safe implementation using `RwLock` maps.
/// Everything is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<BTreeMap<ItemId, CurriculumItem>>,
    learners: RwLock<HashMap<String, LearnerRecord>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with items.
    pub fn with_items(items: impl IntoIterator<Item = CurriculumItem>) -> Result<Self> {
        let store = Self::new();
        for item in items {
            store.add_item(item)?;
        }
        Ok(store)
    }

    fn with_learner<T>(&self, learner_id: &str, f: impl FnOnce(&mut LearnerRecord) -> T) -> Result<T> {
        validate_learner_id(learner_id)?;
        let mut learners = self.learners.write().unwrap();
        let record = learners
            .entry(learner_id.to_string())
            .or_insert_with(|| LearnerRecord::new(learner_id));
        Ok(f(record))
    }

    fn read_learner<T>(
        &self,
        learner_id: &str,
        f: impl FnOnce(Option<&LearnerRecord>) -> T,
    ) -> Result<T> {
        validate_learner_id(learner_id)?;
        let learners = self.learners.read().unwrap();
        Ok(f(learners.get(learner_id)))
    }
}

impl CurriculumStore for MemoryStore {
    fn all_items(&self) -> Result<Vec<CurriculumItem>> {
        Ok(self.items.read().unwrap().values().cloned().collect())
    }

    fn item(&self, id: ItemId) -> Result<Option<CurriculumItem>> {
        Ok(self.items.read().unwrap().get(&id).cloned())
    }

    fn add_item(&self, mut item: CurriculumItem) -> Result<ItemId> {
        let mut items = self.items.write().unwrap();
        if item.id == 0 {
            item.id = items.keys().next_back().map_or(1, |last| last + 1);
        }
        item.normalize();
        let id = item.id;
        items.insert(id, item);
        Ok(id)
    }

    fn due_reviews(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CurriculumItem>> {
        let ids = self.read_learner(learner_id, |record| {
            record.map(|r| r.due_item_ids(now)).unwrap_or_default()
        })?;
        let items = self.items.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| items.get(id).cloned())
            .take(limit)
            .collect())
    }

    fn new_candidates(&self, learner_id: &str, limit: usize) -> Result<Vec<CurriculumItem>> {
        let items = self.items.read().unwrap();
        self.read_learner(learner_id, |record| match record {
            Some(r) => r.unreviewed(items.values(), limit),
            None => LearnerRecord::default().unreviewed(items.values(), limit),
        })
    }

    fn skill_vector(&self, learner_id: &str) -> Result<SkillVector> {
        self.with_learner(learner_id, |record| record.skills)
    }

    fn put_skill_vector(&self, learner_id: &str, skills: &SkillVector) -> Result<()> {
        self.with_learner(learner_id, |record| record.skills = *skills)
    }

    fn review_state(
        &self,
        learner_id: &str,
        item_id: ItemId,
        now: DateTime<Utc>,
    ) -> Result<ReviewState> {
        self.with_learner(learner_id, |record| {
            record
                .reviews
                .entry(item_id)
                .or_insert_with(|| ReviewState::new(learner_id, item_id, now))
                .clone()
        })
    }

    fn put_review_state(&self, state: &ReviewState) -> Result<()> {
        self.with_learner(&state.learner_id, |record| {
            record.reviews.insert(state.item_id, state.clone());
        })
    }

    fn update_practice(
        &self,
        learner_id: &str,
        item_id: ItemId,
        now: DateTime<Utc>,
        update: &mut dyn FnMut(&mut ReviewState, &mut SkillVector),
    ) -> Result<(ReviewState, SkillVector)> {
        self.with_learner(learner_id, |record| {
            let state = record
                .reviews
                .entry(item_id)
                .or_insert_with(|| ReviewState::new(learner_id, item_id, now));
            update(state, &mut record.skills);
            (state.clone(), record.skills)
        })
    }

    fn update_skills(
        &self,
        learner_id: &str,
        update: &mut dyn FnMut(&mut SkillVector),
    ) -> Result<SkillVector> {
        self.with_learner(learner_id, |record| {
            update(&mut record.skills);
            record.skills
        })
    }

    fn learner_profile(&self, learner_id: &str) -> Result<LearnerProfile> {
        self.with_learner(learner_id, |record| record.profile.clone())
    }

    fn put_learner_profile(&self, profile: &LearnerProfile) -> Result<()> {
        self.with_learner(&profile.learner_id, |record| {
            record.profile = profile.clone();
        })
    }

    fn record_session(&self, session: &SessionRecord) -> Result<()> {
        self.with_learner(&session.learner_id, |record| {
            record.push_session(session.clone());
        })
    }

    fn recent_session_topics(&self, learner_id: &str, limit: usize) -> Result<Vec<String>> {
        self.read_learner(learner_id, |record| {
            record.map(|r| r.recent_topics(limit)).unwrap_or_default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::skills::SkillName;
    use crate::storage::traits::tests::test_curriculum_store;

    #[test]
    fn test_memory_store_conformance() {
        let store = MemoryStore::new();
        test_curriculum_store(&store);
    }

    #[test]
    fn test_with_items() {
        let store = MemoryStore::with_items(vec![
            CurriculumItem::new("hola", "hello", "greetings"),
            CurriculumItem::new("adiós", "goodbye", "greetings"),
        ])
        .unwrap();
        assert_eq!(store.all_items().unwrap().len(), 2);
    }

    #[test]
    fn test_add_item_normalizes_levels() {
        let store = MemoryStore::new();
        let mut item = CurriculumItem::new("ojalá", "hopefully", "conditionals");
        item.skill_requirements.insert(SkillName::Conditionals, 0);
        let id = store.add_item(item).unwrap();
        let stored = store.item(id).unwrap().unwrap();
        assert_eq!(stored.skill_requirements[&SkillName::Conditionals], 1);
    }

    #[test]
    fn test_reads_do_not_create_learners() {
        let store = MemoryStore::new();
        store.new_candidates("ana", 5).unwrap();
        store.recent_session_topics("ana", 3).unwrap();
        store.due_reviews("ana", Utc::now(), 5).unwrap();
        assert!(store.learners.read().unwrap().is_empty());

        store.skill_vector("ana").unwrap();
        assert!(store.learners.read().unwrap().contains_key("ana"));
    }

    #[test]
    fn test_invalid_learner_id_rejected() {
        let store = MemoryStore::new();
        let err = store.skill_vector("no/slashes").unwrap_err();
        assert!(matches!(err, crate::error::SpanError::InvalidLearnerId { .. }));
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemoryStore::new());
        let mut handles = vec![];

        for i in 0..10 {
            let store_clone = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let learner = format!("learner-{}", i);
                let skills = SkillVector::new().with(SkillName::Pronunciation, 2);
                store_clone.put_skill_vector(&learner, &skills).unwrap();
                store_clone.skill_vector(&learner).unwrap();
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.learners.read().unwrap().len(), 10);
    }

    #[test]
    fn test_concurrent_practice_updates_keep_every_review() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..25u64 {
                        store
                            .update_practice("ana", t * 100 + i + 1, Utc::now(), &mut |state, _| {
                                state.repetitions = 1;
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let learners = store.learners.read().unwrap();
        assert_eq!(learners["ana"].reviews.len(), 100);
    }
}
