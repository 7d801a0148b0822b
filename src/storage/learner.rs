//! Per-learner document shared by the store implementations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::item::{CurriculumItem, ItemId, LearnerProfile, ReviewState, SessionRecord};
use crate::core::skills::SkillVector;

/// Sessions kept per learner; older ones are dropped.
pub const MAX_SESSION_HISTORY: usize = 50;

/// Everything stored for one learner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerRecord {
    pub learner_id: String,
    pub skills: SkillVector,
    pub profile: LearnerProfile,
    pub reviews: BTreeMap<ItemId, ReviewState>,
    /// Finished sessions, oldest first, at most [`MAX_SESSION_HISTORY`].
    pub sessions: Vec<SessionRecord>,
}

impl LearnerRecord {
    pub fn new(learner_id: impl Into<String>) -> Self {
        let learner_id = learner_id.into();
        Self {
            profile: LearnerProfile::new(learner_id.clone()),
            learner_id,
            ..Default::default()
        }
    }

    /// Ids of items due at `now`, soonest-due first.
    pub fn due_item_ids(&self, now: DateTime<Utc>) -> Vec<ItemId> {
        let mut due: Vec<&ReviewState> = self
            .reviews
            .values()
            .filter(|state| state.is_due(now))
            .collect();
        due.sort_by_key(|state| (state.next_review_at, state.item_id));
        due.into_iter().map(|state| state.item_id).collect()
    }

    /// Catalog items never reviewed, ordered by CEFR level then id.
    pub fn unreviewed<'a>(
        &self,
        catalog: impl Iterator<Item = &'a CurriculumItem>,
        limit: usize,
    ) -> Vec<CurriculumItem> {
        let mut items: Vec<&CurriculumItem> = catalog
            .filter(|item| !self.reviews.contains_key(&item.id))
            .collect();
        items.sort_by_key(|item| (item.cefr_level, item.id));
        items.into_iter().take(limit).cloned().collect()
    }

    /// Append a finished session, dropping the oldest past the cap.
    pub fn push_session(&mut self, session: SessionRecord) {
        self.sessions.push(session);
        if self.sessions.len() > MAX_SESSION_HISTORY {
            self.sessions.sort_by_key(|s| s.created_at);
            let excess = self.sessions.len() - MAX_SESSION_HISTORY;
            self.sessions.drain(..excess);
        }
    }

    /// Topics of the newest `limit` sessions, newest first.
    pub fn recent_topics(&self, limit: usize) -> Vec<String> {
        let mut sessions: Vec<&SessionRecord> = self.sessions.iter().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions
            .into_iter()
            .take(limit)
            .filter_map(|session| session.topic.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let record = LearnerRecord::new("ana");
        assert_eq!(record.profile.learner_id, "ana");
        assert_eq!(record.skills, SkillVector::new());
        assert!(record.reviews.is_empty());
    }

    fn session(topic: &str, minutes_ago: i64) -> SessionRecord {
        SessionRecord {
            learner_id: "ana".to_string(),
            topic: Some(topic.to_string()),
            items_covered: vec![1],
            performance_score: Some(4.0),
            created_at: Utc::now() - chrono::Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_session_history_capped() {
        let mut record = LearnerRecord::new("ana");
        for i in 0..(MAX_SESSION_HISTORY + 10) {
            let age = (MAX_SESSION_HISTORY + 10 - i) as i64;
            record.push_session(session(&format!("topic-{}", i), age));
        }

        assert_eq!(record.sessions.len(), MAX_SESSION_HISTORY);
        assert_eq!(record.sessions[0].topic.as_deref(), Some("topic-10"));
        assert_eq!(
            record.recent_topics(2),
            vec![
                format!("topic-{}", MAX_SESSION_HISTORY + 9),
                format!("topic-{}", MAX_SESSION_HISTORY + 8)
            ]
        );
    }

    #[test]
    fn test_cap_drops_oldest_even_out_of_order() {
        let mut record = LearnerRecord::new("ana");
        for i in 0..MAX_SESSION_HISTORY {
            record.push_session(session("recent", i as i64));
        }
        record.push_session(session("ancient", 10_000));

        assert_eq!(record.sessions.len(), MAX_SESSION_HISTORY);
        assert!(record
            .sessions
            .iter()
            .all(|s| s.topic.as_deref() == Some("recent")));
    }

    #[test]
    fn test_record_json_tolerates_missing_sections() {
        let record: LearnerRecord =
            serde_json::from_str(r#"{"learner_id": "ana", "skills": {"narration": 4}}"#).unwrap();
        assert_eq!(record.skills.get(crate::core::skills::SkillName::Narration), 4);
        assert!(record.sessions.is_empty());
    }
}
