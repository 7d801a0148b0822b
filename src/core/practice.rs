//! Practice recording and learner-state updates.
//!
//! [`CurriculumEngine`] wraps the store; each response is applied through
//! a single atomic store update of review state and skill vector. A
//! [`PracticeSession`] tracks the session-scoped advancement streaks for
//! one learner.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AdvancementConfig;
use crate::core::advancement::{merge_contributions, Advancement, SkillStreaks};
use crate::core::item::{CurriculumItem, ItemId, ReviewState, SessionRecord};
use crate::core::skills::{SkillName, SkillVector};
use crate::core::sm2::{self, clamp_quality};
use crate::error::{FailOpen, Result};
use crate::storage::CurriculumStore;

/// Item details for a conversational hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hint {
    pub item_id: ItemId,
    pub term: String,
    pub gloss: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cultural_note: Option<String>,
}

impl From<&CurriculumItem> for Hint {
    fn from(item: &CurriculumItem) -> Self {
        Self {
            item_id: item.id,
            term: item.term.clone(),
            gloss: item.gloss.clone(),
            topic: item.topic.clone(),
            example_sentence: item.example_sentence.clone(),
            cultural_note: item.cultural_note.clone(),
        }
    }
}

/// Result of recording one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeRecord {
    pub item_id: ItemId,
    pub term: String,
    /// Quality after clamping into 0-5.
    pub quality: u8,
    pub ease: f64,
    pub interval_days: u32,
    pub next_review_at: DateTime<Utc>,
    pub advanced: Vec<Advancement>,
}

/// Outcome of [`PracticeSession::record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordResult {
    Recorded(PracticeRecord),
    ItemNotFound { query: String },
}

/// Aggregate of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub learner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub items_covered: Vec<ItemId>,
    pub average_quality: Option<f64>,
    pub advancements: Vec<Advancement>,
    pub skills: BTreeMap<SkillName, u8>,
}

/// Records practice against a store.
#[derive(Debug)]
pub struct CurriculumEngine<S: CurriculumStore> {
    store: S,
    config: AdvancementConfig,
}

impl<S: CurriculumStore> CurriculumEngine<S> {
    pub fn new(store: S, config: AdvancementConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start a practice session with fresh streaks.
    pub fn start_session(&self, learner_id: &str) -> PracticeSession<'_, S> {
        PracticeSession {
            engine: self,
            learner_id: learner_id.to_string(),
            streaks: SkillStreaks::new(self.config.fluency_latency_ms),
            covered: Vec::new(),
            qualities: Vec::new(),
            advancements: Vec::new(),
        }
    }

    /// Resolve an exact term, falling back to a numeric item id.
    pub fn resolve_item(&self, term_or_id: &str) -> Result<Option<CurriculumItem>> {
        if let Some(item) = self.store.item_by_term(term_or_id)? {
            return Ok(Some(item));
        }
        match term_or_id.trim().parse::<ItemId>() {
            Ok(id) => self.store.item(id),
            Err(_) => Ok(None),
        }
    }

    /// Look up an item for a hint.
    ///
    /// Exact term match first, then the first item whose term contains the
    /// query or is contained in it, ignoring case.
    pub fn hint(&self, term: &str) -> Result<Option<Hint>> {
        let items = self.store.all_items()?;
        if let Some(item) = items.iter().find(|item| item.term == term) {
            return Ok(Some(Hint::from(item)));
        }

        let query = term.trim().to_lowercase();
        if query.is_empty() {
            return Ok(None);
        }
        Ok(items
            .iter()
            .find(|item| {
                let candidate = item.term.to_lowercase();
                !candidate.is_empty() && (candidate.contains(&query) || query.contains(&candidate))
            })
            .map(Hint::from))
    }

    /// Write externally observed skill levels.
    ///
    /// Unknown skill names are ignored, levels are clamped, and a dimension
    /// only ever moves up.
    pub fn apply_observed_levels(
        &self,
        learner_id: &str,
        observed: &BTreeMap<String, i64>,
    ) -> Result<Vec<Advancement>> {
        let mut known = Vec::new();
        for (name, level) in observed {
            match name.parse::<SkillName>() {
                Ok(skill) => known.push((skill, *level)),
                Err(_) => tracing::debug!(skill = %name, "ignoring unknown observed skill"),
            }
        }
        if known.is_empty() {
            return Ok(Vec::new());
        }

        let mut raised = Vec::new();
        self.store.update_skills(learner_id, &mut |skills| {
            for &(skill, level) in &known {
                let from = skills.get(skill);
                if let Some(to) = skills.raise_to(skill, level) {
                    raised.push(Advancement { skill, from, to });
                }
            }
        })?;

        for change in &raised {
            tracing::info!(
                learner = learner_id,
                skill = %change.skill,
                from = change.from,
                to = change.to,
                "observed skill level applied"
            );
        }
        Ok(raised)
    }

    /// Create the review state for an item the learner is meeting for the
    /// first time. Returns `None` if the item does not exist.
    pub fn introduce_item(
        &self,
        learner_id: &str,
        item_id: ItemId,
        now: DateTime<Utc>,
    ) -> Result<Option<ReviewState>> {
        if self.store.item(item_id)?.is_none() {
            return Ok(None);
        }
        self.store.review_state(learner_id, item_id, now).map(Some)
    }

    /// Current skill vector for a learner.
    pub fn skills(&self, learner_id: &str) -> Result<SkillVector> {
        self.store.skill_vector(learner_id)
    }
}

/// One learner's practice session.
///
/// Streaks live only as long as the session.
#[derive(Debug)]
pub struct PracticeSession<'a, S: CurriculumStore> {
    engine: &'a CurriculumEngine<S>,
    learner_id: String,
    streaks: SkillStreaks,
    covered: Vec<ItemId>,
    qualities: Vec<u8>,
    advancements: Vec<Advancement>,
}

impl<S: CurriculumStore> PracticeSession<'_, S> {
    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    /// Streak tracker for the session so far.
    pub fn streaks(&self) -> &SkillStreaks {
        &self.streaks
    }

    /// Record a response to an item.
    ///
    /// Quality is clamped into 0-5. Observed skill levels raise the item's
    /// contribution targets for this response only.
    pub fn record(
        &mut self,
        term_or_id: &str,
        quality: i64,
        latency_ms: Option<u64>,
        observations: &BTreeMap<String, i64>,
        now: DateTime<Utc>,
    ) -> Result<RecordResult> {
        let engine = self.engine;
        let Some(item) = engine.resolve_item(term_or_id)? else {
            return Ok(RecordResult::ItemNotFound {
                query: term_or_id.to_string(),
            });
        };
        let quality = clamp_quality(quality);
        let contributions = merge_contributions(&item.skill_contributions, observations);

        // Schedule and skills are written together against the stored vector
        let streaks = &mut self.streaks;
        let mut advanced = Vec::new();
        let (state, _) = engine.store.update_practice(
            &self.learner_id,
            item.id,
            now,
            &mut |state, skills| {
                sm2::apply(state, quality as i64, now);
                advanced = streaks.record(skills, &contributions, quality, latency_ms);
            },
        )?;

        for change in &advanced {
            tracing::info!(
                learner = %self.learner_id,
                skill = %change.skill,
                from = change.from,
                to = change.to,
                "skill advanced"
            );
        }

        self.covered.push(item.id);
        self.qualities.push(quality);
        self.advancements.extend(advanced.iter().copied());

        Ok(RecordResult::Recorded(PracticeRecord {
            item_id: item.id,
            term: item.term,
            quality,
            ease: state.ease,
            interval_days: state.interval_days,
            next_review_at: state.next_review_at,
            advanced,
        }))
    }

    /// End the session and persist its record.
    ///
    /// A failed session write is logged and does not fail the call.
    pub fn finish(self, topic: Option<&str>, now: DateTime<Utc>) -> Result<SessionSummary> {
        let average_quality = if self.qualities.is_empty() {
            None
        } else {
            let total: u32 = self.qualities.iter().map(|q| *q as u32).sum();
            Some(total as f64 / self.qualities.len() as f64)
        };

        let record = SessionRecord {
            learner_id: self.learner_id.clone(),
            topic: topic.map(str::to_string),
            items_covered: self.covered.clone(),
            performance_score: average_quality,
            created_at: now,
        };
        self.engine
            .store
            .record_session(&record)
            .fail_open_default("recording practice session");

        let skills = self.engine.store.skill_vector(&self.learner_id)?.to_map();
        Ok(SessionSummary {
            learner_id: self.learner_id,
            topic: record.topic,
            items_covered: self.covered,
            average_quality,
            advancements: self.advancements,
            skills,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn engine() -> CurriculumEngine<MemoryStore> {
        let store = MemoryStore::with_items(vec![
            CurriculumItem::new("la cuenta", "the check", "food")
                .with_example("Me trae la cuenta, por favor.")
                .with_note("Ask for the check; it is not brought automatically.")
                .contributes(SkillName::VocabularyProduction, 3),
            CurriculumItem::new("hola", "hello", "greetings")
                .contributes(SkillName::Pronunciation, 5),
            CurriculumItem::new("¿Qué onda?", "What's up?", "greetings"),
        ])
        .unwrap();
        CurriculumEngine::new(store, AdvancementConfig::default())
    }

    fn no_obs() -> BTreeMap<String, i64> {
        BTreeMap::new()
    }

    fn recorded(result: RecordResult) -> PracticeRecord {
        match result {
            RecordResult::Recorded(record) => record,
            other => panic!("expected a record, got {:?}", other),
        }
    }

    #[test]
    fn test_record_unknown_item() {
        let engine = engine();
        let mut session = engine.start_session("ana");
        let result = session
            .record("no existe", 5, None, &no_obs(), Utc::now())
            .unwrap();
        assert_eq!(
            result,
            RecordResult::ItemNotFound {
                query: "no existe".to_string()
            }
        );
    }

    #[test]
    fn test_record_schedules_and_clamps() {
        let engine = engine();
        let now = Utc::now();
        let mut session = engine.start_session("ana");

        let first = recorded(session.record("la cuenta", 9, None, &no_obs(), now).unwrap());
        assert_eq!(first.quality, 5);
        assert_eq!(first.interval_days, 1);

        let second = recorded(session.record("1", 5, None, &no_obs(), now).unwrap());
        assert_eq!(second.item_id, 1);
        assert_eq!(second.interval_days, 6);

        let state = engine.store().review_state("ana", 1, now).unwrap();
        assert_eq!(state.repetitions, 2);
        assert_eq!(state.last_reviewed_at, Some(now));
    }

    #[test]
    fn test_record_advances_up_to_contribution() {
        let engine = engine();
        let now = Utc::now();
        let mut session = engine.start_session("ana");

        // 1→2 on first pass
        let r = recorded(session.record("la cuenta", 4, None, &no_obs(), now).unwrap());
        assert_eq!(
            r.advanced,
            vec![Advancement {
                skill: SkillName::VocabularyProduction,
                from: 1,
                to: 2
            }]
        );

        // 2→3 needs two more passes
        let r = recorded(session.record("la cuenta", 4, None, &no_obs(), now).unwrap());
        assert!(r.advanced.is_empty());
        let r = recorded(session.record("la cuenta", 4, None, &no_obs(), now).unwrap());
        assert_eq!(r.advanced.len(), 1);

        // Capped at the contribution level
        for _ in 0..5 {
            let r = recorded(session.record("la cuenta", 5, None, &no_obs(), now).unwrap());
            assert!(r.advanced.is_empty());
        }
        assert_eq!(
            engine
                .skills("ana")
                .unwrap()
                .get(SkillName::VocabularyProduction),
            3
        );
    }

    #[test]
    fn test_failure_resets_streak() {
        let engine = engine();
        let now = Utc::now();
        engine
            .store()
            .put_skill_vector("ana", &SkillVector::new().with(SkillName::Pronunciation, 2))
            .unwrap();

        let mut session = engine.start_session("ana");
        session.record("hola", 4, None, &no_obs(), now).unwrap();
        session.record("hola", 1, None, &no_obs(), now).unwrap();
        let r = recorded(session.record("hola", 4, None, &no_obs(), now).unwrap());
        assert!(r.advanced.is_empty());
        assert_eq!(session.streaks().streak(SkillName::Pronunciation).consecutive, 1);
    }

    #[test]
    fn test_observations_extend_contributions() {
        let engine = engine();
        let mut session = engine.start_session("ana");
        let observed: BTreeMap<String, i64> = [
            ("conversational_flow".to_string(), 9),
            ("telepathy".to_string(), 5),
        ]
        .into_iter()
        .collect();

        let r = recorded(
            session
                .record("¿Qué onda?", 5, None, &observed, Utc::now())
                .unwrap(),
        );
        assert_eq!(r.advanced[0].skill, SkillName::ConversationalFlow);
    }

    #[test]
    fn test_finish_persists_session() {
        let engine = engine();
        let now = Utc::now();
        let mut session = engine.start_session("ana");
        session.record("la cuenta", 5, None, &no_obs(), now).unwrap();
        session.record("hola", 2, None, &no_obs(), now).unwrap();

        let summary = session.finish(Some("food"), now).unwrap();
        assert_eq!(summary.items_covered, vec![1, 2]);
        assert_eq!(summary.average_quality, Some(3.5));
        assert_eq!(summary.advancements.len(), 1);
        assert_eq!(summary.skills[&SkillName::VocabularyProduction], 2);

        assert_eq!(
            engine.store().recent_session_topics("ana", 3).unwrap(),
            vec!["food".to_string()]
        );
    }

    #[test]
    fn test_finish_empty_session() {
        let engine = engine();
        let summary = engine.start_session("ana").finish(None, Utc::now()).unwrap();
        assert!(summary.items_covered.is_empty());
        assert_eq!(summary.average_quality, None);
        assert_eq!(summary.skills.len(), 9);
    }

    #[test]
    fn test_hint_lookup() {
        let engine = engine();
        assert_eq!(engine.hint("hola").unwrap().unwrap().gloss, "hello");
        // Query contained in a term
        assert_eq!(engine.hint("CUENTA").unwrap().unwrap().item_id, 1);
        // Term contained in the query
        assert_eq!(
            engine.hint("hola, ¿cómo estás?").unwrap().unwrap().term,
            "hola"
        );
        assert!(engine.hint("adiós").unwrap().is_none());
        assert!(engine.hint("  ").unwrap().is_none());
    }

    #[test]
    fn test_apply_observed_levels_only_raises() {
        let engine = engine();
        engine
            .store()
            .put_skill_vector("ana", &SkillVector::new().with(SkillName::Narration, 3))
            .unwrap();

        let observed: BTreeMap<String, i64> = [
            ("narration".to_string(), 2),
            ("conditionals".to_string(), 42),
            ("unknown".to_string(), 4),
        ]
        .into_iter()
        .collect();
        let raised = engine.apply_observed_levels("ana", &observed).unwrap();
        assert_eq!(
            raised,
            vec![Advancement {
                skill: SkillName::Conditionals,
                from: 1,
                to: 5
            }]
        );

        let skills = engine.skills("ana").unwrap();
        assert_eq!(skills.get(SkillName::Narration), 3);
        assert_eq!(skills.get(SkillName::Conditionals), 5);
    }

    #[test]
    fn test_introduce_item() {
        let engine = engine();
        let now = Utc::now();
        let state = engine.introduce_item("ana", 2, now).unwrap().unwrap();
        assert_eq!(state.repetitions, 0);
        assert!(state.is_due(now));
        assert!(engine.introduce_item("ana", 99, now).unwrap().is_none());

        let due = engine.store().due_reviews("ana", now, 10).unwrap();
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn test_record_writes_schedule_and_skills_together() {
        let engine = engine();
        let now = Utc::now();
        let mut session = engine.start_session("../bad");
        assert!(session.record("hola", 5, None, &no_obs(), now).is_err());

        let mut session = engine.start_session("ana");
        let r = recorded(session.record("hola", 5, None, &no_obs(), now).unwrap());
        let state = engine.store().review_state("ana", 2, now).unwrap();
        assert_eq!(state.repetitions, 1);
        assert_eq!(state.next_review_at, r.next_review_at);
        assert_eq!(engine.skills("ana").unwrap().get(SkillName::Pronunciation), 2);
    }

    #[test]
    fn test_sessions_in_separate_file_stores_share_advances() {
        let dir = TempDir::new().unwrap();
        let seed = FileStore::with_dir(dir.path()).unwrap();
        seed.add_item(
            CurriculumItem::new("hola", "hello", "greetings").contributes(SkillName::Pronunciation, 2),
        )
        .unwrap();

        let root = Arc::new(dir.path().to_path_buf());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let root = Arc::clone(&root);
                thread::spawn(move || {
                    let store = FileStore::with_dir(root.as_path()).unwrap();
                    let engine = CurriculumEngine::new(store, AdvancementConfig::default());
                    let mut session = engine.start_session("ana");
                    recorded(
                        session
                            .record("hola", 5, None, &BTreeMap::new(), Utc::now())
                            .unwrap(),
                    )
                    .advanced
                    .len()
                })
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 1);
        let state = seed.review_state("ana", 1, Utc::now()).unwrap();
        assert_eq!(state.repetitions, 4);
    }

    #[test]
    fn test_concurrent_sessions_do_not_double_advance() {
        let engine = Arc::new(CurriculumEngine::new(
            Arc::new(
                MemoryStore::with_items(vec![CurriculumItem::new("hola", "hello", "greetings")
                    .contributes(SkillName::Pronunciation, 2)])
                .unwrap(),
            ),
            AdvancementConfig::default(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    let mut session = engine.start_session("ana");
                    recorded(
                        session
                            .record("hola", 5, None, &BTreeMap::new(), Utc::now())
                            .unwrap(),
                    )
                    .advanced
                    .len()
                })
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 1);
        assert_eq!(engine.skills("ana").unwrap().get(SkillName::Pronunciation), 2);
    }
}
