//! File-based curriculum storage for Span.
//!
//! Layout under the data directory:
//! - `items.json`: the curriculum catalog as a JSON array
//! - `learners/<id>.json`: one document per learner
//!
//! Atomic writes go through a uniquely named temp file + rename. Every
//! read-modify-write cycle holds an exclusive lock on a sidecar `.lock`
//! file, so separate processes sharing a data directory never lose each
//! other's updates.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::config::default_data_dir;
use crate::core::item::{CurriculumItem, ItemId, LearnerProfile, ReviewState, SessionRecord};
use crate::core::skills::SkillVector;
use crate::error::{Result, SpanError};
use crate::storage::learner::LearnerRecord;
use crate::storage::traits::{validate_learner_id, CurriculumStore};

const ITEMS_FILE: &str = "items.json";
const ITEMS_LOCK_FILE: &str = "items.lock";
const LEARNERS_DIR: &str = "learners";

/// File-based curriculum store.
///
/// Read-modify-write cycles are serialized through advisory file locks,
/// across threads and processes alike.
#[derive(Debug)]
pub struct FileStore {
    /// Root data directory.
    root: PathBuf,
}

impl FileStore {
    /// Create a file store in the default data directory.
    ///
    /// Uses `data/` under `~/.span` or `$SPAN_HOME`.
    pub fn new() -> Result<Self> {
        let dir = default_data_dir().ok_or_else(|| {
            SpanError::config("Could not determine data directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a file store rooted at a custom directory.
    pub fn with_dir(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let learners = root.join(LEARNERS_DIR);

        if !learners.exists() {
            fs::create_dir_all(&learners).map_err(|e| SpanError::storage(&learners, e))?;
        }

        Ok(Self { root })
    }

    /// Root data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn items_path(&self) -> PathBuf {
        self.root.join(ITEMS_FILE)
    }

    fn learner_path(&self, learner_id: &str) -> PathBuf {
        self.root
            .join(LEARNERS_DIR)
            .join(format!("{}.json", learner_id))
    }

    fn learner_lock_path(&self, learner_id: &str) -> PathBuf {
        self.root
            .join(LEARNERS_DIR)
            .join(format!("{}.lock", learner_id))
    }

    fn load_items(&self) -> Result<BTreeMap<ItemId, CurriculumItem>> {
        let path = self.items_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| SpanError::storage(&path, e))?;
        let items: Vec<CurriculumItem> = serde_json::from_str(&content)?;
        Ok(items.into_iter().map(|item| (item.id, item)).collect())
    }

    fn save_items(&self, items: &BTreeMap<ItemId, CurriculumItem>) -> Result<()> {
        let list: Vec<&CurriculumItem> = items.values().collect();
        atomic_write(&self.items_path(), &list)
    }

    fn load_learner(&self, learner_id: &str) -> Result<Option<LearnerRecord>> {
        validate_learner_id(learner_id)?;
        let path = self.learner_path(learner_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| SpanError::storage(&path, e))?;
        let record: LearnerRecord = serde_json::from_str(&content)?;
        Ok(Some(record))
    }

    /// Load (or create) a learner document, apply `f`, and write it back.
    fn update_learner<T>(
        &self,
        learner_id: &str,
        f: impl FnOnce(&mut LearnerRecord) -> T,
    ) -> Result<T> {
        validate_learner_id(learner_id)?;
        let _lock = lock_exclusive(&self.learner_lock_path(learner_id))?;
        let mut record = self
            .load_learner(learner_id)?
            .unwrap_or_else(|| LearnerRecord::new(learner_id));
        let out = f(&mut record);
        atomic_write(&self.learner_path(learner_id), &record)?;
        Ok(out)
    }

    /// Load a learner document, creating and persisting it if missing.
    fn learner_or_create(&self, learner_id: &str) -> Result<LearnerRecord> {
        if let Some(record) = self.load_learner(learner_id)? {
            return Ok(record);
        }
        self.update_learner(learner_id, |record| record.clone())
    }
}

/// Take an exclusive advisory lock on `path`, creating the file if needed.
///
/// The lock is released when the returned handle is dropped.
fn lock_exclusive(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| SpanError::storage(path, e))?;
    file.lock().map_err(|e| SpanError::storage(path, e))?;
    Ok(file)
}

/// Write JSON to `path` atomically using a unique sibling temp file + rename.
fn atomic_write<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let json = serde_json::to_string_pretty(value)?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| SpanError::storage(dir, e))?;
    temp.write_all(json.as_bytes())
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| SpanError::storage(temp.path(), e))?;

    // Rename over the final path (atomic on POSIX)
    temp.persist(path)
        .map_err(|e| SpanError::storage(path, e.error))?;

    Ok(())
}

impl CurriculumStore for FileStore {
    fn all_items(&self) -> Result<Vec<CurriculumItem>> {
        Ok(self.load_items()?.into_values().collect())
    }

    fn item(&self, id: ItemId) -> Result<Option<CurriculumItem>> {
        Ok(self.load_items()?.remove(&id))
    }

    fn add_item(&self, mut item: CurriculumItem) -> Result<ItemId> {
        let _lock = lock_exclusive(&self.root.join(ITEMS_LOCK_FILE))?;
        let mut items = self.load_items()?;
        if item.id == 0 {
            item.id = items.keys().next_back().map_or(1, |last| last + 1);
        }
        item.normalize();
        let id = item.id;
        items.insert(id, item);
        self.save_items(&items)?;
        Ok(id)
    }

    fn due_reviews(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CurriculumItem>> {
        let Some(record) = self.load_learner(learner_id)? else {
            return Ok(Vec::new());
        };
        let mut items = self.load_items()?;
        Ok(record
            .due_item_ids(now)
            .iter()
            .filter_map(|id| items.remove(id))
            .take(limit)
            .collect())
    }

    fn new_candidates(&self, learner_id: &str, limit: usize) -> Result<Vec<CurriculumItem>> {
        let record = self.load_learner(learner_id)?.unwrap_or_default();
        let items = self.load_items()?;
        Ok(record.unreviewed(items.values(), limit))
    }

    fn skill_vector(&self, learner_id: &str) -> Result<SkillVector> {
        Ok(self.learner_or_create(learner_id)?.skills)
    }

    fn put_skill_vector(&self, learner_id: &str, skills: &SkillVector) -> Result<()> {
        self.update_learner(learner_id, |record| record.skills = *skills)
    }

    fn review_state(
        &self,
        learner_id: &str,
        item_id: ItemId,
        now: DateTime<Utc>,
    ) -> Result<ReviewState> {
        if let Some(state) = self
            .load_learner(learner_id)?
            .and_then(|record| record.reviews.get(&item_id).cloned())
        {
            return Ok(state);
        }
        self.update_learner(learner_id, |record| {
            record
                .reviews
                .entry(item_id)
                .or_insert_with(|| ReviewState::new(learner_id, item_id, now))
                .clone()
        })
    }

    fn put_review_state(&self, state: &ReviewState) -> Result<()> {
        self.update_learner(&state.learner_id, |record| {
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
        self.update_learner(learner_id, |record| {
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
        self.update_learner(learner_id, |record| {
            update(&mut record.skills);
            record.skills
        })
    }

    fn learner_profile(&self, learner_id: &str) -> Result<LearnerProfile> {
        Ok(self.learner_or_create(learner_id)?.profile)
    }

    fn put_learner_profile(&self, profile: &LearnerProfile) -> Result<()> {
        self.update_learner(&profile.learner_id, |record| {
            record.profile = profile.clone();
        })
    }

    fn record_session(&self, session: &SessionRecord) -> Result<()> {
        self.update_learner(&session.learner_id, |record| {
            record.push_session(session.clone());
        })
    }

    fn recent_session_topics(&self, learner_id: &str, limit: usize) -> Result<Vec<String>> {
        Ok(self
            .load_learner(learner_id)?
            .map(|record| record.recent_topics(limit))
            .unwrap_or_default())
    }
}
