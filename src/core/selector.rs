//! Adaptive content selection and topic interleaving.
//!
//! New items are filtered to the learner's zone of proximal development,
//! spread away from topics already under review, and split across weak,
//! varied and strong topics so weak areas dominate without crowding out
//! variety. Topic sequences alternate weak, neutral and strong topics
//! instead of blocking one topic at a time.

use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Utc};

use crate::core::item::{CurriculumItem, LearnerProfile};
use crate::core::readiness::{compute_readiness, Readiness};
use crate::core::skills::SkillVector;
use crate::error::Result;
use crate::storage::CurriculumStore;

/// Topic used when a plan has no items at all.
pub const FALLBACK_TOPIC: &str = "general conversation";

/// Share of the new-item quota reserved for weak topics, in tenths.
const WEAK_SHARE_TENTHS: usize = 6;

/// Share of the new-item quota reserved for varied topics, in tenths.
const VARIED_SHARE_TENTHS: usize = 3;

/// Learner snapshot the selector works from.
#[derive(Debug, Clone, Default)]
pub struct SelectionContext {
    pub learner_id: String,
    pub skills: SkillVector,
    pub profile: LearnerProfile,
    /// Topics of the learner's most recent sessions, newest first.
    pub recent_topics: Vec<String>,
}

/// Bounds on one selection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLimits {
    pub review_limit: usize,
    pub new_limit: usize,
    pub candidate_pool: usize,
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            review_limit: 10,
            new_limit: 3,
            candidate_pool: 50,
        }
    }
}

/// Review and new items chosen for a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub review_items: Vec<CurriculumItem>,
    pub new_items: Vec<CurriculumItem>,
}

/// Fetch due reviews and candidates from the store and select a session's
/// items.
pub fn select_next_items<S: CurriculumStore>(
    store: &S,
    context: &SelectionContext,
    limits: SelectionLimits,
    now: DateTime<Utc>,
) -> Result<Selection> {
    let review_items = store.due_reviews(&context.learner_id, now, limits.review_limit)?;
    let candidates = store.new_candidates(&context.learner_id, limits.candidate_pool)?;

    let new_items = select_new_items(context, &review_items, candidates, limits.new_limit);
    tracing::debug!(
        learner = %context.learner_id,
        reviews = review_items.len(),
        new = new_items.len(),
        "selected session items"
    );

    Ok(Selection {
        review_items,
        new_items,
    })
}

/// Choose up to `new_limit` new items from a candidate pool.
///
/// 1. Keep READY and STRETCH candidates, READY first
/// 2. With reviews present, candidates off the review topics come first
/// 3. Split into weak / varied / strong by the learner profile
/// 4. Fill 60% weak (at least one), 30% varied (at least one), then strong,
///    and truncate to the quota
///
/// Buckets that come up short are not backfilled from the others.
pub fn select_new_items(
    context: &SelectionContext,
    review_items: &[CurriculumItem],
    candidates: Vec<CurriculumItem>,
    new_limit: usize,
) -> Vec<CurriculumItem> {
    let mut zpd: Vec<(CurriculumItem, Readiness)> = candidates
        .into_iter()
        .filter_map(|item| {
            let readiness = compute_readiness(&context.skills, &item.skill_requirements);
            readiness.is_selectable().then_some((item, readiness))
        })
        .collect();

    let review_topics: BTreeSet<&str> = review_items.iter().map(|i| i.topic.as_str()).collect();
    let has_reviews = !review_items.is_empty();

    // Stable: pool order survives within each key
    zpd.sort_by_key(|(item, readiness)| {
        let overlaps = has_reviews && review_topics.contains(item.topic.as_str());
        (overlaps, *readiness == Readiness::Stretch)
    });

    let weak_topics = context.profile.weak_set();
    let strong_topics = context.profile.strong_set();

    let mut weak = Vec::new();
    let mut varied = Vec::new();
    let mut strong = Vec::new();
    for (item, _) in zpd {
        if weak_topics.contains(item.topic.as_str()) {
            weak.push(item);
        } else if strong_topics.contains(item.topic.as_str()) {
            strong.push(item);
        } else {
            varied.push(item);
        }
    }

    let weak_count = (new_limit * WEAK_SHARE_TENTHS / 10).max(1);
    let varied_count = (new_limit * VARIED_SHARE_TENTHS / 10).max(1);

    let mut selected: Vec<CurriculumItem> = weak.into_iter().take(weak_count).collect();
    selected.extend(varied.into_iter().take(varied_count));
    let strong_count = new_limit.saturating_sub(selected.len());
    selected.extend(strong.into_iter().take(strong_count));

    selected.truncate(new_limit);
    selected
}

// =============================================================================
// Interleaving
// =============================================================================

/// Topic bucket a slot prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Weak,
    Neutral,
    Strong,
}

/// Slot preferences, cycled.
const SLOT_PATTERN: [Bucket; 5] = [
    Bucket::Weak,
    Bucket::Neutral,
    Bucket::Weak,
    Bucket::Strong,
    Bucket::Neutral,
];

impl Bucket {
    /// Buckets tried, in order, when a slot of this kind is filled.
    fn fallback_chain(self) -> &'static [Bucket] {
        match self {
            Bucket::Weak => &[Bucket::Weak, Bucket::Neutral],
            Bucket::Strong => &[Bucket::Strong, Bucket::Neutral],
            Bucket::Neutral => &[Bucket::Neutral, Bucket::Weak, Bucket::Strong],
        }
    }
}

/// Yields topics following the weak, neutral, weak, strong, neutral slot
/// pattern over three queues.
///
/// Each topic is yielded at most once. Iteration ends when every queue is
/// empty.
#[derive(Debug, Clone)]
pub struct TopicInterleaver {
    weak: VecDeque<String>,
    neutral: VecDeque<String>,
    strong: VecDeque<String>,
    slot: usize,
}

impl TopicInterleaver {
    /// Build the queues.
    ///
    /// `topics` is the curriculum's topic universe in first-appearance
    /// order. Weak and strong queues come from the profile, weak winning
    /// for topics listed as both. Neutral topics practiced in recent
    /// sessions move to the back of the neutral queue.
    pub fn new(topics: &[String], profile: &LearnerProfile, recent_topics: &[String]) -> Self {
        let mut seen = BTreeSet::new();
        let weak: VecDeque<String> = profile
            .weak_topics
            .iter()
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect();
        let strong: VecDeque<String> = profile
            .strong_topics
            .iter()
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect();

        let (fresh, recent): (Vec<&String>, Vec<&String>) = topics
            .iter()
            .filter(|t| seen.insert(t.as_str()))
            .partition(|t| !recent_topics.contains(*t));
        let neutral = fresh.into_iter().chain(recent).cloned().collect();

        Self {
            weak,
            neutral,
            strong,
            slot: 0,
        }
    }

    fn queue(&mut self, bucket: Bucket) -> &mut VecDeque<String> {
        match bucket {
            Bucket::Weak => &mut self.weak,
            Bucket::Neutral => &mut self.neutral,
            Bucket::Strong => &mut self.strong,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.weak.is_empty() && self.neutral.is_empty() && self.strong.is_empty()
    }
}

impl Iterator for TopicInterleaver {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        // Every pattern cycle has a neutral slot whose chain covers all
        // three queues, so a non-empty interleaver yields within 5 steps.
        while !self.is_exhausted() {
            let bucket = SLOT_PATTERN[self.slot % SLOT_PATTERN.len()];
            self.slot += 1;
            for candidate in bucket.fallback_chain() {
                if let Some(topic) = self.queue(*candidate).pop_front() {
                    return Some(topic);
                }
            }
        }
        None
    }
}

/// Distinct topics of `items` in first-appearance order.
pub fn topic_universe(items: &[CurriculumItem]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.topic.as_str()))
        .map(|item| item.topic.clone())
        .collect()
}

/// Interleaved topic sequence of at most `length` topics.
pub fn interleaved_topics(
    all_items: &[CurriculumItem],
    profile: &LearnerProfile,
    recent_topics: &[String],
    length: usize,
) -> Vec<String> {
    let universe = topic_universe(all_items);
    TopicInterleaver::new(&universe, profile, recent_topics)
        .take(length)
        .collect()
}

/// Pick the session's single topic.
///
/// Prefers the first interleaved topic present among the items, then the
/// most frequent item topic (earliest on ties), then [`FALLBACK_TOPIC`].
pub fn pick_topic(
    review_items: &[CurriculumItem],
    new_items: &[CurriculumItem],
    interleaved: &[String],
) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for item in review_items.iter().chain(new_items) {
        match counts.iter_mut().find(|(topic, _)| *topic == item.topic) {
            Some((_, count)) => *count += 1,
            None => counts.push((item.topic.as_str(), 1)),
        }
    }

    if counts.is_empty() {
        return FALLBACK_TOPIC.to_string();
    }

    if let Some(topic) = interleaved
        .iter()
        .find(|t| counts.iter().any(|(topic, _)| topic == t))
    {
        return topic.clone();
    }

    let mut best = counts[0];
    for entry in &counts[1..] {
        if entry.1 > best.1 {
            best = *entry;
        }
    }
    best.0.to_string()
}
