//! Skill model for Span learners.
//!
//! A learner's competence is a vector of nine categorical dimensions, each
//! scored 1-5. Discrete levels with clear descriptions are easier for
//! external judges to assign than continuous scores.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lowest skill level.
pub const MIN_LEVEL: u8 = 1;

/// Highest skill level.
pub const MAX_LEVEL: u8 = 5;

/// Clamp any integer into the valid skill range.
pub fn clamp_level(level: i64) -> u8 {
    level.clamp(MIN_LEVEL as i64, MAX_LEVEL as i64) as u8
}

/// One dimension of the skill vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillName {
    /// Hear/read and understand vocabulary.
    VocabularyRecognition,
    /// Produce vocabulary from an idea.
    VocabularyProduction,
    /// Phoneme accuracy.
    Pronunciation,
    /// Understand grammatical structures.
    GrammarReceptive,
    /// Use grammatical structures correctly.
    GrammarProductive,
    /// Fillers, repairs, turn-taking.
    ConversationalFlow,
    /// Register: when to use what.
    CulturalPragmatics,
    /// Tell stories and sequence past events.
    Narration,
    /// Express hypotheticals.
    Conditionals,
}

impl SkillName {
    /// All dimensions in canonical order.
    pub const ALL: [SkillName; 9] = [
        SkillName::VocabularyRecognition,
        SkillName::VocabularyProduction,
        SkillName::Pronunciation,
        SkillName::GrammarReceptive,
        SkillName::GrammarProductive,
        SkillName::ConversationalFlow,
        SkillName::CulturalPragmatics,
        SkillName::Narration,
        SkillName::Conditionals,
    ];

    /// Canonical snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillName::VocabularyRecognition => "vocabulary_recognition",
            SkillName::VocabularyProduction => "vocabulary_production",
            SkillName::Pronunciation => "pronunciation",
            SkillName::GrammarReceptive => "grammar_receptive",
            SkillName::GrammarProductive => "grammar_productive",
            SkillName::ConversationalFlow => "conversational_flow",
            SkillName::CulturalPragmatics => "cultural_pragmatics",
            SkillName::Narration => "narration",
            SkillName::Conditionals => "conditionals",
        }
    }
}

impl fmt::Display for SkillName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SkillName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("unknown skill: {}", s))
    }
}

/// Categorical skill level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillLevel {
    /// No exposure; cannot recognize or produce.
    None = 1,
    /// Has seen or heard it; may recognize with strong hints.
    Exposure = 2,
    /// Understands when heard or read; cannot produce reliably.
    Recognition = 3,
    /// Produces with effort.
    Production = 4,
    /// Automatic, fast and accurate.
    Fluent = 5,
}

impl SkillLevel {
    /// Convert a raw level, clamping into range.
    pub fn from_value(value: i64) -> Self {
        match clamp_level(value) {
            1 => SkillLevel::None,
            2 => SkillLevel::Exposure,
            3 => SkillLevel::Recognition,
            4 => SkillLevel::Production,
            _ => SkillLevel::Fluent,
        }
    }

    /// Numeric value in 1-5.
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Upper-case label (NONE..FLUENT).
    pub fn label(&self) -> &'static str {
        match self {
            SkillLevel::None => "NONE",
            SkillLevel::Exposure => "EXPOSURE",
            SkillLevel::Recognition => "RECOGNITION",
            SkillLevel::Production => "PRODUCTION",
            SkillLevel::Fluent => "FLUENT",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Nine-dimension skill vector for one learner.
///
/// Fields are private so every write goes through [`SkillVector::set`],
/// which clamps into 1-5. Deserialization clamps as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSkillVector", into = "RawSkillVector")]
pub struct SkillVector {
    levels: [u8; 9],
}

impl Default for SkillVector {
    fn default() -> Self {
        Self {
            levels: [MIN_LEVEL; 9],
        }
    }
}

impl SkillVector {
    /// Create a vector with every dimension at NONE.
    pub fn new() -> Self {
        Self::default()
    }

    // Declaration order of SkillName matches ALL.
    fn index(skill: SkillName) -> usize {
        skill as usize
    }

    /// Current level of a dimension.
    pub fn get(&self, skill: SkillName) -> u8 {
        self.levels[Self::index(skill)]
    }

    /// Current level of a dimension as a category.
    pub fn level(&self, skill: SkillName) -> SkillLevel {
        SkillLevel::from_value(self.get(skill) as i64)
    }

    /// Set a dimension, clamping into 1-5.
    pub fn set(&mut self, skill: SkillName, level: i64) {
        self.levels[Self::index(skill)] = clamp_level(level);
    }

    /// Builder-style setter.
    pub fn with(mut self, skill: SkillName, level: i64) -> Self {
        self.set(skill, level);
        self
    }

    /// Raise a dimension to `level` only if that exceeds the stored value.
    ///
    /// Returns the new level when it changed.
    pub fn raise_to(&mut self, skill: SkillName, level: i64) -> Option<u8> {
        let level = clamp_level(level);
        if level > self.get(skill) {
            self.set(skill, level as i64);
            Some(level)
        } else {
            None
        }
    }

    /// Name to level mapping, in canonical order.
    pub fn to_map(&self) -> BTreeMap<SkillName, u8> {
        SkillName::ALL
            .iter()
            .map(|skill| (*skill, self.get(*skill)))
            .collect()
    }

    /// Iterate dimensions with their levels.
    pub fn iter(&self) -> impl Iterator<Item = (SkillName, u8)> + '_ {
        SkillName::ALL.iter().map(move |s| (*s, self.get(*s)))
    }
}

/// Flat serialized form of [`SkillVector`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
struct RawSkillVector {
    vocabulary_recognition: i64,
    vocabulary_production: i64,
    pronunciation: i64,
    grammar_receptive: i64,
    grammar_productive: i64,
    conversational_flow: i64,
    cultural_pragmatics: i64,
    narration: i64,
    conditionals: i64,
}

impl Default for RawSkillVector {
    fn default() -> Self {
        SkillVector::default().into()
    }
}

impl From<RawSkillVector> for SkillVector {
    fn from(raw: RawSkillVector) -> Self {
        SkillVector::new()
            .with(SkillName::VocabularyRecognition, raw.vocabulary_recognition)
            .with(SkillName::VocabularyProduction, raw.vocabulary_production)
            .with(SkillName::Pronunciation, raw.pronunciation)
            .with(SkillName::GrammarReceptive, raw.grammar_receptive)
            .with(SkillName::GrammarProductive, raw.grammar_productive)
            .with(SkillName::ConversationalFlow, raw.conversational_flow)
            .with(SkillName::CulturalPragmatics, raw.cultural_pragmatics)
            .with(SkillName::Narration, raw.narration)
            .with(SkillName::Conditionals, raw.conditionals)
    }
}

impl From<SkillVector> for RawSkillVector {
    fn from(v: SkillVector) -> Self {
        Self {
            vocabulary_recognition: v.get(SkillName::VocabularyRecognition) as i64,
            vocabulary_production: v.get(SkillName::VocabularyProduction) as i64,
            pronunciation: v.get(SkillName::Pronunciation) as i64,
            grammar_receptive: v.get(SkillName::GrammarReceptive) as i64,
            grammar_productive: v.get(SkillName::GrammarProductive) as i64,
            conversational_flow: v.get(SkillName::ConversationalFlow) as i64,
            cultural_pragmatics: v.get(SkillName::CulturalPragmatics) as i64,
            narration: v.get(SkillName::Narration) as i64,
            conditionals: v.get(SkillName::Conditionals) as i64,
        }
    }
}

// =============================================================================
// Level descriptions
// =============================================================================

/// Human-facing description of a level for one skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelDescription {
    pub level: SkillLevel,
    pub description: &'static str,
    pub example: &'static str,
}

const GENERIC_DESCRIPTIONS: [(&str, &str); 5] = [
    (
        "No exposure - cannot recognize or produce",
        "Learner has not been exposed to this concept",
    ),
    (
        "Has seen/heard - may recognize with strong hints",
        "Learner heard this once but couldn't recall it",
    ),
    (
        "Can understand when heard/read - cannot produce reliably",
        "Learner understood it but couldn't say it themselves",
    ),
    (
        "Can produce with effort - needs time or makes minor errors",
        "Learner said it correctly but took 5+ seconds to recall",
    ),
    (
        "Automatic - produces quickly and accurately",
        "Learner used this naturally in conversation without prompting",
    ),
];

const NARRATION_DESCRIPTIONS: [(&str, &str); 5] = [
    (
        "Cannot sequence events",
        "Uses only present tense to describe past events",
    ),
    (
        "Basic past tense attempts with errors",
        "Significant conjugation errors when describing yesterday",
    ),
    (
        "Understands stories told to them",
        "Follows along with narration but can't retell it",
    ),
    (
        "Can narrate with effort",
        "Uses past tense and some time markers, may mix tenses",
    ),
    (
        "Fluent storytelling",
        "Natural use of past aspects, time markers, emotional color",
    ),
];

const CONDITIONALS_DESCRIPTIONS: [(&str, &str); 5] = [
    (
        "No hypothetical constructions",
        "Only states facts, cannot express 'what if' scenarios",
    ),
    (
        "Recognizes conditional intent",
        "Understands an 'if' clause but can't produce one",
    ),
    (
        "Real conditionals only",
        "Handles 'if I have time, I go' but not counterfactuals",
    ),
    (
        "Hypothetical present with effort",
        "Builds 'if I were rich, I would...' with hesitation",
    ),
    (
        "Natural hypotheticals",
        "Smoothly uses counterfactuals, polite conditionals and wishes",
    ),
];

/// Describe what `level` means for `skill`.
///
/// Narration and conditionals have specialized descriptions; every other
/// skill uses the generic table.
pub fn level_description(skill: SkillName, level: SkillLevel) -> LevelDescription {
    let table = match skill {
        SkillName::Narration => &NARRATION_DESCRIPTIONS,
        SkillName::Conditionals => &CONDITIONALS_DESCRIPTIONS,
        _ => &GENERIC_DESCRIPTIONS,
    };
    let (description, example) = table[(level.value() - 1) as usize];
    LevelDescription {
        level,
        description,
        example,
    }
}

// =============================================================================
// CEFR
// =============================================================================

/// Common European Framework of Reference level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum CefrLevel {
    #[default]
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    /// All levels, lowest first.
    pub const ALL: [CefrLevel; 6] = [
        CefrLevel::A1,
        CefrLevel::A2,
        CefrLevel::B1,
        CefrLevel::B2,
        CefrLevel::C1,
        CefrLevel::C2,
    ];

    /// Level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }

    /// Typical skill levels of a learner at this CEFR level, in
    /// [`SkillName::ALL`] order.
    pub fn typical_skills(&self) -> [u8; 9] {
        match self {
            CefrLevel::A1 => [3, 2, 2, 2, 1, 1, 1, 1, 1],
            CefrLevel::A2 => [4, 3, 3, 3, 2, 2, 2, 2, 2],
            CefrLevel::B1 => [5, 4, 4, 4, 3, 3, 3, 4, 4],
            CefrLevel::B2 => [5, 5, 5, 5, 4, 4, 4, 5, 5],
            CefrLevel::C1 | CefrLevel::C2 => [5; 9],
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Share of typical dimensions a learner must meet to be placed at a level.
pub const CEFR_MATCH_RATIO: f64 = 0.7;

/// Estimate the learner's CEFR level.
///
/// Returns the highest level whose typical profile the learner meets on at
/// least 70% of dimensions, defaulting to A1.
pub fn estimate_cefr(skills: &SkillVector) -> CefrLevel {
    for cefr in CefrLevel::ALL.iter().rev() {
        let typical = cefr.typical_skills();
        let matches = SkillName::ALL
            .iter()
            .zip(typical.iter())
            .filter(|(skill, required)| skills.get(**skill) >= **required)
            .count();
        if matches as f64 / typical.len() as f64 >= CEFR_MATCH_RATIO {
            return *cefr;
        }
    }
    CefrLevel::A1
}
