//! Prompt-type progression.
//!
//! Items move from recognition through cued and free production to
//! application as the learner masters them. Two selectors exist: one keyed
//! by how many times the learner has met the item, one keyed by a coarse
//! 1-5 mastery score. Both fall back toward the simplest type the item
//! supports and never fail.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::item::{CurriculumItem, PromptKind};
use crate::core::skills::SkillVector;

/// Mastery assumed for items that declare no skill contributions.
pub const DEFAULT_ITEM_MASTERY: u8 = 3;

/// Elicitation style, in increasing difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    /// Understand the target-language term.
    Recognition,
    /// Produce the term with a hint.
    CuedProduction,
    /// Produce the term without help.
    FreeProduction,
    /// Use the term in a novel context.
    Application,
}

impl PromptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptType::Recognition => "recognition",
            PromptType::CuedProduction => "cued_production",
            PromptType::FreeProduction => "free_production",
            PromptType::Application => "application",
        }
    }

    /// The item-declared kind that enables this prompt type.
    pub fn kind(&self) -> PromptKind {
        match self {
            PromptType::Recognition => PromptKind::Recognition,
            PromptType::CuedProduction | PromptType::FreeProduction => PromptKind::Production,
            PromptType::Application => PromptKind::Application,
        }
    }

    /// Next simpler prompt type.
    fn simpler(&self) -> Option<PromptType> {
        match self {
            PromptType::Recognition => None,
            PromptType::CuedProduction => Some(PromptType::Recognition),
            PromptType::FreeProduction => Some(PromptType::CuedProduction),
            PromptType::Application => Some(PromptType::FreeProduction),
        }
    }

    /// Whether the prompt asks the learner to recognize rather than produce.
    pub fn is_receptive(&self) -> bool {
        matches!(self, PromptType::Recognition | PromptType::CuedProduction)
    }
}

impl fmt::Display for PromptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PromptKind> for PromptType {
    fn from(kind: PromptKind) -> Self {
        match kind {
            PromptKind::Recognition => PromptType::Recognition,
            PromptKind::Production => PromptType::CuedProduction,
            PromptKind::Application => PromptType::Application,
        }
    }
}

/// Degrade `preferred` until the item supports it.
///
/// Recognition is the floor: every item has a term and a gloss.
fn degrade(item: &CurriculumItem, preferred: PromptType) -> PromptType {
    let mut current = preferred;
    loop {
        if item.supports(current.kind()) {
            return current;
        }
        match current.simpler() {
            Some(next) => current = next,
            None => return PromptType::Recognition,
        }
    }
}

/// Select a prompt type from the number of prior encounters with the item.
///
/// - 0: recognition
/// - 1-2: cued production
/// - 3-5: free production
/// - 6+: application when supported, else free production
pub fn select_by_encounters(encounters: u32, item: &CurriculumItem) -> PromptType {
    let preferred = match encounters {
        0 => return PromptType::Recognition,
        1..=2 => PromptType::CuedProduction,
        3..=5 => PromptType::FreeProduction,
        _ => PromptType::Application,
    };
    degrade(item, preferred)
}

/// Select a prompt type from a 1-5 mastery score for the item.
pub fn select_by_mastery(mastery: u8, item: &CurriculumItem) -> PromptType {
    let production = item.supports(PromptKind::Production);
    match mastery {
        0..=2 => {
            if item.supports(PromptKind::Recognition) {
                PromptType::Recognition
            } else {
                item.supported_prompt_kinds()
                    .first()
                    .copied()
                    .map(PromptType::from)
                    .unwrap_or(PromptType::Recognition)
            }
        }
        3 if production => PromptType::CuedProduction,
        4 if production => PromptType::FreeProduction,
        3 | 4 => PromptType::Recognition,
        _ if item.supports(PromptKind::Application) => PromptType::Application,
        _ => PromptType::FreeProduction,
    }
}

/// Coarse mastery of an item: the learner's level in the skill the item
/// develops most (highest contribution target).
pub fn item_mastery(skills: &SkillVector, item: &CurriculumItem) -> u8 {
    let mut primary = None;
    for (skill, target) in &item.skill_contributions {
        match primary {
            Some((_, best)) if *target <= best => {}
            _ => primary = Some((*skill, *target)),
        }
    }
    primary
        .map(|(skill, _)| skills.get(skill))
        .unwrap_or(DEFAULT_ITEM_MASTERY)
}

/// A rendered prompt for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptCard {
    pub item_id: u64,
    pub prompt_type: PromptType,
    pub prompt: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

const APPLICATION_SCENARIOS: &[(&str, &[&str])] = &[
    (
        "greetings",
        &[
            "You bump into a friend on the street. How do you greet them casually?",
            "Your phone rings. How do you answer it?",
        ],
    ),
    (
        "food",
        &[
            "You're at a restaurant and want to pay. How do you ask for the check?",
            "You want the waiter to suggest something good. What do you ask?",
        ],
    ),
    (
        "money",
        &["You're at a market and want to know the price of avocados. How do you ask?"],
    ),
    (
        "storytelling",
        &[
            "Your friend asks what you did yesterday. Start telling them the story.",
            "You're wrapping up an exciting story. How do you end it?",
        ],
    ),
    (
        "conditionals",
        &[
            "Someone asks what you would do if you won the lottery. How do you respond?",
            "Your friend is unsure about taking a job. Give them advice starting with 'if I were you'.",
        ],
    ),
];

fn scenario_for(item: &CurriculumItem) -> Option<&'static str> {
    let (_, scenarios) = APPLICATION_SCENARIOS
        .iter()
        .find(|(topic, _)| *topic == item.topic)?;
    let index = (item.id % scenarios.len() as u64) as usize;
    scenarios.get(index).copied()
}

fn first_word(term: &str) -> &str {
    term.split_whitespace().next().unwrap_or("")
}

/// Render the prompt, expected answer and hint for an item.
pub fn prompt_card(item: &CurriculumItem, prompt_type: PromptType) -> PromptCard {
    let (prompt, answer, hint) = match prompt_type {
        PromptType::Recognition => {
            let hint = match &item.cultural_note {
                Some(note) => format!("Topic: {}. {}", item.topic, note),
                None => format!("Topic: {}", item.topic),
            };
            (
                format!("What does '{}' mean?", item.term),
                item.gloss.clone(),
                Some(hint),
            )
        }
        PromptType::CuedProduction => {
            let cue = first_word(&item.term);
            (
                format!("How would you say '{}' in Spanish? (hint: {})", item.gloss, cue),
                item.term.clone(),
                Some(format!("Starts with: {}", cue)),
            )
        }
        PromptType::FreeProduction => (
            format!("How would you say '{}' in Spanish?", item.gloss),
            item.term.clone(),
            None,
        ),
        PromptType::Application => {
            let prompt = match scenario_for(item) {
                Some(scenario) => scenario.to_string(),
                None => format!(
                    "Can you use '{}' in a sentence about {}?",
                    item.term, item.topic
                ),
            };
            (prompt, format!("Use: {} ({})", item.term, item.gloss), None)
        }
    };

    PromptCard {
        item_id: item.id,
        prompt_type,
        prompt,
        answer,
        hint,
    }
}
