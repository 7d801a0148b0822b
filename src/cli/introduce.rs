//! Introduce command for Span.
//!
//! Starts tracking a new item for a learner: the review state is created
//! due now, and a first-encounter prompt card is shown.

use chrono::Utc;
use serde::Serialize;

use crate::config::Config;
use crate::core::{
    prompt_card, select_by_encounters, CurriculumEngine, ItemId, PromptCard, ReviewState,
};
use crate::error::Result;
use crate::storage::CurriculumStore;

/// Options for the introduce command.
#[derive(Debug, Clone, Default)]
pub struct IntroduceOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the introduce command.
#[derive(Debug, Clone, Serialize)]
pub struct IntroduceOutput {
    /// Whether the command ran without error.
    pub success: bool,
    /// Whether the item exists.
    pub found: bool,
    pub item_id: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<PromptCard>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntroduceOutput {
    /// Create a successful output.
    pub fn success(item_id: ItemId, review: ReviewState, card: PromptCard) -> Self {
        Self {
            success: true,
            found: true,
            item_id,
            review: Some(review),
            card: Some(card),
            error: None,
        }
    }

    /// Create an output for an unknown item.
    pub fn not_found(item_id: ItemId) -> Self {
        Self {
            success: true,
            found: false,
            item_id,
            review: None,
            card: None,
            error: Some(format!("Curriculum item {} does not exist", item_id)),
        }
    }

    /// Create a failed output.
    pub fn failure(item_id: ItemId, error: impl Into<String>) -> Self {
        Self {
            success: false,
            found: false,
            item_id,
            review: None,
            card: None,
            error: Some(error.into()),
        }
    }
}

/// The introduce command implementation.
pub struct IntroduceCommand<S: CurriculumStore> {
    engine: CurriculumEngine<S>,
}

impl<S: CurriculumStore> IntroduceCommand<S> {
    /// Create a new introduce command.
    pub fn new(store: S, config: Config) -> Self {
        Self {
            engine: CurriculumEngine::new(store, config.advancement),
        }
    }

    /// Run the introduce command.
    pub fn run(
        &self,
        learner_id: &str,
        item_id: ItemId,
        _options: &IntroduceOptions,
    ) -> IntroduceOutput {
        match self.introduce(learner_id, item_id) {
            Ok(output) => output,
            Err(e) => IntroduceOutput::failure(item_id, e.to_string()),
        }
    }

    fn introduce(&self, learner_id: &str, item_id: ItemId) -> Result<IntroduceOutput> {
        let Some(item) = self.engine.store().item(item_id)? else {
            return Ok(IntroduceOutput::not_found(item_id));
        };
        let Some(review) = self.engine.introduce_item(learner_id, item_id, Utc::now())? else {
            return Ok(IntroduceOutput::not_found(item_id));
        };

        let encounters = review.repetitions;
        let card = prompt_card(&item, select_by_encounters(encounters, &item));
        Ok(IntroduceOutput::success(item_id, review, card))
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &IntroduceOutput, options: &IntroduceOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &IntroduceOutput) -> String {
        match (&output.review, &output.card) {
            (Some(review), Some(card)) => format!(
                "Introduced item {} (due {}).\n\n[{}] {}\n",
                output.item_id,
                review.next_review_at.format("%Y-%m-%d %H:%M UTC"),
                card.prompt_type,
                card.prompt
            ),
            _ if output.success => format!(
                "{}\n",
                output.error.as_deref().unwrap_or("Item not found")
            ),
            _ => format!(
                "Introduce failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CurriculumItem, PromptType};
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn setup() -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::with_items(vec![CurriculumItem::new("órale", "wow / okay", "expressions")])
                .unwrap(),
        )
    }

    #[test]
    fn test_introduce_creates_due_review() {
        let store = setup();
        let cmd = IntroduceCommand::new(Arc::clone(&store), Config::default());

        let output = cmd.run("ana", 1, &IntroduceOptions::default());
        assert!(output.success && output.found);
        assert_eq!(output.card.unwrap().prompt_type, PromptType::Recognition);

        let due = store.due_reviews("ana", Utc::now(), 10).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].term, "órale");
    }

    #[test]
    fn test_introduce_is_idempotent() {
        let store = setup();
        let cmd = IntroduceCommand::new(Arc::clone(&store), Config::default());
        let first = cmd.run("ana", 1, &IntroduceOptions::default()).review.unwrap();
        let second = cmd.run("ana", 1, &IntroduceOptions::default()).review.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_introduce_unknown_item() {
        let cmd = IntroduceCommand::new(setup(), Config::default());
        let output = cmd.run("ana", 42, &IntroduceOptions::default());
        assert!(output.success);
        assert!(!output.found);
        assert!(cmd
            .format_output(&output, &IntroduceOptions::default())
            .contains("42"));
    }

    #[test]
    fn test_introduce_invalid_learner() {
        let cmd = IntroduceCommand::new(setup(), Config::default());
        let output = cmd.run("../x", 1, &IntroduceOptions::default());
        assert!(!output.success);
    }
}
