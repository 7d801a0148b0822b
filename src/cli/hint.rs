//! Hint command for Span.
//!
//! Looks up an item by term for a conversational hint and renders a prompt
//! card at the learner's mastery.

use serde::Serialize;

use crate::config::Config;
use crate::core::prompt::DEFAULT_ITEM_MASTERY;
use crate::core::{
    item_mastery, prompt_card, select_by_mastery, CurriculumEngine, Hint, PromptCard,
};
use crate::error::Result;
use crate::storage::CurriculumStore;

/// Options for the hint command.
#[derive(Debug, Clone, Default)]
pub struct HintOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Learner whose skills pick the prompt type.
    pub learner_id: Option<String>,
}

/// Output format for the hint command.
#[derive(Debug, Clone, Serialize)]
pub struct HintOutput {
    /// Whether the command ran without error.
    pub success: bool,
    /// Whether a matching item was found.
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<Hint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<PromptCard>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HintOutput {
    /// Create a successful output.
    pub fn success(hint: Hint, card: Option<PromptCard>) -> Self {
        Self {
            success: true,
            found: true,
            hint: Some(hint),
            card,
            error: None,
        }
    }

    /// Create an output for a term with no match.
    pub fn not_found() -> Self {
        Self {
            success: true,
            found: false,
            hint: None,
            card: None,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            found: false,
            hint: None,
            card: None,
            error: Some(error.into()),
        }
    }
}

/// The hint command implementation.
pub struct HintCommand<S: CurriculumStore> {
    engine: CurriculumEngine<S>,
}

impl<S: CurriculumStore> HintCommand<S> {
    /// Create a new hint command.
    pub fn new(store: S, config: Config) -> Self {
        Self {
            engine: CurriculumEngine::new(store, config.advancement),
        }
    }

    /// Run the hint command for a term.
    pub fn run(&self, term: &str, options: &HintOptions) -> HintOutput {
        match self.lookup(term, options) {
            Ok(Some((hint, card))) => HintOutput::success(hint, card),
            Ok(None) => HintOutput::not_found(),
            Err(e) => HintOutput::failure(e.to_string()),
        }
    }

    fn lookup(&self, term: &str, options: &HintOptions) -> Result<Option<(Hint, Option<PromptCard>)>> {
        let Some(hint) = self.engine.hint(term)? else {
            return Ok(None);
        };
        let Some(item) = self.engine.store().item(hint.item_id)? else {
            return Ok(Some((hint, None)));
        };

        let mastery = match &options.learner_id {
            Some(learner_id) => item_mastery(&self.engine.skills(learner_id)?, &item),
            None => DEFAULT_ITEM_MASTERY,
        };
        let card = prompt_card(&item, select_by_mastery(mastery, &item));
        Ok(Some((hint, Some(card))))
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &HintOutput, options: &HintOptions) -> String {
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
    fn format_human_readable(&self, output: &HintOutput) -> String {
        if !output.success {
            return format!(
                "Hint failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }
        let Some(hint) = &output.hint else {
            return "No matching item.\n".to_string();
        };

        let mut out = format!("{} - {} [{}]\n", hint.term, hint.gloss, hint.topic);
        if let Some(example) = &hint.example_sentence {
            out.push_str(&format!("Example: {}\n", example));
        }
        if let Some(note) = &hint.cultural_note {
            out.push_str(&format!("Note: {}\n", note));
        }
        if let Some(card) = &output.card {
            out.push_str(&format!("\n[{}] {}\n", card.prompt_type, card.prompt));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CurriculumItem, PromptType, SkillName, SkillVector};
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn setup() -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::with_items(vec![CurriculumItem::new("la cuenta", "the check", "food")
                .with_example("Me trae la cuenta, por favor.")
                .contributes(SkillName::VocabularyProduction, 4)])
            .unwrap(),
        )
    }

    #[test]
    fn test_hint_found_with_default_card() {
        let cmd = HintCommand::new(setup(), Config::default());
        let output = cmd.run("cuenta", &HintOptions::default());

        assert!(output.found);
        assert_eq!(output.hint.unwrap().gloss, "the check");
        let card = output.card.unwrap();
        assert_eq!(card.prompt_type, PromptType::CuedProduction);
        assert_eq!(card.hint.as_deref(), Some("Starts with: la"));
    }

    #[test]
    fn test_hint_card_follows_learner() {
        let store = setup();
        store
            .put_skill_vector(
                "ana",
                &SkillVector::new().with(SkillName::VocabularyProduction, 1),
            )
            .unwrap();
        let cmd = HintCommand::new(Arc::clone(&store), Config::default());
        let options = HintOptions {
            learner_id: Some("ana".to_string()),
            ..Default::default()
        };

        let output = cmd.run("la cuenta", &options);
        assert_eq!(output.card.unwrap().prompt_type, PromptType::Recognition);
    }

    #[test]
    fn test_hint_not_found() {
        let cmd = HintCommand::new(setup(), Config::default());
        let output = cmd.run("zzz", &HintOptions::default());
        assert!(output.success);
        assert!(!output.found);
        assert_eq!(
            cmd.format_output(&output, &HintOptions::default()),
            "No matching item.\n"
        );
    }

    #[test]
    fn test_format_human_readable() {
        let cmd = HintCommand::new(setup(), Config::default());
        let output = cmd.run("la cuenta", &HintOptions::default());
        let text = cmd.format_output(&output, &HintOptions::default());
        assert!(text.starts_with("la cuenta - the check [food]"));
        assert!(text.contains("Example: Me trae la cuenta, por favor."));
        assert!(text.contains("[cued_production]"));
    }
}
