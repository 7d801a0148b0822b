//! Skills command for Span.
//!
//! Shows a learner's skill vector with level descriptions and a CEFR
//! estimate. Observed levels passed with `--observe` are applied first.

use serde::Serialize;

use crate::cli::practice::parse_observations;
use crate::config::Config;
use crate::core::{
    estimate_cefr, level_description, Advancement, CefrLevel, CurriculumEngine, SkillName,
};
use crate::error::Result;
use crate::storage::CurriculumStore;

/// Options for the skills command.
#[derive(Debug, Clone, Default)]
pub struct SkillsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Observed skill levels, as `skill=level` pairs.
    pub observations: Vec<String>,
}

/// One row of the skill report.
#[derive(Debug, Clone, Serialize)]
pub struct SkillEntry {
    pub skill: SkillName,
    pub level: u8,
    pub label: &'static str,
    pub description: &'static str,
}

/// Output format for the skills command.
#[derive(Debug, Clone, Serialize)]
pub struct SkillsOutput {
    /// Whether the command was successful.
    pub success: bool,
    pub learner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cefr: Option<CefrLevel>,
    pub skills: Vec<SkillEntry>,
    /// Levels raised by `--observe`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub raised: Vec<Advancement>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SkillsOutput {
    /// Create a failed output.
    pub fn failure(learner_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            learner_id: learner_id.to_string(),
            cefr: None,
            skills: Vec::new(),
            raised: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The skills command implementation.
pub struct SkillsCommand<S: CurriculumStore> {
    engine: CurriculumEngine<S>,
}

impl<S: CurriculumStore> SkillsCommand<S> {
    /// Create a new skills command.
    pub fn new(store: S, config: Config) -> Self {
        Self {
            engine: CurriculumEngine::new(store, config.advancement),
        }
    }

    /// Run the skills command for a learner.
    pub fn run(&self, learner_id: &str, options: &SkillsOptions) -> SkillsOutput {
        match self.report(learner_id, options) {
            Ok(output) => output,
            Err(e) => SkillsOutput::failure(learner_id, e.to_string()),
        }
    }

    fn report(&self, learner_id: &str, options: &SkillsOptions) -> Result<SkillsOutput> {
        let observed = parse_observations(&options.observations)?;
        let raised = if observed.is_empty() {
            Vec::new()
        } else {
            self.engine.apply_observed_levels(learner_id, &observed)?
        };

        let vector = self.engine.skills(learner_id)?;
        let skills = vector
            .iter()
            .map(|(skill, _)| {
                let level = vector.level(skill);
                SkillEntry {
                    skill,
                    level: level.value(),
                    label: level.label(),
                    description: level_description(skill, level).description,
                }
            })
            .collect();

        Ok(SkillsOutput {
            success: true,
            learner_id: learner_id.to_string(),
            cefr: Some(estimate_cefr(&vector)),
            skills,
            raised,
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SkillsOutput, options: &SkillsOptions) -> String {
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
    fn format_human_readable(&self, output: &SkillsOutput) -> String {
        if !output.success {
            return format!(
                "Skills command failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut out = format!("Skills for {}", output.learner_id);
        if let Some(cefr) = output.cefr {
            out.push_str(&format!(" (estimated {})", cefr));
        }
        out.push('\n');

        for change in &output.raised {
            out.push_str(&format!(
                "Raised {}: {} -> {}\n",
                change.skill, change.from, change.to
            ));
        }

        for entry in &output.skills {
            out.push_str(&format!(
                "  {:<24} {} {:<11} {}\n",
                entry.skill.as_str(),
                entry.level,
                entry.label,
                entry.description
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SkillVector;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_new_learner_report() {
        let cmd = SkillsCommand::new(MemoryStore::new(), Config::default());
        let output = cmd.run("ana", &SkillsOptions::default());

        assert!(output.success);
        assert_eq!(output.skills.len(), 9);
        assert!(output.skills.iter().all(|e| e.level == 1 && e.label == "NONE"));
        assert_eq!(output.cefr, Some(CefrLevel::A1));
    }

    #[test]
    fn test_observe_raises_levels() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_skill_vector("ana", &SkillVector::new().with(SkillName::Narration, 4))
            .unwrap();
        let cmd = SkillsCommand::new(Arc::clone(&store), Config::default());
        let options = SkillsOptions {
            observations: vec!["narration=2".to_string(), "pronunciation=3".to_string()],
            ..Default::default()
        };

        let output = cmd.run("ana", &options);
        assert_eq!(output.raised.len(), 1);
        assert_eq!(output.raised[0].skill, SkillName::Pronunciation);

        let stored = store.skill_vector("ana").unwrap();
        assert_eq!(stored.get(SkillName::Narration), 4);
        assert_eq!(stored.get(SkillName::Pronunciation), 3);
    }

    #[test]
    fn test_invalid_learner() {
        let cmd = SkillsCommand::new(MemoryStore::new(), Config::default());
        let output = cmd.run("", &SkillsOptions::default());
        assert!(!output.success);
        assert!(cmd
            .format_output(&output, &SkillsOptions::default())
            .starts_with("Skills command failed"));
    }

    #[test]
    fn test_format_json() {
        let cmd = SkillsCommand::new(MemoryStore::new(), Config::default());
        let options = SkillsOptions {
            json: true,
            ..Default::default()
        };
        let output = cmd.run("ana", &options);
        let parsed: serde_json::Value =
            serde_json::from_str(&cmd.format_output(&output, &options)).unwrap();
        assert_eq!(parsed["cefr"], "A1");
        assert_eq!(parsed["skills"][0]["skill"], "vocabulary_recognition");
        assert!(parsed.get("raised").is_none());
    }
}
