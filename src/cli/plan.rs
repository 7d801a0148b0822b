//! Plan command for Span.
//!
//! Builds today's practice plan for a learner.

use std::fmt::Write as _;

use chrono::Utc;
use serde::Serialize;

use crate::config::Config;
use crate::core::{CurriculumScheduler, DailyPlan, Exercise};
use crate::storage::CurriculumStore;

/// Options for the plan command.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the plan command.
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutput {
    /// Whether the plan was built.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<DailyPlan>,
    /// Error message if planning failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlanOutput {
    /// Create a successful output.
    pub fn success(plan: DailyPlan) -> Self {
        Self {
            success: true,
            plan: Some(plan),
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            plan: None,
            error: Some(error.into()),
        }
    }
}

/// The plan command implementation.
pub struct PlanCommand<S: CurriculumStore> {
    scheduler: CurriculumScheduler<S>,
}

impl<S: CurriculumStore> PlanCommand<S> {
    /// Create a new plan command.
    pub fn new(store: S, config: Config) -> Self {
        Self {
            scheduler: CurriculumScheduler::new(store, config.plan),
        }
    }

    /// Run the plan command for a learner.
    pub fn run(&self, learner_id: &str, _options: &PlanOptions) -> PlanOutput {
        match self.scheduler.build_plan(learner_id, Utc::now()) {
            Ok(plan) => PlanOutput::success(plan),
            Err(e) => PlanOutput::failure(e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &PlanOutput, options: &PlanOptions) -> String {
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
    fn format_human_readable(&self, output: &PlanOutput) -> String {
        let Some(plan) = output.plan.as_ref().filter(|_| output.success) else {
            return format!(
                "Plan failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        };

        let mut out = String::new();
        let _ = writeln!(out, "Plan for {}", plan.learner_id);
        let _ = writeln!(out, "Topic: {}", plan.suggested_topic);
        let _ = writeln!(out, "Focus: {}", plan.lesson_focus);

        if plan.is_empty() {
            out.push_str("\nNothing due and nothing new is ready.\n");
            return out;
        }

        if !plan.review_items.is_empty() {
            let _ = writeln!(out, "\nReview ({}):", plan.review_items.len());
            for item in &plan.review_items {
                let _ = writeln!(out, "  {} - {} [{}]", item.term, item.gloss, item.topic);
            }
        }

        if !plan.new_items.is_empty() {
            let _ = writeln!(out, "\nNew ({}):", plan.new_items.len());
            for item in &plan.new_items {
                let _ = writeln!(out, "  {} - {} [{}]", item.term, item.gloss, item.topic);
            }
        }

        if !plan.interleaved_topics.is_empty() {
            let _ = writeln!(out, "\nTopic order: {}", plan.interleaved_topics.join(" > "));
        }

        if !plan.exercises.is_empty() {
            out.push_str("\nExercises:\n");
            for (index, exercise) in plan.exercises.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "  {}. [{}] {}",
                    index + 1,
                    exercise.kind(),
                    first_line(exercise)
                );
            }
        }

        out
    }
}

fn first_line(exercise: &Exercise) -> &str {
    exercise.prompt().lines().next().unwrap_or_default()
}
