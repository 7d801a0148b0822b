//! Profile command for Span.
//!
//! Shows and edits a learner's weak and strong topics, which bias new-item
//! selection and topic interleaving.

use serde::Serialize;

use crate::core::LearnerProfile;
use crate::error::Result;
use crate::storage::CurriculumStore;

/// Options for the profile command.
#[derive(Debug, Clone, Default)]
pub struct ProfileOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Topics to mark weak.
    pub weak: Vec<String>,
    /// Topics to mark strong.
    pub strong: Vec<String>,
}

/// Output format for the profile command.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileOutput {
    /// Whether the command was successful.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<LearnerProfile>,
    /// Number of topics added by this call.
    pub added: usize,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProfileOutput {
    /// Create a successful output.
    pub fn success(profile: LearnerProfile, added: usize) -> Self {
        Self {
            success: true,
            profile: Some(profile),
            added,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            profile: None,
            added: 0,
            error: Some(error.into()),
        }
    }
}

/// The profile command implementation.
pub struct ProfileCommand<S: CurriculumStore> {
    store: S,
}

impl<S: CurriculumStore> ProfileCommand<S> {
    /// Create a new profile command.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run the profile command for a learner.
    pub fn run(&self, learner_id: &str, options: &ProfileOptions) -> ProfileOutput {
        match self.update(learner_id, options) {
            Ok((profile, added)) => ProfileOutput::success(profile, added),
            Err(e) => ProfileOutput::failure(e.to_string()),
        }
    }

    fn update(&self, learner_id: &str, options: &ProfileOptions) -> Result<(LearnerProfile, usize)> {
        let mut profile = self.store.learner_profile(learner_id)?;

        let added = options
            .weak
            .iter()
            .filter(|topic| profile.add_weak(topic.trim()))
            .count()
            + options
                .strong
                .iter()
                .filter(|topic| profile.add_strong(topic.trim()))
                .count();

        if added > 0 {
            self.store.put_learner_profile(&profile)?;
        }
        Ok((profile, added))
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ProfileOutput, options: &ProfileOptions) -> String {
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
    fn format_human_readable(&self, output: &ProfileOutput) -> String {
        let Some(profile) = output.profile.as_ref().filter(|_| output.success) else {
            return format!(
                "Profile command failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        };

        let list = |topics: &[String]| {
            if topics.is_empty() {
                "(none)".to_string()
            } else {
                topics.join(", ")
            }
        };
        format!(
            "Profile for {}\nWeak topics: {}\nStrong topics: {}\n",
            profile.learner_id,
            list(&profile.weak_topics),
            list(&profile.strong_topics)
        )
    }
}
