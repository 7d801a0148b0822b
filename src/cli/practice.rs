//! Practice command for Span.
//!
//! Records one or more responses for a learner inside a single session:
//! updates review schedules, advances skills as streaks build up, and
//! stores one session record at the end.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;

use crate::config::Config;
use crate::core::{
    quality_from_performance, CurriculumEngine, PracticeRecord, RecordResult, SessionSummary,
};
use crate::error::{Result, SpanError};
use crate::storage::CurriculumStore;

/// Options for the practice command.
#[derive(Debug, Clone, Default)]
pub struct PracticeOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Explicit quality 0-5 for the positional term. Derived from
    /// correctness and latency when absent.
    pub quality: Option<i64>,
    /// Whether the positional response was wrong (only used without `quality`).
    pub incorrect: bool,
    /// Latency of the positional response in milliseconds.
    pub latency_ms: Option<u64>,
    /// Further responses as `term:quality[:latency_ms]`, recorded in order
    /// after the positional term.
    pub responses: Vec<String>,
    /// Topic to record for the session.
    pub topic: Option<String>,
    /// Observed skill levels, as `skill=level` pairs.
    pub observations: Vec<String>,
}

/// One response to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub term: String,
    pub quality: i64,
    pub latency_ms: Option<u64>,
}

/// Output format for the practice command.
#[derive(Debug, Clone, Serialize)]
pub struct PracticeOutput {
    /// Whether the command ran without error.
    pub success: bool,
    /// Whether every response matched an item.
    pub found: bool,
    /// Recorded responses, in order.
    pub records: Vec<PracticeRecord>,
    /// Queries that matched no item.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SessionSummary>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PracticeOutput {
    /// Create a successful output.
    pub fn success(
        records: Vec<PracticeRecord>,
        missing: Vec<String>,
        summary: Option<SessionSummary>,
    ) -> Self {
        Self {
            success: true,
            found: missing.is_empty(),
            records,
            missing,
            summary,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            found: false,
            records: Vec::new(),
            missing: Vec::new(),
            summary: None,
            error: Some(error.into()),
        }
    }
}

/// Parse `skill=level` observation pairs.
///
/// Skill names are checked later; only the shape and the number are
/// validated here.
pub fn parse_observations(pairs: &[String]) -> Result<BTreeMap<String, i64>> {
    pairs
        .iter()
        .map(|pair| {
            let (skill, level) = pair.split_once('=').ok_or_else(|| {
                SpanError::config(format!("observation '{}' is not skill=level", pair))
            })?;
            let level = level.trim().parse::<i64>().map_err(|_| {
                SpanError::config(format!("observation '{}' has a non-numeric level", pair))
            })?;
            Ok((skill.trim().to_string(), level))
        })
        .collect()
}

/// Parse a `term:quality[:latency_ms]` response.
///
/// Fields are split from the right, so terms may contain colons.
pub fn parse_response(raw: &str) -> Result<Response> {
    let invalid =
        || SpanError::config(format!("response '{}' is not term:quality[:latency_ms]", raw));

    let (head, last) = raw.rsplit_once(':').ok_or_else(invalid)?;
    let last = last.trim().parse::<i64>().map_err(|_| invalid())?;

    let (term, quality, latency_ms) = match head.rsplit_once(':') {
        Some((term, quality)) => match quality.trim().parse::<i64>() {
            Ok(quality) => {
                let latency = u64::try_from(last).map_err(|_| invalid())?;
                (term, quality, Some(latency))
            }
            Err(_) => (head, last, None),
        },
        None => (head, last, None),
    };

    let term = term.trim();
    if term.is_empty() {
        return Err(invalid());
    }
    Ok(Response {
        term: term.to_string(),
        quality,
        latency_ms,
    })
}

/// The practice command implementation.
pub struct PracticeCommand<S: CurriculumStore> {
    engine: CurriculumEngine<S>,
}

impl<S: CurriculumStore> PracticeCommand<S> {
    /// Create a new practice command.
    pub fn new(store: S, config: Config) -> Self {
        Self {
            engine: CurriculumEngine::new(store, config.advancement),
        }
    }

    /// Run the practice command.
    ///
    /// `term` is the positional response; `options.responses` follow it in
    /// the same session.
    pub fn run(
        &self,
        learner_id: &str,
        term: Option<&str>,
        options: &PracticeOptions,
    ) -> PracticeOutput {
        match self.record(learner_id, term, options) {
            Ok(output) => output,
            Err(e) => PracticeOutput::failure(e.to_string()),
        }
    }

    fn responses(term: Option<&str>, options: &PracticeOptions) -> Result<Vec<Response>> {
        let mut responses = Vec::with_capacity(options.responses.len() + 1);
        if let Some(term) = term {
            let quality = options.quality.unwrap_or_else(|| {
                quality_from_performance(!options.incorrect, options.latency_ms) as i64
            });
            responses.push(Response {
                term: term.to_string(),
                quality,
                latency_ms: options.latency_ms,
            });
        }
        for raw in &options.responses {
            responses.push(parse_response(raw)?);
        }
        if responses.is_empty() {
            return Err(SpanError::config(
                "nothing to record: give a term or at least one --response",
            ));
        }
        Ok(responses)
    }

    fn record(
        &self,
        learner_id: &str,
        term: Option<&str>,
        options: &PracticeOptions,
    ) -> Result<PracticeOutput> {
        let observations = parse_observations(&options.observations)?;
        let responses = Self::responses(term, options)?;
        let now = Utc::now();

        let mut session = self.engine.start_session(learner_id);
        let mut records = Vec::new();
        let mut missing = Vec::new();
        for response in &responses {
            match session.record(
                &response.term,
                response.quality,
                response.latency_ms,
                &observations,
                now,
            )? {
                RecordResult::Recorded(record) => records.push(record),
                RecordResult::ItemNotFound { query } => missing.push(query),
            }
        }

        let summary = if records.is_empty() {
            None
        } else {
            Some(session.finish(options.topic.as_deref(), now)?)
        };
        Ok(PracticeOutput::success(records, missing, summary))
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &PracticeOutput, options: &PracticeOptions) -> String {
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
    fn format_human_readable(&self, output: &PracticeOutput) -> String {
        if !output.success {
            return format!(
                "Practice failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut out = String::new();
        for record in &output.records {
            out.push_str(&format!(
                "Recorded '{}' (quality {}). Next review in {} day(s), {}.\n",
                record.term,
                record.quality,
                record.interval_days,
                record.next_review_at.format("%Y-%m-%d")
            ));
            for change in &record.advanced {
                out.push_str(&format!(
                    "Advanced {}: {} -> {}\n",
                    change.skill, change.from, change.to
                ));
            }
        }
        for query in &output.missing {
            out.push_str(&format!("No curriculum item matches '{}'\n", query));
        }
        if let Some(summary) = output.summary.as_ref().filter(|_| output.records.len() > 1) {
            if let Some(average) = summary.average_quality {
                out.push_str(&format!(
                    "Session: {} response(s), average quality {:.1}\n",
                    output.records.len(),
                    average
                ));
            }
        }
        out
    }
}
