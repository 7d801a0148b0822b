//! Configuration loading for Span.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.span/config.toml`)
//! 3. User config (`~/.span/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The engine runs with the plan limits of
//! the daily scheduler when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::advancement::DEFAULT_FLUENCY_LATENCY_MS;
use crate::error::{FailOpen, Result, SpanError};

/// Main configuration struct for Span.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Daily plan limits.
    pub plan: PlanConfig,
    /// Skill advancement tuning.
    pub advancement: AdvancementConfig,
    /// Storage location.
    pub storage: StorageConfig,
}

/// Daily plan limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanConfig {
    /// Maximum due reviews in a plan.
    pub review_limit: usize,
    /// New-item quota.
    pub new_limit: usize,
    /// Never-reviewed items considered for the quota.
    pub candidate_pool: usize,
    /// Length of the interleaved topic sequence.
    pub interleave_length: usize,
    /// Recent sessions consulted for topics to de-prioritize.
    pub recent_sessions: usize,
}

impl PlanConfig {
    /// Check if a candidate pool size is valid (must be at least 1).
    pub fn is_valid_candidate_pool(value: usize) -> bool {
        value >= 1
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            review_limit: 10,
            new_limit: 3,
            candidate_pool: 50,
            interleave_length: 3,
            recent_sessions: 3,
        }
    }
}

/// Skill advancement tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdvancementConfig {
    /// Latency every response must beat for PRODUCTION → FLUENT.
    pub fluency_latency_ms: u64,
}

impl AdvancementConfig {
    /// Check if a latency threshold is valid (must be at least 1 ms).
    pub fn is_valid_fluency_latency(value: u64) -> bool {
        value >= 1
    }
}

impl Default for AdvancementConfig {
    fn default() -> Self {
        Self {
            fluency_latency_ms: DEFAULT_FLUENCY_LATENCY_MS,
        }
    }
}

/// Storage location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory; defaults to `<span_home>/data`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Parse an environment variable, warning and returning `None` when it is
/// set but malformed.
fn env_parse<T>(name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Invalid {} value '{}': {}. Ignoring.", name, raw, e);
            None
        }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.span/config.toml` in `cwd`)
    /// 3. User config (`~/.span/config.toml`)
    /// 4. Defaults
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let file_layers = [
            Self::load_user_config(),
            Self::load_project_config(cwd),
        ];
        let mut config = file_layers
            .into_iter()
            .flatten()
            .fold(Config::default(), Config::merge);
        config.apply_env_overrides();
        config
    }

    /// Load user config from `~/.span/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = span_home()?;
        Self::load_optional(&home.join("config.toml"))
    }

    /// Load project config from `.span/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_optional(&project_span_dir(cwd).join("config.toml"))
    }

    /// Load a config file that may be absent; parse errors are logged.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        Self::load_from_file(path)
            .map(Some)
            .fail_open_with(&format!("loading {}", path.display()), None)
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| SpanError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| SpanError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(n) = env_parse::<usize>("SPAN_REVIEW_LIMIT") {
            self.plan.review_limit = n;
        }

        if let Some(n) = env_parse::<usize>("SPAN_NEW_LIMIT") {
            self.plan.new_limit = n;
        }

        if let Some(n) = env_parse::<usize>("SPAN_CANDIDATE_POOL") {
            if PlanConfig::is_valid_candidate_pool(n) {
                self.plan.candidate_pool = n;
            } else {
                tracing::warn!(
                    "Invalid SPAN_CANDIDATE_POOL value '{}'. Must be >= 1. Using '{}'.",
                    n,
                    self.plan.candidate_pool
                );
            }
        }

        if let Some(n) = env_parse::<usize>("SPAN_INTERLEAVE_LENGTH") {
            self.plan.interleave_length = n;
        }

        if let Some(n) = env_parse::<u64>("SPAN_FLUENCY_LATENCY_MS") {
            if AdvancementConfig::is_valid_fluency_latency(n) {
                self.advancement.fluency_latency_ms = n;
            } else {
                tracing::warn!(
                    "Invalid SPAN_FLUENCY_LATENCY_MS value '{}'. Must be >= 1. Using '{}'.",
                    n,
                    self.advancement.fluency_latency_ms
                );
            }
        }

        if let Ok(dir) = env::var("SPAN_DATA_DIR") {
            if dir.is_empty() {
                tracing::warn!("SPAN_DATA_DIR is empty, ignoring");
            } else {
                self.storage.data_dir = Some(PathBuf::from(dir));
            }
        }
    }

    /// Merge another config into this one, field by field.
    ///
    /// Each non-default value in `other` wins. A layer that explicitly sets
    /// a field to its default cannot reset a non-default value from a lower
    /// layer. Invalid values are dropped with a warning.
    fn merge(mut self, other: Config) -> Self {
        let default_plan = PlanConfig::default();
        if other.plan.review_limit != default_plan.review_limit {
            self.plan.review_limit = other.plan.review_limit;
        }
        if other.plan.new_limit != default_plan.new_limit {
            self.plan.new_limit = other.plan.new_limit;
        }
        if other.plan.candidate_pool != default_plan.candidate_pool {
            if PlanConfig::is_valid_candidate_pool(other.plan.candidate_pool) {
                self.plan.candidate_pool = other.plan.candidate_pool;
            } else {
                tracing::warn!("Ignoring plan.candidate_pool = 0 (must be >= 1)");
            }
        }
        if other.plan.interleave_length != default_plan.interleave_length {
            self.plan.interleave_length = other.plan.interleave_length;
        }
        if other.plan.recent_sessions != default_plan.recent_sessions {
            self.plan.recent_sessions = other.plan.recent_sessions;
        }

        let default_advancement = AdvancementConfig::default();
        if other.advancement.fluency_latency_ms != default_advancement.fluency_latency_ms {
            if AdvancementConfig::is_valid_fluency_latency(other.advancement.fluency_latency_ms) {
                self.advancement.fluency_latency_ms = other.advancement.fluency_latency_ms;
            } else {
                tracing::warn!("Ignoring advancement.fluency_latency_ms = 0 (must be >= 1)");
            }
        }

        if other.storage.data_dir.is_some() {
            self.storage.data_dir = other.storage.data_dir;
        }

        self
    }

    /// Resolved data directory: configured, else `<span_home>/data`.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.storage.data_dir.clone().or_else(default_data_dir)
    }
}

/// Get the Span home directory.
///
/// Checks `SPAN_HOME` first, then falls back to `~/.span`. An empty
/// `SPAN_HOME` is ignored.
pub fn span_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("SPAN_HOME") {
        if home.is_empty() {
            tracing::warn!("SPAN_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("SPAN_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".span"));
    }

    let fallback_path = env::temp_dir().join("span");
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

/// Default data directory: `<span_home>/data`.
pub fn default_data_dir() -> Option<PathBuf> {
    span_home().map(|h| h.join("data"))
}

/// Project config directory: `<cwd>/.span`.
pub fn project_span_dir(cwd: &Path) -> PathBuf {
    cwd.join(".span")
}
