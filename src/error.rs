//! Unified error types for Span.
//!
//! The curriculum engine itself never fails on learner input: out-of-range
//! scores are clamped, missing entities come back as `None`, and empty
//! curricula produce empty plans. The only errors that surface here come
//! from the persistence layer and configuration loading.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Span operations.
#[derive(Error, Debug)]
pub enum SpanError {
    /// I/O errors from store or config file operations.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// Learner id that cannot be used as a storage key.
    #[error("invalid learner id: {learner_id:?}")]
    InvalidLearnerId { learner_id: String },

    /// Curriculum import errors (malformed or out-of-range items).
    #[error("import error: {message}")]
    Import { message: String },
}

/// A specialized Result type for Span operations.
pub type Result<T> = std::result::Result<T, SpanError>;

impl SpanError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid learner id error.
    pub fn invalid_learner_id(learner_id: impl Into<String>) -> Self {
        Self::InvalidLearnerId {
            learner_id: learner_id.into(),
        }
    }

    /// Create an import error.
    pub fn import(message: impl Into<String>) -> Self {
        Self::Import {
            message: message.into(),
        }
    }
}

impl From<io::Error> for SpanError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for SpanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Fail-open handling for bookkeeping that must not abort a session.
///
/// The error is logged at `warn` with its context and a substitute value
/// is returned.
pub trait FailOpen<T> {
    /// Log the error and return `T::default()`.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Log the error and return `fallback`.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        self.unwrap_or_else(|err| {
            tracing::warn!(error = %err, context, "fail-open: substituting default");
            T::default()
        })
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        self.unwrap_or_else(|err| {
            tracing::warn!(error = %err, context, "fail-open: substituting fallback");
            fallback
        })
    }
}

/// Exit codes for the `span` CLI.
pub mod exit_codes {
    /// Command completed.
    pub const SUCCESS: i32 = 0;

    /// Command failed (store or config error).
    pub const ERROR: i32 = 1;

    /// A referenced learner item or term does not exist.
    pub const NOT_FOUND: i32 = 4;
}
