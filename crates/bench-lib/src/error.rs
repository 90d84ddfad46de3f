//! Error types for resource sampling and reporting.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bench-lib operations.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum BenchError {
    // Configuration errors, reported before any sampling starts
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Sampler has already completed its run")]
    AlreadyRun,

    // Counter errors never abort a run; they travel inside `Reading::Unavailable`
    #[error("Counter {counter} unavailable: {reason}")]
    CounterUnavailable { counter: &'static str, reason: String },

    // Artifact I/O
    #[error("Failed to write {path:?}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse run report {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to render HTML report: {0}")]
    Render(#[from] minijinja::Error),

    #[error("Failed to encode metrics exposition: {0}")]
    Exposition(#[from] prometheus::Error),
}

impl BenchError {
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    pub fn counter_unavailable(counter: &'static str, reason: impl Into<String>) -> Self {
        Self::CounterUnavailable {
            counter,
            reason: reason.into(),
        }
    }
}
