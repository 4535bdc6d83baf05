//! Error types for Retention Flux

use thiserror::Error;

/// Errors that can occur while profiling an event log
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse event log: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unparseable timestamp at row {index}: {value:?}")]
    InvalidTimestamp { index: usize, value: String },

    #[error("Unknown event category at row {index}: {value:?} (expected application or system)")]
    InvalidCategory { index: usize, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Stage '{stage}' failed: {message}")]
    StageFailed { stage: &'static str, message: String },
}

impl ComputeError {
    /// Attach the name of the pipeline stage that produced this error.
    ///
    /// Errors that already name a stage are returned unchanged.
    pub fn in_stage(self, stage: &'static str) -> Self {
        match self {
            ComputeError::StageFailed { .. } => self,
            other => ComputeError::StageFailed {
                stage,
                message: other.to_string(),
            },
        }
    }
}
