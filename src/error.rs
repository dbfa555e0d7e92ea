//! Stable error kinds surfaced through [`crate::model::SchedulingTask::error_message`] and
//! through every structured log entry (§7 of SPEC_FULL.md).

use thiserror::Error;

/// Errors raised by the reference store, calendar service, and pipeline stages.
///
/// Every variant corresponds to one of the stable error kinds named in the spec. The
/// `Display` impl (derived by `thiserror`) renders the kind name first so the formatted
/// string can be stored verbatim in `SchedulingTask.error_message`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("INVALID_TOPOLOGY: {0}")]
    InvalidTopology(String),

    #[error("SPLIT_REQUIRED: {0}")]
    SplitRequired(String),

    #[error("NO_CAPACITY: {0}")]
    NoCapacity(String),

    #[error("UNKNOWN_MACHINE: {0}")]
    UnknownMachine(String),

    #[error("UNKNOWN_ARTICLE: {0}")]
    UnknownArticle(String),

    #[error("TASK_ALREADY_RUNNING: {0}")]
    TaskAlreadyRunning(String),

    #[error("CANCELLED")]
    Cancelled,

    #[error("TIMEOUT")]
    Timeout,

    #[error("PERSISTENCE_FAILED: {0}")]
    PersistenceFailed(String),

    #[error("TASK_NOT_FOUND: {0}")]
    TaskNotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// The stable kind string, as used in logs and in `SchedulingTask.error_message`
    /// prefixes. Does not include the human-readable detail.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidTopology(_) => "INVALID_TOPOLOGY",
            PipelineError::SplitRequired(_) => "SPLIT_REQUIRED",
            PipelineError::NoCapacity(_) => "NO_CAPACITY",
            PipelineError::UnknownMachine(_) => "UNKNOWN_MACHINE",
            PipelineError::UnknownArticle(_) => "UNKNOWN_ARTICLE",
            PipelineError::TaskAlreadyRunning(_) => "TASK_ALREADY_RUNNING",
            PipelineError::Cancelled => "CANCELLED",
            PipelineError::Timeout => "TIMEOUT",
            PipelineError::PersistenceFailed(_) => "PERSISTENCE_FAILED",
            PipelineError::TaskNotFound(_) => "TASK_NOT_FOUND",
            PipelineError::Storage(_) => "STORAGE_ERROR",
            PipelineError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Whether this error kind is one the Writer should retry internally (§7).
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Storage(_) | PipelineError::PersistenceFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
