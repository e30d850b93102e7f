//! Error types for the induction engine
//!
//! Every failure a participant can correct carries a stable reason code
//! (see [`InductionError::reason_code`]) next to its human-readable message.

use std::time::Duration;

use thiserror::Error;

use crate::ledger::BatchRejection;

/// Result type alias for induction operations
pub type Result<T> = std::result::Result<T, InductionError>;

/// Main error type for induction operations
#[derive(Error, Debug)]
pub enum InductionError {
    /// Unknown or already-ended session id
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Session reached a successful verdict and only accepts `end`
    #[error("Session already completed: {0}")]
    SessionTerminated(String),

    /// Task/category pair missing from the task table or rule library
    #[error("Task {task_id} not found in {category} tasks")]
    InvalidTaskConfig { task_id: String, category: String },

    /// Task table or service settings failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Batch refused by the query budget ledger
    #[error(transparent)]
    BatchRejected(#[from] BatchRejection),

    /// A single input failed rule validation; the whole batch is discarded
    #[error("Invalid input {input}: {reason}")]
    InvalidInput { input: String, reason: String },

    /// Blank hypothesis text
    #[error("Hypothesis must not be empty.")]
    EmptyHypothesis,

    /// Grading call returned an error
    #[error("Grading failed: {0}")]
    OracleFailure(String),

    /// Grading call did not answer in time
    #[error("Grading timed out after {0:?}")]
    OracleTimeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl InductionError {
    /// Stable, machine-checkable reason code
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "session_not_found",
            Self::SessionTerminated(_) => "session_terminated",
            Self::InvalidTaskConfig { .. } => "invalid_task_config",
            Self::InvalidConfig(_) => "invalid_config",
            Self::BatchRejected(rejection) => rejection.reason_code(),
            Self::InvalidInput { .. } => "invalid_input",
            Self::EmptyHypothesis => "empty_hypothesis",
            Self::OracleFailure(_) => "oracle_failure",
            Self::OracleTimeout(_) => "oracle_timeout",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
        }
    }

    /// Session is gone or no longer accepts work
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound(_) | Self::SessionTerminated(_))
    }

    /// The participant can fix the request and try again
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::BatchRejected(_) | Self::InvalidInput { .. } | Self::EmptyHypothesis
        )
    }

    /// Transient failure; the same request may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OracleFailure(_) | Self::OracleTimeout(_))
    }
}
