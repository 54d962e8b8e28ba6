//! Error taxonomy shared by the lifecycle engine, the query pipeline, the
//! store and the board.

use thiserror::Error;

/// Every failure the core can report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// An unrecognised filter, sort, status or priority key.
    #[error("invalid {kind} '{value}'")]
    InvalidParameter { kind: &'static str, value: String },

    /// Sub-task counts that cannot describe a real task.
    #[error("sub-task counts are inconsistent: {completed} completed of {total}")]
    InvariantViolation { completed: usize, total: usize },

    #[error("storage error: {0}")]
    PersistenceFailure(String),

    #[error("{0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("config error: {0}")]
    Config(String),
}

impl TaskError {
    pub(crate) fn invalid(kind: &'static str, value: impl Into<String>) -> Self {
        TaskError::InvalidParameter {
            kind,
            value: value.into(),
        }
    }

    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        TaskError::PersistenceFailure(format!("{context}: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
