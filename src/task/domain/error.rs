//! Error types for task domain validation and parsing.

use super::{TaskId, TaskStatus};
use crate::counter::CredentialError;
use crate::error::ErrorKind;
use thiserror::Error;

/// Errors returned while constructing or mutating task domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task date is not a `YYYY-MM-DD` calendar date.
    #[error("date must be in YYYY-MM-DD format, got '{0}'")]
    InvalidDate(String),

    /// Counter or credential validation failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The page size is outside the accepted range.
    #[error("limit must be between 1 and {max}, got {limit}")]
    InvalidPageLimit {
        /// Requested page size.
        limit: i64,
        /// Largest accepted page size.
        max: usize,
    },

    /// The page offset is negative.
    #[error("offset must not be negative, got {0}")]
    InvalidPageOffset(i64),

    /// The task has already reached a terminal status.
    #[error("task {task_id} is already {status}")]
    TaskAlreadyTerminal {
        /// Task identifier.
        task_id: TaskId,
        /// Terminal status the task is in.
        status: TaskStatus,
    },

    /// The task has not finished yet, so it has no result.
    #[error("task {task_id} is {status}, result is available once it is finished")]
    NotFinished {
        /// Task identifier.
        task_id: TaskId,
        /// Current status.
        status: TaskStatus,
    },
}

impl TaskDomainError {
    /// Returns the caller-visible category of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDate(_)
            | Self::Credential(_)
            | Self::InvalidPageLimit { .. }
            | Self::InvalidPageOffset(_) => ErrorKind::Validation,
            Self::TaskAlreadyTerminal { .. } => ErrorKind::InvalidState,
            Self::NotFinished { .. } => ErrorKind::NotReady,
        }
    }
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);
