//! Caller-visible error taxonomy.
//!
//! Each bounded context reports failures through its own service error type.
//! The routing layer converts them into [`PipelineError`], which carries a
//! stable [`ErrorKind`] and a human-readable detail and never aborts the
//! process.

use crate::{
    conversion::services::ConversionUploadError,
    task::services::{ScoringError, TaskLifecycleError},
    webhook::services::WebhookServiceError,
};
use serde::Serialize;
use std::fmt;

/// Category of a caller-visible failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing required input.
    Validation,
    /// The referenced record does not exist.
    NotFound,
    /// The webhook secret is missing, wrong, or the webhook is inactive.
    Unauthorized,
    /// The record has not reached the state the operation requires.
    NotReady,
    /// A remote API failed or rejected the request.
    ExternalService,
    /// An attempted transition from a terminal or wrong state.
    InvalidState,
    /// The record store failed.
    Storage,
}

impl ErrorKind {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::NotReady => "not_ready",
            Self::ExternalService => "external_service_error",
            Self::InvalidState => "invalid_state",
            Self::Storage => "storage_error",
        }
    }

    /// Returns whether the failure was caused by the caller's input.
    #[must_use]
    pub const fn is_caller_error(self) -> bool {
        matches!(
            self,
            Self::Validation | Self::NotFound | Self::Unauthorized | Self::NotReady
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure returned to callers of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineError {
    kind: ErrorKind,
    detail: String,
}

impl PipelineError {
    /// Creates an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable detail.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Builds the outward error, logging invariant violations.
    ///
    /// Invalid-state failures indicate a concurrency bug rather than bad
    /// input, so their detail is logged here and replaced by a generic
    /// message.
    fn classified(kind: ErrorKind, detail: String) -> Self {
        if kind == ErrorKind::InvalidState {
            tracing::error!(detail = %detail, "record state invariant violated");
            return Self::new(kind, "the record is not in a state that allows this operation");
        }
        Self::new(kind, detail)
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl std::error::Error for PipelineError {}

impl From<TaskLifecycleError> for PipelineError {
    fn from(err: TaskLifecycleError) -> Self {
        Self::classified(err.kind(), err.to_string())
    }
}

impl From<ScoringError> for PipelineError {
    fn from(err: ScoringError) -> Self {
        Self::classified(err.kind(), err.to_string())
    }
}

impl From<ConversionUploadError> for PipelineError {
    fn from(err: ConversionUploadError) -> Self {
        Self::classified(err.kind(), err.to_string())
    }
}

impl From<WebhookServiceError> for PipelineError {
    fn from(err: WebhookServiceError) -> Self {
        Self::classified(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Validation, true)]
    #[case(ErrorKind::NotFound, true)]
    #[case(ErrorKind::Unauthorized, true)]
    #[case(ErrorKind::NotReady, true)]
    #[case(ErrorKind::ExternalService, false)]
    #[case(ErrorKind::InvalidState, false)]
    #[case(ErrorKind::Storage, false)]
    fn caller_errors_are_classified(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_caller_error(), expected);
    }

    #[test]
    fn invalid_state_detail_is_replaced_by_generic_message() {
        let err = PipelineError::classified(
            ErrorKind::InvalidState,
            "task 42 is already finished".to_owned(),
        );
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(!err.detail().contains("42"));
    }

    #[test]
    fn pipeline_error_serializes_kind_and_detail() {
        let err = PipelineError::new(ErrorKind::NotReady, "task is still running");
        let json = serde_json::to_value(&err).expect("error should serialize");
        assert_eq!(
            json,
            serde_json::json!({"kind": "not_ready", "detail": "task is still running"})
        );
    }
}
