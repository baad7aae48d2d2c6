//! Service-level errors for the webhook context.

use crate::error::ErrorKind;
use crate::webhook::{
    domain::{BatchId, WebhookDomainError, WebhookId},
    ports::WebhookRepositoryError,
};
use thiserror::Error;

/// Errors returned by webhook services.
#[derive(Debug, Error)]
pub enum WebhookServiceError {
    /// Validation or authentication failed.
    #[error(transparent)]
    Domain(#[from] WebhookDomainError),
    /// No webhook has the given identifier.
    #[error("webhook not found: {0}")]
    WebhookNotFound(WebhookId),
    /// The batch does not exist or belongs to another webhook.
    #[error("batch not found: {0}")]
    BatchNotFound(BatchId),
    /// Store failure.
    #[error(transparent)]
    Repository(#[from] WebhookRepositoryError),
}

impl WebhookServiceError {
    /// Returns the caller-visible category of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(err) => err.kind(),
            Self::WebhookNotFound(_)
            | Self::BatchNotFound(_)
            | Self::Repository(
                WebhookRepositoryError::WebhookNotFound(_)
                | WebhookRepositoryError::BatchNotFound(_)
                | WebhookRepositoryError::ConversionNotFound(_),
            ) => ErrorKind::NotFound,
            Self::Repository(_) => ErrorKind::Storage,
        }
    }
}

/// Result type for webhook service operations.
pub type WebhookServiceResult<T> = Result<T, WebhookServiceError>;
