//! Error types for webhook domain validation.

use super::{ConversionStatus, WebhookConversionId};
use crate::conversion::domain::ConversionDomainError;
use crate::counter::CredentialError;
use crate::error::ErrorKind;
use thiserror::Error;

/// Errors returned while constructing or mutating webhook values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WebhookDomainError {
    /// The webhook display name is blank.
    #[error("webhook name must not be empty")]
    EmptyName,

    /// Counter or token validation failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The delivery contained no conversions.
    #[error("conversions must not be empty")]
    EmptyBatch,

    /// One item of a delivery failed validation.
    #[error("conversion {index}: {source}")]
    InvalidConversion {
        /// Zero-based position of the item in the delivery.
        index: usize,
        /// Validation failure.
        source: ConversionDomainError,
    },

    /// The secret did not match or the webhook is inactive.
    #[error("webhook secret is missing or invalid, or the webhook is inactive")]
    Unauthorized,

    /// The conversion has already been dispatched.
    #[error("webhook conversion {conversion_id} cannot change while {status}")]
    InvalidTransition {
        /// Conversion identifier.
        conversion_id: WebhookConversionId,
        /// Status the conversion is in.
        status: ConversionStatus,
    },
}

impl WebhookDomainError {
    /// Returns the caller-visible category of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyName
            | Self::Credential(_)
            | Self::EmptyBatch
            | Self::InvalidConversion { .. } => ErrorKind::Validation,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::InvalidTransition { .. } => ErrorKind::InvalidState,
        }
    }
}

/// Error returned while parsing webhook statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown webhook status: {0}")]
pub struct ParseWebhookStatusError(pub String);
