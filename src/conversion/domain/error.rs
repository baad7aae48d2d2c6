//! Error types for conversion domain validation.

use super::{UploadId, UploadStatus};
use crate::counter::CredentialError;
use crate::error::ErrorKind;
use thiserror::Error;

/// Errors returned while constructing or mutating conversion values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionDomainError {
    /// None of the visitor identity fields is present.
    #[error("at least one of client_id, user_id, yclid, purchase_id is required")]
    MissingIdentity,

    /// The conversion target name is blank.
    #[error("conversion target must not be empty")]
    EmptyTarget,

    /// The currency is not a three-letter code.
    #[error("currency must be a three-letter ISO 4217 code, got '{0}'")]
    InvalidCurrency(String),

    /// The price is negative or not a finite number.
    #[error("price must be a finite non-negative number")]
    InvalidPrice,

    /// There are no rows to upload.
    #[error("there are no conversions to upload")]
    NothingToUpload,

    /// Counter or credential validation failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The upload's status does not allow the requested change.
    #[error("upload {upload_id} cannot change while {status}")]
    InvalidTransition {
        /// Upload identifier.
        upload_id: UploadId,
        /// Status the upload is in.
        status: UploadStatus,
    },
}

impl ConversionDomainError {
    /// Returns the caller-visible category of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTransition { .. } => ErrorKind::InvalidState,
            Self::MissingIdentity
            | Self::EmptyTarget
            | Self::InvalidCurrency(_)
            | Self::InvalidPrice
            | Self::NothingToUpload
            | Self::Credential(_) => ErrorKind::Validation,
        }
    }
}

/// Error returned while parsing upload statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown upload status: {0}")]
pub struct ParseUploadStatusError(pub String);
