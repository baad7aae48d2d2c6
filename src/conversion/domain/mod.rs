//! Domain model for offline conversion uploads.
//!
//! A conversion upload is one request pushing conversion rows to the
//! reporting API. Its status only moves forward through reconciliation
//! against the remote outcome.

mod csv;
mod error;
mod event;
mod ids;
mod report;
mod upload;

pub use csv::ConversionCsv;
pub use error::{ConversionDomainError, ParseUploadStatusError};
pub use event::{ClientIdType, ConversionEvent, ConversionIdentity, Currency};
pub use ids::UploadId;
pub use report::{RemoteUploadState, UploadReceipt, UploadReport};
pub use upload::{ConversionUpload, PersistedUploadData, UploadStatus};
