//! Port for the remote offline conversion API.

use crate::conversion::domain::{ConversionCsv, UploadReceipt, UploadReport};
use crate::counter::{ApiToken, CounterId};
use async_trait::async_trait;
use thiserror::Error;

/// Remote API that accepts conversion files and reports their outcome.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportingApi: Send + Sync {
    /// Submits a conversion file for matching.
    ///
    /// # Errors
    ///
    /// Returns [`ReportingApiError`] when the request fails or is rejected.
    async fn submit(
        &self,
        counter: CounterId,
        token: &ApiToken,
        csv: &ConversionCsv,
    ) -> Result<UploadReceipt, ReportingApiError>;

    /// Reads the current outcome of an accepted upload.
    ///
    /// # Errors
    ///
    /// Returns [`ReportingApiError`] when the request fails or is rejected.
    async fn fetch_status(
        &self,
        counter: CounterId,
        token: &ApiToken,
        external_id: u64,
    ) -> Result<UploadReport, ReportingApiError>;
}

/// Errors returned by reporting API implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReportingApiError {
    /// The remote API answered with a non-success status.
    #[error("reporting API returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The request never produced a response.
    #[error("reporting API request failed: {0}")]
    Transport(String),

    /// The response did not have the expected shape.
    #[error("unexpected reporting API response: {0}")]
    Malformed(String),
}
