//! Ports for the remote log download and the visit classifier.

use crate::counter::{ApiToken, CounterId};
use crate::task::domain::{RawVisitLogs, ScoredVisit};
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// Source of raw visit logs for one counter and day.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisitLogSource: Send + Sync {
    /// Downloads the visits and hits logged on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`LogSourceError`] when the remote API rejects or fails any
    /// request. Implementations do not retry.
    async fn fetch(
        &self,
        date: NaiveDate,
        counter: CounterId,
        token: &ApiToken,
    ) -> Result<RawVisitLogs, LogSourceError>;
}

/// Errors returned by visit log sources.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LogSourceError {
    /// The remote API answered with a non-success status.
    #[error("log API returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The request never produced a response.
    #[error("log API request failed: {0}")]
    Transport(String),

    /// The log request ended in a status that will not produce data.
    #[error("log request {request_id} ended with status '{status}'")]
    RequestFailed {
        /// Remote log request identifier.
        request_id: u64,
        /// Status reported by the remote API.
        status: String,
    },

    /// The log request was still being prepared after the poll budget.
    #[error("log request {request_id} was not processed after {polls} status checks")]
    NotProcessed {
        /// Remote log request identifier.
        request_id: u64,
        /// Number of status checks made.
        polls: u32,
    },

    /// A downloaded row could not be parsed.
    #[error("malformed log data: {0}")]
    Malformed(String),
}

/// Pure scoring function applied to downloaded logs.
#[cfg_attr(test, mockall::automock)]
pub trait VisitClassifier: Send + Sync {
    /// Returns the qualifying visits in log order.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] when the logs cannot be scored.
    fn classify(&self, logs: &RawVisitLogs) -> Result<Vec<ScoredVisit>, ClassifierError>;
}

/// Errors returned by visit classifiers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("visit classification failed: {0}")]
pub struct ClassifierError(pub String);
