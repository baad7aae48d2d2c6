//! Conversion upload aggregate and its reconciliation rules.

use super::{
    ConversionDomainError, ParseUploadStatusError, RemoteUploadState, UploadId, UploadReceipt,
    UploadReport,
};
use crate::counter::{ApiToken, CounterId};
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upload lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Created, not yet accepted by the remote API.
    Pending,
    /// Accepted and awaiting the remote outcome.
    Processing,
    /// Every row was processed without errors.
    Processed,
    /// Submission or processing failed.
    Error,
}

impl UploadStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Error => "error",
        }
    }

    /// Returns whether reconciliation can no longer change the status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Processed | Self::Error)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UploadStatus {
    type Error = ParseUploadStatusError;

    fn try_from(value: &str) -> Result<Self, ParseUploadStatusError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "processed" => Ok(Self::Processed),
            "error" => Ok(Self::Error),
            _ => Err(ParseUploadStatusError(value.to_owned())),
        }
    }
}

/// One request pushing conversions to the reporting API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionUpload {
    id: UploadId,
    task_id: Option<TaskId>,
    counter: CounterId,
    target: String,
    token: ApiToken,
    status: UploadStatus,
    total: u32,
    processed: u32,
    errors: Option<Vec<String>>,
    external_id: Option<u64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedUploadData {
    /// Persisted upload identifier.
    pub id: UploadId,
    /// Task the rows came from, if any.
    pub task_id: Option<TaskId>,
    /// Target counter.
    pub counter: CounterId,
    /// Goal name.
    pub target: String,
    /// API token used for reconciliation.
    pub token: ApiToken,
    /// Persisted status.
    pub status: UploadStatus,
    /// Number of rows sent.
    pub total: u32,
    /// Number of rows the remote API processed.
    pub processed: u32,
    /// Error details, if any.
    pub errors: Option<Vec<String>>,
    /// Remote upload identifier, once accepted.
    pub external_id: Option<u64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ConversionUpload {
    /// Creates a pending upload of `total` rows.
    #[must_use]
    pub fn new(
        task_id: Option<TaskId>,
        counter: CounterId,
        target: impl Into<String>,
        token: ApiToken,
        total: u32,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: UploadId::new(),
            task_id,
            counter,
            target: target.into(),
            token,
            status: UploadStatus::Pending,
            total,
            processed: 0,
            errors: None,
            external_id: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs an upload from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedUploadData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            counter: data.counter,
            target: data.target,
            token: data.token,
            status: data.status,
            total: data.total,
            processed: data.processed,
            errors: data.errors,
            external_id: data.external_id,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the upload identifier.
    #[must_use]
    pub const fn id(&self) -> UploadId {
        self.id
    }

    /// Returns the task the rows came from, if any.
    #[must_use]
    pub const fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    /// Returns the target counter.
    #[must_use]
    pub const fn counter(&self) -> CounterId {
        self.counter
    }

    /// Returns the goal name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the stored API token.
    #[must_use]
    pub const fn token(&self) -> &ApiToken {
        &self.token
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> UploadStatus {
        self.status
    }

    /// Returns the number of rows sent.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }

    /// Returns the number of rows processed remotely.
    #[must_use]
    pub const fn processed(&self) -> u32 {
        self.processed
    }

    /// Returns error details, if any.
    #[must_use]
    pub fn errors(&self) -> Option<&[String]> {
        self.errors.as_deref()
    }

    /// Returns the remote upload identifier, once accepted.
    #[must_use]
    pub const fn external_id(&self) -> Option<u64> {
        self.external_id
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Records synchronous acceptance by the remote API.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionDomainError::InvalidTransition`] when the
    /// upload is no longer pending.
    pub fn mark_submitted(
        &mut self,
        receipt: &UploadReceipt,
        clock: &impl Clock,
    ) -> Result<(), ConversionDomainError> {
        self.ensure_pending()?;
        self.external_id = Some(receipt.external_id);
        self.status = UploadStatus::Processing;
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Records a synchronous submission failure.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionDomainError::InvalidTransition`] when the
    /// upload is no longer pending.
    pub fn mark_submit_failed(
        &mut self,
        detail: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), ConversionDomainError> {
        self.ensure_pending()?;
        self.status = UploadStatus::Error;
        self.errors = Some(vec![detail.into()]);
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Applies a polled remote outcome.
    ///
    /// A failed remote state ends in `error`. Otherwise, fewer processed
    /// rows than sent keeps the upload `processing` while the remote side
    /// is still working; once it reports completion the upload becomes
    /// `processed` only if every row went through without errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionDomainError::InvalidTransition`] when the
    /// upload already reached a terminal status.
    pub fn apply_report(
        &mut self,
        report: &UploadReport,
        clock: &impl Clock,
    ) -> Result<(), ConversionDomainError> {
        if self.status.is_terminal() {
            return Err(ConversionDomainError::InvalidTransition {
                upload_id: self.id,
                status: self.status,
            });
        }
        self.processed = report.processed.min(self.total);
        self.errors = (!report.errors.is_empty()).then(|| report.errors.clone());

        self.status = match report.state {
            RemoteUploadState::Failed => {
                self.errors
                    .get_or_insert_with(|| vec![format!("upload failed with status {}", report.status)]);
                UploadStatus::Error
            }
            RemoteUploadState::InProgress => UploadStatus::Processing,
            RemoteUploadState::Completed if self.processed == self.total && self.errors.is_none() => {
                UploadStatus::Processed
            }
            RemoteUploadState::Completed => {
                self.errors.get_or_insert_with(|| {
                    vec![format!(
                        "only {} of {} rows were processed",
                        self.processed, self.total
                    )]
                });
                UploadStatus::Error
            }
        };
        self.updated_at = clock.utc();
        Ok(())
    }

    const fn ensure_pending(&self) -> Result<(), ConversionDomainError> {
        match self.status {
            UploadStatus::Pending => Ok(()),
            status => Err(ConversionDomainError::InvalidTransition {
                upload_id: self.id,
                status,
            }),
        }
    }
}
