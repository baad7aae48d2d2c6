//! Webhook delivery batches and their derived aggregate.
//!
//! A batch's counts, status, and error list are never set directly. They
//! are recomputed from the batch's conversions after every child change.

use super::{
    BatchId, ConversionStatus, ParseWebhookStatusError, WebhookConversion, WebhookId,
};
use crate::counter::CounterId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate status of a webhook batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// No conversion has been dispatched yet.
    Pending,
    /// Some conversions were dispatched, with mixed or incomplete outcomes.
    PartiallyProcessed,
    /// Every conversion was sent.
    Completed,
    /// Every conversion failed.
    Error,
}

impl BatchStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PartiallyProcessed => "partially_processed",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BatchStatus {
    type Error = ParseWebhookStatusError;

    fn try_from(value: &str) -> Result<Self, ParseWebhookStatusError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "partially_processed" => Ok(Self::PartiallyProcessed),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            _ => Err(ParseWebhookStatusError(value.to_owned())),
        }
    }
}

/// Counts and status derived from a batch's conversions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchAggregate {
    /// Number of conversions.
    pub total: u32,
    /// Conversions no longer pending.
    pub processed: u32,
    /// Derived status.
    pub status: BatchStatus,
    /// Failure details of errored conversions, absent when none failed.
    pub errors: Option<Vec<String>>,
}

impl BatchAggregate {
    /// Derives the aggregate from child conversions.
    #[must_use]
    pub fn from_children(children: &[WebhookConversion]) -> Self {
        let count = |status: ConversionStatus| {
            children
                .iter()
                .filter(|child| child.status() == status)
                .count()
        };
        let sent = count(ConversionStatus::Sent);
        let failed = count(ConversionStatus::Error);
        let total = children.len();
        let processed = sent.saturating_add(failed);

        let status = if total > 0 && sent == total {
            BatchStatus::Completed
        } else if total > 0 && failed == total {
            BatchStatus::Error
        } else if processed == 0 {
            BatchStatus::Pending
        } else {
            BatchStatus::PartiallyProcessed
        };
        let errors: Vec<String> = children
            .iter()
            .filter(|child| child.status() == ConversionStatus::Error)
            .map(|child| child.error().unwrap_or("conversion failed").to_owned())
            .collect();

        Self {
            total: u32::try_from(total).unwrap_or(u32::MAX),
            processed: u32::try_from(processed).unwrap_or(u32::MAX),
            status,
            errors: (!errors.is_empty()).then_some(errors),
        }
    }
}

/// One inbound delivery of conversions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookBatch {
    id: BatchId,
    webhook_id: WebhookId,
    counter: CounterId,
    status: BatchStatus,
    total: u32,
    processed: u32,
    metrika_upload_id: Option<u64>,
    errors: Option<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedBatchData {
    /// Persisted batch identifier.
    pub id: BatchId,
    /// Owning webhook.
    pub webhook_id: WebhookId,
    /// Counter the conversions are sent to.
    pub counter: CounterId,
    /// Aggregate status.
    pub status: BatchStatus,
    /// Number of conversions.
    pub total: u32,
    /// Conversions no longer pending.
    pub processed: u32,
    /// First remote upload reference, if any.
    pub metrika_upload_id: Option<u64>,
    /// Failure details, if any.
    pub errors: Option<Vec<String>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl WebhookBatch {
    /// Creates a pending batch of `total` conversions.
    #[must_use]
    pub fn new(webhook_id: WebhookId, counter: CounterId, total: u32, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: BatchId::new(),
            webhook_id,
            counter,
            status: BatchStatus::Pending,
            total,
            processed: 0,
            metrika_upload_id: None,
            errors: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a batch from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedBatchData) -> Self {
        Self {
            id: data.id,
            webhook_id: data.webhook_id,
            counter: data.counter,
            status: data.status,
            total: data.total,
            processed: data.processed,
            metrika_upload_id: data.metrika_upload_id,
            errors: data.errors,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the batch identifier.
    #[must_use]
    pub const fn id(&self) -> BatchId {
        self.id
    }

    /// Returns the owning webhook.
    #[must_use]
    pub const fn webhook_id(&self) -> WebhookId {
        self.webhook_id
    }

    /// Returns the counter the conversions are sent to.
    #[must_use]
    pub const fn counter(&self) -> CounterId {
        self.counter
    }

    /// Returns the aggregate status.
    #[must_use]
    pub const fn status(&self) -> BatchStatus {
        self.status
    }

    /// Returns the number of conversions.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }

    /// Returns how many conversions are no longer pending.
    #[must_use]
    pub const fn processed(&self) -> u32 {
        self.processed
    }

    /// Returns the first remote upload reference, if any.
    #[must_use]
    pub const fn metrika_upload_id(&self) -> Option<u64> {
        self.metrika_upload_id
    }

    /// Returns failure details, if any.
    #[must_use]
    pub fn errors(&self) -> Option<&[String]> {
        self.errors.as_deref()
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

    /// Replaces counts, status, and errors with values derived from
    /// `children`.
    pub fn recompute(&mut self, children: &[WebhookConversion], updated_at: DateTime<Utc>) {
        let aggregate = BatchAggregate::from_children(children);
        self.total = aggregate.total;
        self.processed = aggregate.processed;
        self.status = aggregate.status;
        self.errors = aggregate.errors;
        self.updated_at = updated_at;
    }

    /// Records the remote upload reference of the first successful send.
    ///
    /// Later references are ignored.
    pub const fn record_upload_reference(&mut self, external_id: u64) {
        if self.metrika_upload_id.is_none() {
            self.metrika_upload_id = Some(external_id);
        }
    }
}
