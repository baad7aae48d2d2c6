//! Repository ports for webhooks, batches, and webhook conversions.

use crate::webhook::domain::{
    BatchId, WebhookBatch, WebhookConversion, WebhookConversionId, WebhookId, Webhook,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for webhook repository operations.
pub type WebhookRepositoryResult<T> = Result<T, WebhookRepositoryError>;

/// Webhook registration persistence contract.
#[async_trait]
pub trait WebhookRegistry: Send + Sync {
    /// Stores a new webhook.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookRepositoryError::DuplicateWebhook`] when the ID
    /// exists.
    async fn store(&self, webhook: &Webhook) -> WebhookRepositoryResult<()>;

    /// Persists activation changes.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookRepositoryError::WebhookNotFound`] when the webhook
    /// does not exist.
    async fn update(&self, webhook: &Webhook) -> WebhookRepositoryResult<()>;

    /// Finds a webhook by identifier.
    async fn find_by_id(&self, id: WebhookId) -> WebhookRepositoryResult<Option<Webhook>>;
}

/// A dispatched conversion's new state.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionUpdate {
    /// Conversion in its new status.
    pub conversion: WebhookConversion,
    /// Remote upload reference when the send succeeded.
    pub upload_reference: Option<u64>,
    /// Timestamp recorded on the recomputed batch.
    pub observed_at: DateTime<Utc>,
}

/// Batch and webhook conversion persistence contract.
///
/// Implementations keep a batch's aggregate consistent with its children:
/// every conversion write and the batch recomputation it triggers form one
/// atomic unit per batch.
#[async_trait]
pub trait BatchRepository: Send + Sync {
    /// Stores a batch together with all of its conversions, or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookRepositoryError::DuplicateBatch`] when the batch ID
    /// exists.
    async fn store_batch(
        &self,
        batch: &WebhookBatch,
        conversions: &[WebhookConversion],
    ) -> WebhookRepositoryResult<()>;

    /// Persists a conversion status change, records the first upload
    /// reference on its batch, and recomputes the batch aggregate.
    ///
    /// Returns the batch as stored after recomputation.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookRepositoryError::ConversionNotFound`] or
    /// [`WebhookRepositoryError::BatchNotFound`] when either record is
    /// missing.
    async fn update_conversion(&self, update: ConversionUpdate)
    -> WebhookRepositoryResult<WebhookBatch>;

    /// Finds a batch by identifier.
    async fn find_batch(&self, id: BatchId) -> WebhookRepositoryResult<Option<WebhookBatch>>;

    /// Returns a batch's conversions in delivery order.
    async fn list_conversions(
        &self,
        batch_id: BatchId,
    ) -> WebhookRepositoryResult<Vec<WebhookConversion>>;
}

/// Errors returned by webhook repository implementations.
#[derive(Debug, Clone, Error)]
pub enum WebhookRepositoryError {
    /// A webhook with the same identifier already exists.
    #[error("duplicate webhook identifier: {0}")]
    DuplicateWebhook(WebhookId),

    /// The webhook was not found.
    #[error("webhook not found: {0}")]
    WebhookNotFound(WebhookId),

    /// A batch with the same identifier already exists.
    #[error("duplicate batch identifier: {0}")]
    DuplicateBatch(BatchId),

    /// The batch was not found.
    #[error("batch not found: {0}")]
    BatchNotFound(BatchId),

    /// The conversion was not found.
    #[error("webhook conversion not found: {0}")]
    ConversionNotFound(WebhookConversionId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl WebhookRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
