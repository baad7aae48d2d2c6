//! Authenticated webhook deliveries: ingestion and batch status reads.

use super::dispatcher::BatchDispatcher;
use super::error::{WebhookServiceError, WebhookServiceResult};
use super::registration::WebhookRegistrationService;
use crate::conversion::ports::ReportingApi;
use crate::webhook::{
    domain::{
        BatchId, ConversionPayload, Webhook, WebhookBatch, WebhookConversion, WebhookDomainError,
        WebhookId,
    },
    ports::{BatchRepository, WebhookRegistry},
};
use mockable::Clock;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Acknowledgement returned to the integrator for an accepted delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchAcceptance {
    /// Created batch.
    pub batch_id: BatchId,
    /// Always `accepted`.
    pub status: &'static str,
    /// Number of conversions stored.
    pub accepted_count: u32,
}

/// An accepted delivery and the handle of its dispatch.
#[derive(Debug)]
pub struct IngestedBatch {
    /// Acknowledgement for the integrator.
    pub acceptance: BatchAcceptance,
    /// Batch as stored, before dispatch.
    pub batch: WebhookBatch,
    /// Handle resolving to the batch after every conversion was sent.
    ///
    /// Dropping the handle detaches the dispatch; it still runs.
    pub dispatch: JoinHandle<WebhookServiceResult<WebhookBatch>>,
}

/// Accepts deliveries for registered webhooks and reports batch status.
pub struct WebhookIngestionService<W, B, A, C>
where
    W: WebhookRegistry,
    B: BatchRepository,
    A: ReportingApi,
    C: Clock + Send + Sync,
{
    registration: Arc<WebhookRegistrationService<W, C>>,
    batches: Arc<B>,
    dispatcher: Arc<BatchDispatcher<B, A, C>>,
    clock: Arc<C>,
}

impl<W, B, A, C> WebhookIngestionService<W, B, A, C>
where
    W: WebhookRegistry + 'static,
    B: BatchRepository + 'static,
    A: ReportingApi + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates an ingestion service.
    #[must_use]
    pub const fn new(
        registration: Arc<WebhookRegistrationService<W, C>>,
        batches: Arc<B>,
        dispatcher: Arc<BatchDispatcher<B, A, C>>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            registration,
            batches,
            dispatcher,
            clock,
        }
    }

    /// Validates and stores a delivery, then dispatches it in the
    /// background.
    ///
    /// Validation is all-or-nothing: one malformed item rejects the whole
    /// delivery before anything is stored.
    ///
    /// # Errors
    ///
    /// Returns an unauthorized error for a bad secret and a validation
    /// error for an empty delivery or a malformed item.
    pub async fn ingest_batch(
        &self,
        webhook_id: WebhookId,
        secret: Option<&str>,
        payloads: Vec<ConversionPayload>,
    ) -> WebhookServiceResult<IngestedBatch> {
        let webhook = self.registration.authenticate(webhook_id, secret).await?;
        if payloads.is_empty() {
            return Err(WebhookDomainError::EmptyBatch.into());
        }
        let events = payloads
            .into_iter()
            .enumerate()
            .map(|(index, payload)| {
                payload
                    .into_event()
                    .map_err(|source| WebhookDomainError::InvalidConversion { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let total = u32::try_from(events.len()).unwrap_or(u32::MAX);
        let batch = WebhookBatch::new(webhook.id(), webhook.counter(), total, &*self.clock);
        let conversions: Vec<WebhookConversion> = events
            .into_iter()
            .map(|event| WebhookConversion::new(batch.id(), event, &*self.clock))
            .collect();
        self.batches.store_batch(&batch, &conversions).await?;
        tracing::info!(
            webhook_id = %webhook_id,
            batch_id = %batch.id(),
            total,
            "webhook batch accepted"
        );

        let dispatcher = Arc::clone(&self.dispatcher);
        let batch_id = batch.id();
        let counter = webhook.counter();
        let token = webhook.token().clone();
        let dispatch =
            tokio::spawn(async move { dispatcher.dispatch(batch_id, counter, &token).await });

        Ok(IngestedBatch {
            acceptance: BatchAcceptance {
                batch_id,
                status: "accepted",
                accepted_count: total,
            },
            batch,
            dispatch,
        })
    }

    /// Returns a batch of the authenticated webhook.
    ///
    /// # Errors
    ///
    /// Returns an unauthorized error for a bad secret and a not-found error
    /// when the batch does not exist or belongs to another webhook.
    pub async fn get_batch_status(
        &self,
        webhook_id: WebhookId,
        batch_id: BatchId,
        secret: Option<&str>,
    ) -> WebhookServiceResult<WebhookBatch> {
        let webhook = self.registration.authenticate(webhook_id, secret).await?;
        self.owned_batch(&webhook, batch_id).await
    }

    /// Returns the per-item statuses of a batch of the authenticated
    /// webhook, in delivery order.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_batch_status`].
    pub async fn list_batch_conversions(
        &self,
        webhook_id: WebhookId,
        batch_id: BatchId,
        secret: Option<&str>,
    ) -> WebhookServiceResult<Vec<WebhookConversion>> {
        let webhook = self.registration.authenticate(webhook_id, secret).await?;
        let batch = self.owned_batch(&webhook, batch_id).await?;
        Ok(self.batches.list_conversions(batch.id()).await?)
    }

    async fn owned_batch(
        &self,
        webhook: &Webhook,
        batch_id: BatchId,
    ) -> WebhookServiceResult<WebhookBatch> {
        self.batches
            .find_batch(batch_id)
            .await?
            .filter(|batch| batch.webhook_id() == webhook.id())
            .ok_or(WebhookServiceError::BatchNotFound(batch_id))
    }
}
