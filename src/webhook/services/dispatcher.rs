//! Concurrent delivery of webhook conversions to the reporting API.

use super::error::{WebhookServiceError, WebhookServiceResult};
use crate::conversion::{domain::ConversionCsv, ports::ReportingApi};
use crate::counter::{ApiToken, CounterId};
use crate::webhook::{
    domain::{BatchId, ConversionStatus, WebhookBatch, WebhookConversion},
    ports::{BatchRepository, ConversionUpdate, WebhookRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Sends each pending conversion of a batch as its own upload.
///
/// A shared semaphore bounds how many sends run at once across all
/// batches. Every outcome is written through
/// [`BatchRepository::update_conversion`], which recomputes the batch.
pub struct BatchDispatcher<B, A, C>
where
    B: BatchRepository,
    A: ReportingApi,
    C: Clock + Send + Sync,
{
    batches: Arc<B>,
    api: Arc<A>,
    clock: Arc<C>,
    permits: Arc<Semaphore>,
}

impl<B, A, C> BatchDispatcher<B, A, C>
where
    B: BatchRepository + 'static,
    A: ReportingApi + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a dispatcher running at most `concurrency` sends at once.
    #[must_use]
    pub fn new(batches: Arc<B>, api: Arc<A>, clock: Arc<C>, concurrency: usize) -> Self {
        Self {
            batches,
            api,
            clock,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Sends every pending conversion of `batch_id` and returns the batch
    /// once all outcomes are recorded.
    ///
    /// A failed send marks only that conversion as errored.
    ///
    /// # Errors
    ///
    /// Returns an error when the batch cannot be read or an outcome cannot
    /// be stored.
    pub async fn dispatch(
        &self,
        batch_id: BatchId,
        counter: CounterId,
        token: &ApiToken,
    ) -> WebhookServiceResult<WebhookBatch> {
        let pending: Vec<WebhookConversion> = self
            .batches
            .list_conversions(batch_id)
            .await?
            .into_iter()
            .filter(|conversion| conversion.status() == ConversionStatus::Pending)
            .collect();

        let mut sends = JoinSet::new();
        for conversion in pending {
            let batches = Arc::clone(&self.batches);
            let api = Arc::clone(&self.api);
            let clock = Arc::clone(&self.clock);
            let permits = Arc::clone(&self.permits);
            let owned_token = token.clone();
            sends.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(WebhookRepositoryError::persistence)?;
                send_one(&*batches, &*api, &*clock, counter, &owned_token, conversion).await
            });
        }

        let mut first_failure = None;
        while let Some(joined) = sends.join_next().await {
            let outcome = match joined {
                Ok(stored) => stored.map(|_| ()),
                Err(join_err) => Err(WebhookRepositoryError::persistence(join_err).into()),
            };
            if let Err(err) = outcome {
                tracing::error!(
                    batch_id = %batch_id,
                    kind = ?err.kind(),
                    error = %err,
                    "webhook conversion outcome not stored"
                );
                first_failure.get_or_insert(err);
            }
        }
        if let Some(err) = first_failure {
            return Err(err);
        }

        let batch = self
            .batches
            .find_batch(batch_id)
            .await?
            .ok_or(WebhookRepositoryError::BatchNotFound(batch_id))?;
        tracing::info!(
            batch_id = %batch_id,
            status = %batch.status(),
            processed = batch.processed(),
            total = batch.total(),
            "webhook batch dispatched"
        );
        Ok(batch)
    }
}

async fn send_one<B, A, C>(
    batches: &B,
    api: &A,
    clock: &C,
    counter: CounterId,
    token: &ApiToken,
    mut conversion: WebhookConversion,
) -> WebhookServiceResult<WebhookBatch>
where
    B: BatchRepository,
    A: ReportingApi,
    C: Clock + Send + Sync,
{
    let outcome = match ConversionCsv::from_events(std::slice::from_ref(conversion.event())) {
        Ok(csv) => api.submit(counter, token, &csv).await.map_err(|err| err.to_string()),
        Err(err) => Err(err.to_string()),
    };

    let upload_reference = match outcome {
        Ok(receipt) => {
            tracing::debug!(
                conversion_id = %conversion.id(),
                external_id = receipt.external_id,
                "webhook conversion sent"
            );
            conversion.mark_sent(clock)?;
            Some(receipt.external_id)
        }
        Err(detail) => {
            tracing::warn!(conversion_id = %conversion.id(), error = %detail, "webhook conversion failed");
            conversion.mark_failed(detail, clock)?;
            None
        }
    };

    Ok(batches
        .update_conversion(ConversionUpdate {
            conversion,
            upload_reference,
            observed_at: clock.utc(),
        })
        .await?)
}
