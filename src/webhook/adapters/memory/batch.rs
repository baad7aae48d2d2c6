//! In-memory batch repository with one lock per batch.
//!
//! The outer map lock is held only to look a batch up. Conversion updates
//! and the aggregate recomputation they trigger run under the batch's own
//! mutex, so sibling conversions of one batch serialize while different
//! batches proceed independently.

use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, RwLock};

use crate::webhook::{
    domain::{BatchId, WebhookBatch, WebhookConversion},
    ports::{BatchRepository, ConversionUpdate, WebhookRepositoryError, WebhookRepositoryResult},
};

#[derive(Debug)]
struct BatchRecord {
    batch: WebhookBatch,
    conversions: Vec<WebhookConversion>,
}

type SharedRecord = Arc<Mutex<BatchRecord>>;

/// Thread-safe in-memory batch repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBatchRepository {
    batches: Arc<RwLock<HashMap<BatchId, SharedRecord>>>,
}

impl InMemoryBatchRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, id: BatchId) -> WebhookRepositoryResult<Option<SharedRecord>> {
        let batches = self.batches.read().map_err(poisoned)?;
        Ok(batches.get(&id).map(Arc::clone))
    }
}

fn poisoned(err: impl std::fmt::Display) -> WebhookRepositoryError {
    WebhookRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl BatchRepository for InMemoryBatchRepository {
    async fn store_batch(
        &self,
        batch: &WebhookBatch,
        conversions: &[WebhookConversion],
    ) -> WebhookRepositoryResult<()> {
        let mut batches = self.batches.write().map_err(poisoned)?;
        match batches.entry(batch.id()) {
            Entry::Occupied(_) => Err(WebhookRepositoryError::DuplicateBatch(batch.id())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(BatchRecord {
                    batch: batch.clone(),
                    conversions: conversions.to_vec(),
                })));
                Ok(())
            }
        }
    }

    async fn update_conversion(
        &self,
        update: ConversionUpdate,
    ) -> WebhookRepositoryResult<WebhookBatch> {
        let batch_id = update.conversion.batch_id();
        let shared = self
            .record(batch_id)?
            .ok_or(WebhookRepositoryError::BatchNotFound(batch_id))?;
        let mut record = shared.lock().map_err(poisoned)?;

        let conversion_id = update.conversion.id();
        let stored = record
            .conversions
            .iter_mut()
            .find(|conversion| conversion.id() == conversion_id)
            .ok_or(WebhookRepositoryError::ConversionNotFound(conversion_id))?;
        *stored = update.conversion;

        let BatchRecord { batch, conversions } = &mut *record;
        if let Some(reference) = update.upload_reference {
            batch.record_upload_reference(reference);
        }
        batch.recompute(conversions, update.observed_at);
        Ok(batch.clone())
    }

    async fn find_batch(&self, id: BatchId) -> WebhookRepositoryResult<Option<WebhookBatch>> {
        let Some(shared) = self.record(id)? else {
            return Ok(None);
        };
        let record = shared.lock().map_err(poisoned)?;
        Ok(Some(record.batch.clone()))
    }

    async fn list_conversions(
        &self,
        batch_id: BatchId,
    ) -> WebhookRepositoryResult<Vec<WebhookConversion>> {
        let Some(shared) = self.record(batch_id)? else {
            return Ok(Vec::new());
        };
        let record = shared.lock().map_err(poisoned)?;
        Ok(record.conversions.clone())
    }
}
