//! In-memory repository for conversion uploads.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::conversion::{
    domain::{ConversionUpload, UploadId},
    ports::{UploadRepository, UploadRepositoryError, UploadRepositoryResult},
};
use crate::task::domain::TaskId;

/// Thread-safe in-memory upload repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUploadRepository {
    uploads: Arc<RwLock<HashMap<UploadId, ConversionUpload>>>,
}

impl InMemoryUploadRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> UploadRepositoryError {
    UploadRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl UploadRepository for InMemoryUploadRepository {
    async fn store(&self, upload: &ConversionUpload) -> UploadRepositoryResult<()> {
        let mut uploads = self.uploads.write().map_err(poisoned)?;
        if uploads.contains_key(&upload.id()) {
            return Err(UploadRepositoryError::DuplicateUpload(upload.id()));
        }
        uploads.insert(upload.id(), upload.clone());
        Ok(())
    }

    async fn update(&self, upload: &ConversionUpload) -> UploadRepositoryResult<()> {
        let mut uploads = self.uploads.write().map_err(poisoned)?;
        let stored = uploads
            .get_mut(&upload.id())
            .ok_or(UploadRepositoryError::NotFound(upload.id()))?;
        *stored = upload.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: UploadId) -> UploadRepositoryResult<Option<ConversionUpload>> {
        let uploads = self.uploads.read().map_err(poisoned)?;
        Ok(uploads.get(&id).cloned())
    }

    async fn list_for_task(&self, task_id: TaskId) -> UploadRepositoryResult<Vec<ConversionUpload>> {
        let uploads = self.uploads.read().map_err(poisoned)?;
        let mut matching: Vec<ConversionUpload> = uploads
            .values()
            .filter(|upload| upload.task_id() == Some(task_id))
            .cloned()
            .collect();
        matching.sort_by_key(|upload| (upload.created_at(), upload.id()));
        Ok(matching)
    }
}
