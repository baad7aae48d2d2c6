//! Repository port for conversion upload records.

use crate::conversion::domain::{ConversionUpload, UploadId};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for upload repository operations.
pub type UploadRepositoryResult<T> = Result<T, UploadRepositoryError>;

/// Conversion upload persistence contract.
#[async_trait]
pub trait UploadRepository: Send + Sync {
    /// Stores a new upload.
    ///
    /// # Errors
    ///
    /// Returns [`UploadRepositoryError::DuplicateUpload`] when the ID exists.
    async fn store(&self, upload: &ConversionUpload) -> UploadRepositoryResult<()>;

    /// Persists status and count changes.
    ///
    /// # Errors
    ///
    /// Returns [`UploadRepositoryError::NotFound`] when the upload does not
    /// exist.
    async fn update(&self, upload: &ConversionUpload) -> UploadRepositoryResult<()>;

    /// Finds an upload by identifier.
    async fn find_by_id(&self, id: UploadId) -> UploadRepositoryResult<Option<ConversionUpload>>;

    /// Returns uploads created from a task, oldest first.
    async fn list_for_task(&self, task_id: TaskId) -> UploadRepositoryResult<Vec<ConversionUpload>>;
}

/// Errors returned by upload repository implementations.
#[derive(Debug, Clone, Error)]
pub enum UploadRepositoryError {
    /// An upload with the same identifier already exists.
    #[error("duplicate upload identifier: {0}")]
    DuplicateUpload(UploadId),

    /// The upload was not found.
    #[error("upload not found: {0}")]
    NotFound(UploadId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl UploadRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
