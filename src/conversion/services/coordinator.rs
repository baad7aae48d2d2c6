//! Conversion upload coordination: submit, persist, and reconcile.

use crate::conversion::{
    domain::{ConversionCsv, ConversionDomainError, ConversionEvent, ConversionUpload, UploadId},
    ports::{ReportingApi, ReportingApiError, UploadRepository, UploadRepositoryError},
};
use crate::config::PipelineConfig;
use crate::counter::{ApiToken, CounterId};
use crate::error::ErrorKind;
use crate::task::{
    domain::{TaskDomainError, TaskId},
    ports::{TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Request to upload every scored visit of a finished task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUploadRequest {
    /// Task whose result is uploaded.
    pub task_id: TaskId,
    /// Goal name reported for every visit.
    pub target: String,
    /// Target counter.
    pub counter: i64,
    /// API token.
    pub token: String,
}

/// Request to upload one ad-hoc conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleConversionRequest {
    /// Validated conversion.
    pub event: ConversionEvent,
    /// Target counter.
    pub counter: i64,
    /// API token.
    pub token: String,
}

/// Service-level errors for conversion uploads.
#[derive(Debug, Error)]
pub enum ConversionUploadError {
    /// Input validation or an upload state rule failed.
    #[error(transparent)]
    Domain(#[from] ConversionDomainError),
    /// The source task is not finished.
    #[error(transparent)]
    Task(#[from] TaskDomainError),
    /// No task has the given identifier.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// The task is finished but has no scored visits to upload.
    #[error("no scored visits stored for task {0}")]
    ResultNotFound(TaskId),
    /// No upload has the given identifier.
    #[error("upload not found: {0}")]
    UploadNotFound(UploadId),
    /// Task store failure.
    #[error(transparent)]
    TaskRepository(#[from] TaskRepositoryError),
    /// Upload store failure.
    #[error(transparent)]
    Repository(#[from] UploadRepositoryError),
    /// The reporting API failed while polling.
    #[error(transparent)]
    Reporting(#[from] ReportingApiError),
}

impl ConversionUploadError {
    /// Returns the caller-visible category of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(err) => err.kind(),
            Self::Task(err) => err.kind(),
            Self::TaskNotFound(_)
            | Self::ResultNotFound(_)
            | Self::UploadNotFound(_)
            | Self::TaskRepository(TaskRepositoryError::NotFound(_))
            | Self::Repository(UploadRepositoryError::NotFound(_)) => ErrorKind::NotFound,
            Self::TaskRepository(_) | Self::Repository(_) => ErrorKind::Storage,
            Self::Reporting(_) => ErrorKind::ExternalService,
        }
    }
}

/// Result type for conversion upload operations.
pub type ConversionUploadResult<T> = Result<T, ConversionUploadError>;

/// How often and how many times an accepted upload is polled in the
/// background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolling {
    /// Delay between status checks.
    pub interval: Duration,
    /// Status checks made before reconciliation stops.
    pub max_polls: u32,
}

impl UploadPolling {
    /// Reads the polling budget from pipeline configuration.
    #[must_use]
    pub const fn from_config(config: &PipelineConfig) -> Self {
        Self {
            interval: config.upload_poll_interval,
            max_polls: config.upload_max_polls,
        }
    }
}

impl Default for UploadPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_polls: 10,
        }
    }
}

/// Turns finished task results and single events into reporting API uploads.
///
/// Submission is synchronous; the remote outcome is observed later by
/// polling [`ConversionUploadCoordinator::refresh_status`], either on
/// demand or through [`ConversionUploadCoordinator::spawn_reconciliation`].
pub struct ConversionUploadCoordinator<U, T, A, C>
where
    U: UploadRepository,
    T: TaskRepository,
    A: ReportingApi,
    C: Clock + Send + Sync,
{
    uploads: Arc<U>,
    tasks: Arc<T>,
    api: Arc<A>,
    clock: Arc<C>,
    polling: UploadPolling,
}

impl<U, T, A, C> Clone for ConversionUploadCoordinator<U, T, A, C>
where
    U: UploadRepository,
    T: TaskRepository,
    A: ReportingApi,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            uploads: Arc::clone(&self.uploads),
            tasks: Arc::clone(&self.tasks),
            api: Arc::clone(&self.api),
            clock: Arc::clone(&self.clock),
            polling: self.polling,
        }
    }
}

impl<U, T, A, C> ConversionUploadCoordinator<U, T, A, C>
where
    U: UploadRepository,
    T: TaskRepository,
    A: ReportingApi,
    C: Clock + Send + Sync,
{
    /// Creates a coordinator with the default reconciliation budget.
    #[must_use]
    pub fn new(uploads: Arc<U>, tasks: Arc<T>, api: Arc<A>, clock: Arc<C>) -> Self {
        Self {
            uploads,
            tasks,
            api,
            clock,
            polling: UploadPolling::default(),
        }
    }

    /// Replaces the reconciliation budget.
    #[must_use]
    pub fn with_polling(mut self, polling: UploadPolling) -> Self {
        self.polling = polling;
        self
    }

    /// Uploads every scored visit of a finished task as a conversion.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown tasks and for finished tasks
    /// without scored visits, a not-ready error while the task is
    /// unfinished, and validation errors for bad input. A
    /// rejected submission is not an error: the upload is returned with
    /// status `error`.
    pub async fn upload_from_task(
        &self,
        request: TaskUploadRequest,
    ) -> ConversionUploadResult<ConversionUpload> {
        let task = self
            .tasks
            .find_by_id(request.task_id)
            .await?
            .ok_or(ConversionUploadError::TaskNotFound(request.task_id))?;
        task.ensure_finished()?;
        let counter = CounterId::new(request.counter).map_err(ConversionDomainError::from)?;
        let token = ApiToken::new(request.token).map_err(ConversionDomainError::from)?;
        let result = self
            .tasks
            .find_result(task.id())
            .await?
            .filter(|stored| !stored.visits().is_empty())
            .ok_or(ConversionUploadError::ResultNotFound(task.id()))?;

        let csv = ConversionCsv::from_visits(&request.target, result.visits())?;
        self.submit(Some(task.id()), counter, request.target.trim(), token, &csv)
            .await
    }

    /// Uploads one conversion event.
    ///
    /// # Errors
    ///
    /// Returns validation errors for bad credentials. A rejected submission
    /// is not an error: the upload is returned with status `error`.
    pub async fn upload_single(
        &self,
        request: SingleConversionRequest,
    ) -> ConversionUploadResult<ConversionUpload> {
        let counter = CounterId::new(request.counter).map_err(ConversionDomainError::from)?;
        let token = ApiToken::new(request.token).map_err(ConversionDomainError::from)?;
        let csv = ConversionCsv::from_events(std::slice::from_ref(&request.event))?;
        self.submit(None, counter, request.event.target(), token, &csv)
            .await
    }

    /// Polls the remote outcome of an upload and stores it.
    ///
    /// Uploads already in a terminal status are returned unchanged without a
    /// remote call, so repeated polling is safe.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown uploads and an external-service
    /// error when the status request fails; the stored upload is left
    /// untouched in that case.
    pub async fn refresh_status(&self, id: UploadId) -> ConversionUploadResult<ConversionUpload> {
        let mut upload = self.get_upload(id).await?;
        if upload.status().is_terminal() {
            return Ok(upload);
        }
        let Some(external_id) = upload.external_id() else {
            return Ok(upload);
        };

        let report = self
            .api
            .fetch_status(upload.counter(), upload.token(), external_id)
            .await?;
        upload.apply_report(&report, &*self.clock)?;
        self.uploads.update(&upload).await?;
        tracing::info!(
            upload_id = %id,
            external_id,
            remote_status = %report.status,
            status = %upload.status(),
            processed = upload.processed(),
            total = upload.total(),
            "upload status refreshed"
        );
        Ok(upload)
    }

    /// Polls an upload until it reaches a terminal status or the polling
    /// budget runs out, returning the last stored state.
    ///
    /// The first check runs immediately; later checks wait the configured
    /// interval. Uploads without a remote identifier are returned after
    /// the first check since there is nothing to poll.
    ///
    /// # Errors
    ///
    /// Stops at the first failed check and returns its error; the stored
    /// upload keeps its last reconciled state.
    pub async fn reconcile(&self, id: UploadId) -> ConversionUploadResult<ConversionUpload> {
        let mut upload = self.refresh_status(id).await?;
        let mut polls: u32 = 1;
        while !upload.status().is_terminal()
            && upload.external_id().is_some()
            && polls < self.polling.max_polls
        {
            tokio::time::sleep(self.polling.interval).await;
            upload = self.refresh_status(id).await?;
            polls = polls.saturating_add(1);
        }

        if upload.status().is_terminal() {
            tracing::info!(upload_id = %id, status = %upload.status(), polls, "upload reconciled");
        } else {
            tracing::warn!(
                upload_id = %id,
                status = %upload.status(),
                polls,
                "upload still unresolved after reconciliation"
            );
        }
        Ok(upload)
    }

    /// Starts [`Self::reconcile`] for an upload in the background.
    ///
    /// Dropping the handle detaches the poll loop; it still runs to the end
    /// of its budget.
    #[must_use]
    pub fn spawn_reconciliation(
        &self,
        id: UploadId,
    ) -> JoinHandle<ConversionUploadResult<ConversionUpload>>
    where
        U: 'static,
        T: 'static,
        A: 'static,
        C: 'static,
    {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.reconcile(id).await })
    }

    /// Returns the stored state of an upload.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown uploads.
    pub async fn get_upload(&self, id: UploadId) -> ConversionUploadResult<ConversionUpload> {
        self.uploads
            .find_by_id(id)
            .await?
            .ok_or(ConversionUploadError::UploadNotFound(id))
    }

    /// Lists uploads created from a task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown tasks.
    pub async fn list_uploads_for_task(
        &self,
        task_id: TaskId,
    ) -> ConversionUploadResult<Vec<ConversionUpload>> {
        if self.tasks.find_by_id(task_id).await?.is_none() {
            return Err(ConversionUploadError::TaskNotFound(task_id));
        }
        Ok(self.uploads.list_for_task(task_id).await?)
    }

    async fn submit(
        &self,
        task_id: Option<TaskId>,
        counter: CounterId,
        target: &str,
        token: ApiToken,
        csv: &ConversionCsv,
    ) -> ConversionUploadResult<ConversionUpload> {
        let total = u32::try_from(csv.rows()).unwrap_or(u32::MAX);
        let mut upload = ConversionUpload::new(task_id, counter, target, token, total, &*self.clock);
        self.uploads.store(&upload).await?;

        match self.api.submit(counter, upload.token(), csv).await {
            Ok(receipt) => {
                if let Some(counted) = receipt.line_mismatch(total) {
                    tracing::warn!(
                        upload_id = %upload.id(),
                        external_id = receipt.external_id,
                        counted,
                        total,
                        "reporting API counted a different number of rows"
                    );
                }
                upload.mark_submitted(&receipt, &*self.clock)?;
                tracing::info!(
                    upload_id = %upload.id(),
                    external_id = receipt.external_id,
                    remote_status = %receipt.status,
                    total,
                    "conversion upload accepted"
                );
            }
            Err(err) => {
                tracing::warn!(upload_id = %upload.id(), error = %err, "conversion upload rejected");
                upload.mark_submit_failed(err.to_string(), &*self.clock)?;
            }
        }
        self.uploads.update(&upload).await?;
        Ok(upload)
    }
}
