//! Service layer for task creation, progress reporting, and result reads.

use crate::error::ErrorKind;
use crate::task::{
    domain::{
        PageRequest, ProgressChange, ResultPage, ScoredVisit, Task, TaskDomainError, TaskId,
        TaskParams, TaskResult, TaskStatus,
    },
    ports::{TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Request payload for creating a scoring task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    date: String,
    counter: i64,
    token: String,
}

impl CreateTaskRequest {
    /// Creates a request from raw caller input.
    #[must_use]
    pub fn new(date: impl Into<String>, counter: i64, token: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            counter,
            token: token.into(),
        }
    }
}

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Domain validation or a state rule failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// No task has the given identifier.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The task finished but its result row is absent.
    #[error("result of finished task {0} is missing")]
    MissingResult(TaskId),
}

impl TaskLifecycleError {
    /// Returns the caller-visible category of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(err) => err.kind(),
            Self::NotFound(_) | Self::Repository(TaskRepositoryError::NotFound(_)) => {
                ErrorKind::NotFound
            }
            Self::Repository(TaskRepositoryError::ResultAlreadyStored(_)) => {
                ErrorKind::InvalidState
            }
            Self::Repository(_) | Self::MissingResult(_) => ErrorKind::Storage,
        }
    }
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Task lifecycle orchestration service.
#[derive(Clone)]
pub struct TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Validates the request and persists a pending task.
    ///
    /// Returns immediately; no scoring work is started here.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Domain`] when input validation fails or
    /// [`TaskLifecycleError::Repository`] when persistence fails.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskLifecycleResult<Task> {
        let params = TaskParams::new(&request.date, request.counter, &request.token)?;
        let task = Task::new(params, &*self.clock);
        self.repository.store(&task).await?;
        tracing::info!(
            task_id = %task.id(),
            date = %task.params().date(),
            counter = %task.params().counter(),
            "task created"
        );
        Ok(task)
    }

    /// Records worker progress and marks the task running.
    ///
    /// A percentage lower than the stored value is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks and
    /// [`TaskLifecycleError::Domain`] when the task is already terminal.
    pub async fn update_progress(
        &self,
        id: TaskId,
        percent: i64,
        message: impl Into<String> + Send,
    ) -> TaskLifecycleResult<Task> {
        let mut task = self.load(id).await?;
        match task.record_progress(percent, message, &*self.clock)? {
            ProgressChange::Applied { progress } => {
                tracing::debug!(task_id = %id, progress, message = task.message(), "task progress");
            }
            ProgressChange::Regressed { current, requested } => {
                tracing::warn!(
                    task_id = %id,
                    current,
                    requested,
                    "progress report went backwards, keeping previous value"
                );
            }
        }
        self.repository.update(&task).await?;
        Ok(task)
    }

    /// Finishes the task and stores its result in one atomic write.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks and
    /// [`TaskLifecycleError::Domain`] when the task is already terminal.
    pub async fn complete(&self, id: TaskId, visits: Vec<ScoredVisit>) -> TaskLifecycleResult<Task> {
        let mut task = self.load(id).await?;
        let total = visits.len();
        task.complete(format!("scored {total} engaged visits"), &*self.clock)?;
        let result = TaskResult::new(id, visits);
        self.repository.store_completion(&task, &result).await?;
        tracing::info!(task_id = %id, total, "task finished");
        Ok(task)
    }

    /// Marks the task failed with a description of the failure.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks and
    /// [`TaskLifecycleError::Domain`] when the task is already terminal.
    pub async fn fail(
        &self,
        id: TaskId,
        error: impl Into<String> + Send,
    ) -> TaskLifecycleResult<Task> {
        let mut task = self.load(id).await?;
        task.fail(error, &*self.clock)?;
        self.repository.update(&task).await?;
        tracing::warn!(task_id = %id, error = task.error().unwrap_or_default(), "task failed");
        Ok(task)
    }

    /// Returns the current snapshot of a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks.
    pub async fn get_status(&self, id: TaskId) -> TaskLifecycleResult<Task> {
        self.load(id).await
    }

    /// Returns one page of a finished task's result.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks and a
    /// not-ready [`TaskLifecycleError::Domain`] error before the task has
    /// finished.
    pub async fn get_result(&self, id: TaskId, page: PageRequest) -> TaskLifecycleResult<ResultPage> {
        Ok(self.finished_result(id).await?.page(page))
    }

    /// Returns the full result of a finished task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks and a
    /// not-ready [`TaskLifecycleError::Domain`] error before the task has
    /// finished.
    pub async fn finished_result(&self, id: TaskId) -> TaskLifecycleResult<TaskResult> {
        let task = self.load(id).await?;
        task.ensure_finished()?;
        self.repository
            .find_result(id)
            .await?
            .ok_or(TaskLifecycleError::MissingResult(id))
    }

    /// Lists tasks in creation order, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when the lookup fails.
    pub async fn list_tasks(&self, status: Option<TaskStatus>) -> TaskLifecycleResult<Vec<Task>> {
        Ok(self.repository.list(status).await?)
    }

    async fn load(&self, id: TaskId) -> TaskLifecycleResult<Task> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(id))
    }
}
