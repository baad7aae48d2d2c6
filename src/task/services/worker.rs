//! Background unit of work that drives one task from pending to terminal.

use super::lifecycle::{TaskLifecycleError, TaskLifecycleService};
use crate::error::ErrorKind;
use crate::task::{
    domain::{Task, TaskId},
    ports::{ClassifierError, LogSourceError, TaskRepository, VisitClassifier, VisitLogSource},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

const DOWNLOAD_PROGRESS: i64 = 10;
const SCORING_PROGRESS: i64 = 60;

/// Errors that ended a scoring run.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// Reading or writing the task failed.
    #[error(transparent)]
    Lifecycle(#[from] TaskLifecycleError),
    /// The log download failed.
    #[error(transparent)]
    LogSource(#[from] LogSourceError),
    /// The classifier failed.
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

impl ScoringError {
    /// Returns the caller-visible category of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Lifecycle(err) => err.kind(),
            Self::LogSource(_) | Self::Classifier(_) => ErrorKind::ExternalService,
        }
    }
}

/// Drives a single task through download, scoring, and completion.
///
/// The worker never retries: the first failure is recorded on the task as
/// its error description.
pub struct ScoringWorker<R, L, V, C>
where
    R: TaskRepository,
    L: VisitLogSource,
    V: VisitClassifier,
    C: Clock + Send + Sync,
{
    lifecycle: Arc<TaskLifecycleService<R, C>>,
    log_source: Arc<L>,
    classifier: Arc<V>,
}

impl<R, L, V, C> ScoringWorker<R, L, V, C>
where
    R: TaskRepository,
    L: VisitLogSource,
    V: VisitClassifier + 'static,
    C: Clock + Send + Sync,
{
    /// Creates a worker over the given lifecycle service and collaborators.
    #[must_use]
    pub const fn new(
        lifecycle: Arc<TaskLifecycleService<R, C>>,
        log_source: Arc<L>,
        classifier: Arc<V>,
    ) -> Self {
        Self {
            lifecycle,
            log_source,
            classifier,
        }
    }

    /// Runs the task to a terminal status.
    ///
    /// On failure the task is marked `error` before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the [`ScoringError`] that stopped the run.
    pub async fn run(&self, id: TaskId) -> Result<Task, ScoringError> {
        match self.score(id).await {
            Ok(task) => Ok(task),
            Err(err) => {
                tracing::error!(task_id = %id, error = %err, "scoring run failed");
                if let Err(fail_err) = self.lifecycle.fail(id, err.to_string()).await {
                    tracing::error!(
                        task_id = %id,
                        error = %fail_err,
                        "could not record task failure"
                    );
                }
                Err(err)
            }
        }
    }

    async fn score(&self, id: TaskId) -> Result<Task, ScoringError> {
        let task = self
            .lifecycle
            .update_progress(id, DOWNLOAD_PROGRESS, "downloading visit logs")
            .await?;
        let params = task.params();
        let logs = self
            .log_source
            .fetch(params.date(), params.counter(), params.token())
            .await?;
        tracing::info!(
            task_id = %id,
            visits = logs.visits.len(),
            hits = logs.hits.len(),
            "visit logs downloaded"
        );

        self.lifecycle
            .update_progress(id, SCORING_PROGRESS, "scoring visits")
            .await?;
        let classifier = Arc::clone(&self.classifier);
        let visits = tokio::task::spawn_blocking(move || classifier.classify(&logs))
            .await
            .map_err(|err| ClassifierError(err.to_string()))??;

        Ok(self.lifecycle.complete(id, visits).await?)
    }
}
