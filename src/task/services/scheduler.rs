//! Task submission that pairs every created task with exactly one worker.

use super::lifecycle::{CreateTaskRequest, TaskLifecycleResult, TaskLifecycleService};
use super::worker::{ScoringError, ScoringWorker};
use crate::task::{
    domain::Task,
    ports::{TaskRepository, VisitClassifier, VisitLogSource},
};
use mockable::Clock;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A created task and the handle of its worker.
#[derive(Debug)]
pub struct SubmittedTask {
    /// Snapshot of the task as created.
    pub task: Task,
    /// Handle resolving to the terminal task or the error that ended it.
    ///
    /// Dropping the handle detaches the worker; it still runs to completion.
    pub handle: JoinHandle<Result<Task, ScoringError>>,
}

/// Creates tasks and schedules their workers.
pub struct ScoringScheduler<R, L, V, C>
where
    R: TaskRepository,
    L: VisitLogSource,
    V: VisitClassifier,
    C: Clock + Send + Sync,
{
    lifecycle: Arc<TaskLifecycleService<R, C>>,
    worker: Arc<ScoringWorker<R, L, V, C>>,
}

impl<R, L, V, C> ScoringScheduler<R, L, V, C>
where
    R: TaskRepository + 'static,
    L: VisitLogSource + 'static,
    V: VisitClassifier + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a scheduler whose worker shares the given lifecycle service.
    #[must_use]
    pub fn new(
        lifecycle: Arc<TaskLifecycleService<R, C>>,
        log_source: Arc<L>,
        classifier: Arc<V>,
    ) -> Self {
        let worker = Arc::new(ScoringWorker::new(
            Arc::clone(&lifecycle),
            log_source,
            classifier,
        ));
        Self { lifecycle, worker }
    }

    /// Returns the lifecycle service used for reads.
    #[must_use]
    pub const fn lifecycle(&self) -> &Arc<TaskLifecycleService<R, C>> {
        &self.lifecycle
    }

    /// Creates a pending task and spawns its worker without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskLifecycleError`] when validation or persistence
    /// fails; no worker is spawned in that case.
    pub async fn submit(&self, request: CreateTaskRequest) -> TaskLifecycleResult<SubmittedTask> {
        let task = self.lifecycle.create_task(request).await?;
        let worker = Arc::clone(&self.worker);
        let task_id = task.id();
        let handle = tokio::spawn(async move { worker.run(task_id).await });
        Ok(SubmittedTask { task, handle })
    }
}
