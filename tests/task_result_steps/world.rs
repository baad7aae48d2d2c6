//! Shared world state for task result BDD scenarios.

use std::sync::Arc;

use metrika_score::conversion::{
    adapters::memory::{InMemoryUploadRepository, ScriptedReportingApi},
    domain::ConversionUpload,
    services::{ConversionUploadCoordinator, ConversionUploadError},
};
use metrika_score::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{ResultPage, Task},
    services::TaskLifecycleService,
};
use mockable::DefaultClock;
use rstest::fixture;

/// Lifecycle service type used by the BDD world.
pub type TestLifecycle = TaskLifecycleService<InMemoryTaskRepository, DefaultClock>;

/// Upload coordinator type used by the BDD world.
pub type TestCoordinator = ConversionUploadCoordinator<
    InMemoryUploadRepository,
    InMemoryTaskRepository,
    ScriptedReportingApi,
    DefaultClock,
>;

/// Scenario world for task result behaviour tests.
pub struct TaskResultWorld {
    pub lifecycle: TestLifecycle,
    pub coordinator: TestCoordinator,
    pub api: Arc<ScriptedReportingApi>,
    pub task: Option<Task>,
    pub page: Option<ResultPage>,
    pub upload_result: Option<Result<ConversionUpload, ConversionUploadError>>,
}

impl TaskResultWorld {
    /// Creates a world backed by fresh in-memory stores.
    #[must_use]
    pub fn new() -> Self {
        let clock = Arc::new(DefaultClock);
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let api = Arc::new(ScriptedReportingApi::new());
        Self {
            lifecycle: TaskLifecycleService::new(Arc::clone(&tasks), Arc::clone(&clock)),
            coordinator: ConversionUploadCoordinator::new(
                Arc::new(InMemoryUploadRepository::new()),
                tasks,
                Arc::clone(&api),
                clock,
            ),
            api,
            task: None,
            page: None,
            upload_result: None,
        }
    }

    /// Returns the task created by the scenario.
    ///
    /// # Errors
    ///
    /// Returns an error when no task has been created yet.
    pub fn task(&self) -> Result<&Task, eyre::Report> {
        self.task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }
}

impl Default for TaskResultWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> TaskResultWorld {
    TaskResultWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
