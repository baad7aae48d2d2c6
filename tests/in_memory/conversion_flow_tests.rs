//! In-memory integration tests for bulk uploads and reconciliation.

use std::sync::Arc;

use super::helpers::{COUNTER, DAY, TOKEN, scored_visits};
use metrika_score::conversion::{
    adapters::memory::{InMemoryUploadRepository, ScriptedReportingApi},
    domain::{RemoteUploadState, UploadReport, UploadStatus},
    services::{ConversionUploadCoordinator, TaskUploadRequest},
};
use metrika_score::error::{ErrorKind, PipelineError};
use metrika_score::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::TaskId,
    services::{CreateTaskRequest, TaskLifecycleService},
};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

type Coordinator = ConversionUploadCoordinator<
    InMemoryUploadRepository,
    InMemoryTaskRepository,
    ScriptedReportingApi,
    DefaultClock,
>;

struct Pipeline {
    lifecycle: TaskLifecycleService<InMemoryTaskRepository, DefaultClock>,
    coordinator: Coordinator,
    api: Arc<ScriptedReportingApi>,
}

#[fixture]
fn pipeline() -> Pipeline {
    let clock = Arc::new(DefaultClock);
    let tasks = Arc::new(InMemoryTaskRepository::new());
    let api = Arc::new(ScriptedReportingApi::new());
    Pipeline {
        lifecycle: TaskLifecycleService::new(Arc::clone(&tasks), Arc::clone(&clock)),
        coordinator: ConversionUploadCoordinator::new(
            Arc::new(InMemoryUploadRepository::new()),
            tasks,
            Arc::clone(&api),
            clock,
        ),
        api,
    }
}

fn upload_request(task_id: TaskId) -> TaskUploadRequest {
    TaskUploadRequest {
        task_id,
        target: "engaged".to_owned(),
        counter: COUNTER,
        token: TOKEN.to_owned(),
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn finished_task_uploads_and_reconciles(pipeline: Pipeline) -> eyre::Result<()> {
    let task = pipeline
        .lifecycle
        .create_task(CreateTaskRequest::new(DAY, COUNTER, TOKEN))
        .await?;
    pipeline.lifecycle.complete(task.id(), scored_visits(3)).await?;

    let upload = pipeline
        .coordinator
        .upload_from_task(upload_request(task.id()))
        .await?;
    eyre::ensure!(upload.status() == UploadStatus::Processing);
    eyre::ensure!(upload.total() == 3);
    eyre::ensure!(upload.task_id() == Some(task.id()));

    let submissions = pipeline.api.submissions();
    eyre::ensure!(submissions.len() == 1);
    eyre::ensure!(submissions
        .first()
        .is_some_and(|submission| submission.csv.starts_with("ClientId,Target,DateTime\n")));

    let still_running = pipeline.coordinator.refresh_status(upload.id()).await?;
    eyre::ensure!(still_running.status() == UploadStatus::Processing);

    pipeline.api.set_report(
        1,
        UploadReport {
            state: RemoteUploadState::Completed,
            status: "PROCESSED".to_owned(),
            processed: 3,
            errors: Vec::new(),
        },
    );
    let done = pipeline.coordinator.refresh_status(upload.id()).await?;
    eyre::ensure!(done.status() == UploadStatus::Processed);
    eyre::ensure!(done.processed() == 3);

    let checks = pipeline.api.status_checks();
    let again = pipeline.coordinator.refresh_status(upload.id()).await?;
    eyre::ensure!(again == done);
    eyre::ensure!(pipeline.api.status_checks() == checks);

    let listed = pipeline.coordinator.list_uploads_for_task(task.id()).await?;
    eyre::ensure!(listed.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn running_task_is_not_ready_for_upload(pipeline: Pipeline) -> eyre::Result<()> {
    let task = pipeline
        .lifecycle
        .create_task(CreateTaskRequest::new(DAY, COUNTER, TOKEN))
        .await?;
    pipeline
        .lifecycle
        .update_progress(task.id(), 60, "scoring visits")
        .await?;

    let err = pipeline
        .coordinator
        .upload_from_task(upload_request(task.id()))
        .await
        .expect_err("running task cannot be uploaded");
    eyre::ensure!(PipelineError::from(err).kind() == ErrorKind::NotReady);
    eyre::ensure!(pipeline.api.submissions().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_task_is_not_found(pipeline: Pipeline) {
    let err = pipeline
        .coordinator
        .upload_from_task(upload_request(TaskId::new()))
        .await
        .expect_err("unknown task rejected");
    assert_eq!(PipelineError::from(err).kind(), ErrorKind::NotFound);
}
