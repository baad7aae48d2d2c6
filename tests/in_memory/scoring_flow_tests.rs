//! In-memory integration tests for task submission and scoring.

use std::sync::Arc;

use super::helpers::{COUNTER, DAY, TOKEN, mixed_logs, scored_visits};
use metrika_score::error::{ErrorKind, PipelineError};
use metrika_score::task::{
    adapters::{
        classifier::EngagementRuleClassifier,
        memory::{InMemoryTaskRepository, StaticLogSource},
    },
    domain::{PageRequest, TaskStatus},
    ports::LogSourceError,
    services::{CreateTaskRequest, ScoringScheduler, TaskLifecycleService},
};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

type Lifecycle = TaskLifecycleService<InMemoryTaskRepository, DefaultClock>;

#[fixture]
fn lifecycle() -> Arc<Lifecycle> {
    Arc::new(TaskLifecycleService::new(
        Arc::new(InMemoryTaskRepository::new()),
        Arc::new(DefaultClock),
    ))
}

fn scheduler(
    lifecycle: Arc<Lifecycle>,
    source: StaticLogSource,
) -> ScoringScheduler<InMemoryTaskRepository, StaticLogSource, EngagementRuleClassifier, DefaultClock>
{
    ScoringScheduler::new(
        lifecycle,
        Arc::new(source),
        Arc::new(EngagementRuleClassifier::default()),
    )
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn submitted_task_finishes_with_engaged_visits_in_log_order(
    lifecycle: Arc<Lifecycle>,
) -> eyre::Result<()> {
    let scheduler = scheduler(Arc::clone(&lifecycle), StaticLogSource::with_logs(mixed_logs()));

    let submitted = scheduler
        .submit(CreateTaskRequest::new(DAY, COUNTER, TOKEN))
        .await?;
    eyre::ensure!(submitted.task.status() == TaskStatus::Pending);
    eyre::ensure!(submitted.task.progress() == 0);

    let finished = submitted.handle.await??;
    eyre::ensure!(finished.status() == TaskStatus::Finished);
    eyre::ensure!(finished.progress() == 100);
    eyre::ensure!(finished.finished_at().is_some());

    let page = lifecycle
        .get_result(finished.id(), PageRequest::default())
        .await?;
    let ids: Vec<&str> = page.data.iter().map(|visit| visit.visit_id.as_str()).collect();
    eyre::ensure!(ids == ["v1", "v3"], "unexpected visits {ids:?}");
    eyre::ensure!(page.pagination.total == 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn log_failure_marks_task_error(lifecycle: Arc<Lifecycle>) -> eyre::Result<()> {
    let source = StaticLogSource::failing(LogSourceError::Api {
        status: 429,
        body: "quota exceeded".to_owned(),
    });
    let scheduler = scheduler(Arc::clone(&lifecycle), source);

    let submitted = scheduler
        .submit(CreateTaskRequest::new(DAY, COUNTER, TOKEN))
        .await?;
    let outcome = submitted.handle.await?;
    eyre::ensure!(outcome.is_err());

    let task = lifecycle.get_status(submitted.task.id()).await?;
    eyre::ensure!(task.status() == TaskStatus::Error);
    eyre::ensure!(task.finished_at().is_some());
    eyre::ensure!(task.error().is_some_and(|error| error.contains("429")));
    eyre::ensure!(task.progress() < 100);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn result_pages_slice_the_stored_rows(lifecycle: Arc<Lifecycle>) -> eyre::Result<()> {
    let task = lifecycle
        .create_task(CreateTaskRequest::new(DAY, COUNTER, TOKEN))
        .await?;
    lifecycle.complete(task.id(), scored_visits(31)).await?;

    let page = lifecycle
        .get_result(task.id(), PageRequest::new(10, 20)?)
        .await?;
    eyre::ensure!(page.data.len() == 10);
    eyre::ensure!(page.pagination.total == 31);
    eyre::ensure!(page.pagination.has_more);
    eyre::ensure!(page.data.first().is_some_and(|visit| visit.visit_id == "visit-20"));

    let tail = lifecycle
        .get_result(task.id(), PageRequest::new(10, 40)?)
        .await?;
    eyre::ensure!(tail.data.is_empty());
    eyre::ensure!(!tail.pagination.has_more);
    eyre::ensure!(tail.pagination.total == 31);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn result_of_unfinished_task_is_not_ready(lifecycle: Arc<Lifecycle>) -> eyre::Result<()> {
    let task = lifecycle
        .create_task(CreateTaskRequest::new(DAY, COUNTER, TOKEN))
        .await?;

    let err = lifecycle
        .get_result(task.id(), PageRequest::default())
        .await
        .expect_err("pending task has no result");
    eyre::ensure!(PipelineError::from(err).kind() == ErrorKind::NotReady);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_filters_by_status(lifecycle: Arc<Lifecycle>) -> eyre::Result<()> {
    let first = lifecycle
        .create_task(CreateTaskRequest::new(DAY, COUNTER, TOKEN))
        .await?;
    let second = lifecycle
        .create_task(CreateTaskRequest::new("2025-07-02", COUNTER, TOKEN))
        .await?;
    lifecycle.complete(second.id(), scored_visits(1)).await?;

    let all = lifecycle.list_tasks(None).await?;
    eyre::ensure!(all.len() == 2);
    eyre::ensure!(all.first().is_some_and(|task| task.id() == first.id()));

    let finished = lifecycle.list_tasks(Some(TaskStatus::Finished)).await?;
    eyre::ensure!(finished.len() == 1);
    eyre::ensure!(finished.first().is_some_and(|task| task.id() == second.id()));
    Ok(())
}

#[rstest]
#[case::bad_date("2025-02-30", COUNTER, TOKEN)]
#[case::zero_counter(DAY, 0, TOKEN)]
#[case::blank_token(DAY, COUNTER, "  ")]
#[tokio::test(flavor = "multi_thread")]
async fn invalid_params_are_rejected(
    lifecycle: Arc<Lifecycle>,
    #[case] date: &str,
    #[case] counter: i64,
    #[case] token: &str,
) {
    let err = lifecycle
        .create_task(CreateTaskRequest::new(date, counter, token))
        .await
        .expect_err("invalid params rejected");
    assert_eq!(PipelineError::from(err).kind(), ErrorKind::Validation);
    assert!(lifecycle
        .list_tasks(None)
        .await
        .expect("list tasks")
        .is_empty());
}
