//! Given steps for task result BDD scenarios.

use super::world::{TaskResultWorld, run_async};
use chrono::NaiveDate;
use eyre::WrapErr;
use metrika_score::task::{domain::ScoredVisit, services::CreateTaskRequest};
use rstest_bdd_macros::given;

#[given(r#"a scoring task for date "{date}" and counter {counter:i64}"#)]
fn scoring_task(
    world: &mut TaskResultWorld,
    date: String,
    counter: i64,
) -> Result<(), eyre::Report> {
    let task = run_async(
        world
            .lifecycle
            .create_task(CreateTaskRequest::new(date, counter, "y0_scenario_token")),
    )
    .wrap_err("create scoring task")?;
    world.task = Some(task);
    Ok(())
}

#[given("the worker reports progress {percent:i64}")]
fn worker_reports_progress(
    world: &mut TaskResultWorld,
    percent: i64,
) -> Result<(), eyre::Report> {
    let id = world.task()?.id();
    let task = run_async(
        world
            .lifecycle
            .update_progress(id, percent, format!("{percent}% done")),
    )
    .wrap_err("report progress")?;
    world.task = Some(task);
    Ok(())
}

#[given("the worker finishes with {count:u32} scored visits")]
fn worker_finishes(world: &mut TaskResultWorld, count: u32) -> Result<(), eyre::Report> {
    let id = world.task()?.id();
    let start = NaiveDate::from_ymd_opt(2025, 7, 1)
        .and_then(|day| day.and_hms_opt(9, 0, 0))
        .ok_or_else(|| eyre::eyre!("invalid fixture timestamp"))?;
    let visits = (0..count)
        .map(|index| ScoredVisit {
            visit_id: format!("visit-{index}"),
            client_id: format!("client-{index}"),
            date_time: start + chrono::Duration::seconds(i64::from(index)),
            visit_duration: 200,
        })
        .collect();
    let task = run_async(world.lifecycle.complete(id, visits)).wrap_err("complete task")?;
    world.task = Some(task);
    Ok(())
}
