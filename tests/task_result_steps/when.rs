//! When steps for task result BDD scenarios.

use super::world::{TaskResultWorld, run_async};
use eyre::WrapErr;
use metrika_score::conversion::services::TaskUploadRequest;
use metrika_score::task::domain::PageRequest;
use rstest_bdd_macros::when;

#[when("the result is requested with limit {limit:i64} and offset {offset:i64}")]
fn result_requested(
    world: &mut TaskResultWorld,
    limit: i64,
    offset: i64,
) -> Result<(), eyre::Report> {
    let id = world.task()?.id();
    let request = PageRequest::new(limit, offset).wrap_err("build page request")?;
    let page = run_async(world.lifecycle.get_result(id, request)).wrap_err("read result page")?;
    world.page = Some(page);
    Ok(())
}

#[when(r#"the task result is uploaded as target "{target}""#)]
fn result_uploaded(world: &mut TaskResultWorld, target: String) -> Result<(), eyre::Report> {
    let task = world.task()?;
    let request = TaskUploadRequest {
        task_id: task.id(),
        target,
        counter: task.params().counter().as_i64(),
        token: task.params().token().expose().to_owned(),
    };
    world.upload_result = Some(run_async(world.coordinator.upload_from_task(request)));
    Ok(())
}
