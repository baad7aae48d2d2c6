//! Then steps for task result BDD scenarios.

use super::world::TaskResultWorld;
use metrika_score::error::ErrorKind;
use metrika_score::task::domain::TaskStatus;
use rstest_bdd_macros::then;

#[then("the task is finished with progress {progress:u8}")]
fn task_finished(world: &TaskResultWorld, progress: u8) -> Result<(), eyre::Report> {
    let task = world.task()?;
    eyre::ensure!(
        task.status() == TaskStatus::Finished,
        "expected finished task, found {}",
        task.status().as_str()
    );
    eyre::ensure!(task.progress() == progress, "unexpected progress {}", task.progress());
    Ok(())
}

#[then(r#"the page holds {count:usize} visits starting at "{first}""#)]
fn page_holds(world: &TaskResultWorld, count: usize, first: String) -> Result<(), eyre::Report> {
    let page = world
        .page
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing result page"))?;
    eyre::ensure!(page.data.len() == count, "page has {} rows", page.data.len());
    let leading = page
        .data
        .first()
        .ok_or_else(|| eyre::eyre!("page is empty"))?;
    eyre::ensure!(leading.visit_id == first, "page starts at {}", leading.visit_id);
    Ok(())
}

#[then("the pagination reports a total of {total:usize} with more rows remaining")]
fn pagination_reports(world: &TaskResultWorld, total: usize) -> Result<(), eyre::Report> {
    let page = world
        .page
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing result page"))?;
    eyre::ensure!(page.pagination.total == total, "total is {}", page.pagination.total);
    eyre::ensure!(page.pagination.has_more, "expected more rows after this page");
    Ok(())
}

#[then("the upload fails as not ready")]
fn upload_not_ready(world: &TaskResultWorld) -> Result<(), eyre::Report> {
    let result = world
        .upload_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing upload result"))?;
    let Err(err) = result else {
        return Err(eyre::eyre!("expected the upload to fail, got {result:?}"));
    };
    let kind = err.kind();
    eyre::ensure!(kind == ErrorKind::NotReady, "expected not ready, got {kind}");
    Ok(())
}

#[then("nothing was sent to the reporting API")]
fn nothing_sent(world: &TaskResultWorld) -> Result<(), eyre::Report> {
    eyre::ensure!(
        world.api.submissions().is_empty(),
        "reporting API received {} submissions",
        world.api.submissions().len()
    );
    Ok(())
}
