//! Then steps for webhook batch BDD scenarios.

use super::world::WebhookBatchWorld;
use metrika_score::error::ErrorKind;
use metrika_score::webhook::domain::BatchStatus;
use rstest_bdd_macros::then;

fn expected_status(status: &str) -> Result<BatchStatus, eyre::Report> {
    BatchStatus::try_from(status)
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))
}

#[then(r#"the batch is accepted with {count:u32} conversions and status "{status}""#)]
fn batch_accepted(
    world: &WebhookBatchWorld,
    count: u32,
    status: String,
) -> Result<(), eyre::Report> {
    let acceptance = world
        .acceptance
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing acceptance"))?;
    eyre::ensure!(acceptance.status == "accepted");
    eyre::ensure!(acceptance.accepted_count == count);

    let batch = world
        .batch
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing batch"))?;
    eyre::ensure!(batch.total() == count, "batch total is {}", batch.total());
    eyre::ensure!(
        batch.status() == expected_status(&status)?,
        "batch status is {}",
        batch.status()
    );
    Ok(())
}

#[then(r#"the batch status is "{status}" with {processed:u32} processed"#)]
fn batch_status_is(
    world: &WebhookBatchWorld,
    status: String,
    processed: u32,
) -> Result<(), eyre::Report> {
    let batch = world
        .batch
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing batch"))?;
    eyre::ensure!(
        batch.status() == expected_status(&status)?,
        "batch status is {}",
        batch.status()
    );
    eyre::ensure!(
        batch.processed() == processed,
        "batch processed is {}",
        batch.processed()
    );
    Ok(())
}

#[then("the batch records an upload reference")]
fn batch_records_reference(world: &WebhookBatchWorld) -> Result<(), eyre::Report> {
    let batch = world
        .batch
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing batch"))?;
    eyre::ensure!(
        batch.metrika_upload_id().is_some(),
        "expected an upload reference on the batch"
    );
    Ok(())
}

#[then("the delivery is rejected as unauthorized")]
fn delivery_unauthorized(world: &WebhookBatchWorld) -> Result<(), eyre::Report> {
    let err = world
        .delivery_error
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected the delivery to be rejected"))?;
    eyre::ensure!(
        err.kind() == ErrorKind::Unauthorized,
        "expected unauthorized, got {err}"
    );
    eyre::ensure!(world.api.submissions().is_empty());
    Ok(())
}
