//! When steps for webhook batch BDD scenarios.

use super::world::{WebhookBatchWorld, purchase_for, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when(r#"a batch for clients "{first}" and "{second}" is delivered"#)]
fn batch_delivered(
    world: &mut WebhookBatchWorld,
    first: String,
    second: String,
) -> Result<(), eyre::Report> {
    let webhook = world.webhook()?;
    let ingested = run_async(world.ingestion.ingest_batch(
        webhook.webhook.id(),
        Some(webhook.secret.expose()),
        vec![purchase_for(&first), purchase_for(&second)],
    ))
    .wrap_err("ingest batch")?;
    world.acceptance = Some(ingested.acceptance);
    world.batch = Some(ingested.batch);
    world.dispatch = Some(ingested.dispatch);
    Ok(())
}

#[when(r#"a delivery signed with the wrong secret carries clients "{first}" and "{second}""#)]
fn batch_delivered_with_wrong_secret(
    world: &mut WebhookBatchWorld,
    first: String,
    second: String,
) -> Result<(), eyre::Report> {
    let webhook_id = world.webhook()?.webhook.id();
    let result = run_async(world.ingestion.ingest_batch(
        webhook_id,
        Some("not-the-secret"),
        vec![purchase_for(&first), purchase_for(&second)],
    ));
    world.delivery_error = result.err();
    Ok(())
}

#[when("dispatch of the batch completes")]
fn dispatch_completes(world: &mut WebhookBatchWorld) -> Result<(), eyre::Report> {
    let handle = world
        .dispatch
        .take()
        .ok_or_else(|| eyre::eyre!("missing dispatch handle"))?;
    let batch = run_async(handle)
        .wrap_err("join dispatch")?
        .wrap_err("dispatch batch")?;
    world.batch = Some(batch);
    Ok(())
}
