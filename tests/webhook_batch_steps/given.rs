//! Given steps for webhook batch BDD scenarios.

use super::world::{WebhookBatchWorld, run_async};
use eyre::WrapErr;
use metrika_score::conversion::ports::ReportingApiError;
use metrika_score::webhook::services::CreateWebhookRequest;
use rstest_bdd_macros::given;

#[given("a webhook registered for counter {counter:i64}")]
fn webhook_registered(world: &mut WebhookBatchWorld, counter: i64) -> Result<(), eyre::Report> {
    let created = run_async(world.registration.create_webhook(CreateWebhookRequest {
        name: "CRM".to_owned(),
        counter,
        token: "y0_scenario_token".to_owned(),
        description: None,
    }))
    .wrap_err("register webhook")?;
    world.webhook = Some(created);
    Ok(())
}

#[given(r#"the reporting API rejects conversions for client "{client_id}""#)]
fn api_rejects_client(world: &mut WebhookBatchWorld, client_id: String) {
    world.api.reject_content(
        client_id,
        ReportingApiError::Api {
            status: 400,
            body: "unknown ClientId".to_owned(),
        },
    );
}
