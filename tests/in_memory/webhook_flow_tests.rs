//! In-memory integration tests for webhook deliveries.

use std::sync::Arc;

use super::helpers::{COUNTER, TOKEN};
use chrono::{DateTime, Utc};
use metrika_score::conversion::{adapters::memory::ScriptedReportingApi, ports::ReportingApiError};
use metrika_score::error::{ErrorKind, PipelineError};
use metrika_score::webhook::{
    adapters::memory::{InMemoryBatchRepository, InMemoryWebhookRegistry},
    domain::{BatchStatus, ConversionPayload, ConversionStatus},
    services::{
        BatchDispatcher, CreateWebhookRequest, CreatedWebhook, WebhookIngestionService,
        WebhookRegistrationService,
    },
};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

type Registration = WebhookRegistrationService<InMemoryWebhookRegistry, DefaultClock>;

struct Deliveries {
    registration: Arc<Registration>,
    ingestion: WebhookIngestionService<
        InMemoryWebhookRegistry,
        InMemoryBatchRepository,
        ScriptedReportingApi,
        DefaultClock,
    >,
    api: Arc<ScriptedReportingApi>,
}

#[fixture]
fn deliveries() -> Deliveries {
    let clock = Arc::new(DefaultClock);
    let batches = Arc::new(InMemoryBatchRepository::new());
    let api = Arc::new(ScriptedReportingApi::new());
    let registration = Arc::new(WebhookRegistrationService::new(
        Arc::new(InMemoryWebhookRegistry::new()),
        Arc::clone(&clock),
        "https://scores.example.com",
    ));
    let dispatcher = Arc::new(BatchDispatcher::new(
        Arc::clone(&batches),
        Arc::clone(&api),
        Arc::clone(&clock),
        4,
    ));
    Deliveries {
        ingestion: WebhookIngestionService::new(
            Arc::clone(&registration),
            batches,
            dispatcher,
            clock,
        ),
        registration,
        api,
    }
}

fn happened_at() -> DateTime<Utc> {
    DateTime::from_timestamp(1_751_364_000, 0).expect("valid timestamp")
}

async fn register(deliveries: &Deliveries) -> eyre::Result<CreatedWebhook> {
    Ok(deliveries
        .registration
        .create_webhook(CreateWebhookRequest {
            name: "Shop backend".to_owned(),
            counter: COUNTER,
            token: TOKEN.to_owned(),
            description: Some("orders".to_owned()),
        })
        .await?)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn every_identity_kind_is_delivered(deliveries: Deliveries) -> eyre::Result<()> {
    let created = register(&deliveries).await?;
    let payloads = vec![
        ConversionPayload {
            user_id: Some("user-7".to_owned()),
            target: "lead".to_owned(),
            date_time: happened_at(),
            ..ConversionPayload::default()
        },
        ConversionPayload {
            purchase_id: Some("order-99".to_owned()),
            target: "purchase".to_owned(),
            date_time: happened_at(),
            price: Some(1499.0),
            currency: Some("RUB".to_owned()),
            ..ConversionPayload::default()
        },
    ];

    let ingested = deliveries
        .ingestion
        .ingest_batch(created.webhook.id(), Some(created.secret.expose()), payloads)
        .await?;
    let batch = ingested.dispatch.await??;
    eyre::ensure!(batch.status() == BatchStatus::Completed);
    eyre::ensure!(batch.processed() == 2);
    eyre::ensure!(batch.errors().is_none());

    let conversions = deliveries
        .ingestion
        .list_batch_conversions(
            created.webhook.id(),
            batch.id(),
            Some(created.secret.expose()),
        )
        .await?;
    eyre::ensure!(conversions
        .iter()
        .all(|conversion| conversion.status() == ConversionStatus::Sent));

    let types: Vec<&str> = deliveries
        .api
        .submissions()
        .iter()
        .map(|submission| submission.client_id_type)
        .collect();
    eyre::ensure!(types.len() == 2);
    eyre::ensure!(types.contains(&"USER_ID"));
    eyre::ensure!(types.contains(&"PURCHASE_ID"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn all_failures_leave_batch_in_error(deliveries: Deliveries) -> eyre::Result<()> {
    let created = register(&deliveries).await?;
    deliveries.api.reject_content(
        "purchase",
        ReportingApiError::Transport("connection reset".to_owned()),
    );
    let payloads = (0..3)
        .map(|index| ConversionPayload {
            client_id: Some(format!("client-{index}")),
            target: "purchase".to_owned(),
            date_time: happened_at(),
            ..ConversionPayload::default()
        })
        .collect();

    let ingested = deliveries
        .ingestion
        .ingest_batch(created.webhook.id(), Some(created.secret.expose()), payloads)
        .await?;
    let batch = ingested.dispatch.await??;
    eyre::ensure!(batch.status() == BatchStatus::Error);
    eyre::ensure!(batch.processed() == 3);
    eyre::ensure!(batch.metrika_upload_id().is_none());
    eyre::ensure!(batch.errors().is_some_and(|errors| errors.len() == 3));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deactivated_webhook_rejects_deliveries(deliveries: Deliveries) -> eyre::Result<()> {
    let created = register(&deliveries).await?;
    deliveries.registration.deactivate(created.webhook.id()).await?;

    let err = deliveries
        .ingestion
        .ingest_batch(
            created.webhook.id(),
            Some(created.secret.expose()),
            vec![ConversionPayload {
                client_id: Some("client".to_owned()),
                target: "purchase".to_owned(),
                date_time: happened_at(),
                ..ConversionPayload::default()
            }],
        )
        .await
        .expect_err("inactive webhook rejected");
    eyre::ensure!(PipelineError::from(err).kind() == ErrorKind::Unauthorized);
    eyre::ensure!(deliveries.api.submissions().is_empty());
    Ok(())
}
