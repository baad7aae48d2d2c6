//! Shared world state for webhook batch BDD scenarios.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrika_score::conversion::adapters::memory::ScriptedReportingApi;
use metrika_score::webhook::{
    adapters::memory::{InMemoryBatchRepository, InMemoryWebhookRegistry},
    domain::{ConversionPayload, WebhookBatch},
    services::{
        BatchAcceptance, BatchDispatcher, CreatedWebhook, WebhookIngestionService,
        WebhookRegistrationService, WebhookServiceError, WebhookServiceResult,
    },
};
use mockable::DefaultClock;
use rstest::fixture;
use tokio::task::JoinHandle;

/// Registration service type used by the BDD world.
pub type TestRegistration = WebhookRegistrationService<InMemoryWebhookRegistry, DefaultClock>;

/// Ingestion service type used by the BDD world.
pub type TestIngestion = WebhookIngestionService<
    InMemoryWebhookRegistry,
    InMemoryBatchRepository,
    ScriptedReportingApi,
    DefaultClock,
>;

/// Scenario world for webhook batch behaviour tests.
pub struct WebhookBatchWorld {
    pub registration: Arc<TestRegistration>,
    pub ingestion: TestIngestion,
    pub api: Arc<ScriptedReportingApi>,
    pub webhook: Option<CreatedWebhook>,
    pub acceptance: Option<BatchAcceptance>,
    pub batch: Option<WebhookBatch>,
    pub dispatch: Option<JoinHandle<WebhookServiceResult<WebhookBatch>>>,
    pub delivery_error: Option<WebhookServiceError>,
}

impl WebhookBatchWorld {
    /// Creates a world backed by fresh in-memory stores.
    #[must_use]
    pub fn new() -> Self {
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
            2,
        ));
        Self {
            ingestion: WebhookIngestionService::new(
                Arc::clone(&registration),
                batches,
                dispatcher,
                clock,
            ),
            registration,
            api,
            webhook: None,
            acceptance: None,
            batch: None,
            dispatch: None,
            delivery_error: None,
        }
    }

    /// Returns the webhook registered by the scenario.
    ///
    /// # Errors
    ///
    /// Returns an error when no webhook has been registered yet.
    pub fn webhook(&self) -> Result<&CreatedWebhook, eyre::Report> {
        self.webhook
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing webhook in scenario world"))
    }
}

impl Default for WebhookBatchWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> WebhookBatchWorld {
    WebhookBatchWorld::default()
}

/// Builds a purchase conversion for `client_id`.
#[must_use]
pub fn purchase_for(client_id: &str) -> ConversionPayload {
    ConversionPayload {
        client_id: Some(client_id.to_owned()),
        target: "purchase".to_owned(),
        date_time: DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_000),
        ..ConversionPayload::default()
    }
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
