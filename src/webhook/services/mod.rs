//! Application services for webhook registration, ingestion, and dispatch.

mod dispatcher;
mod error;
mod ingestion;
mod registration;

pub use dispatcher::BatchDispatcher;
pub use error::{WebhookServiceError, WebhookServiceResult};
pub use ingestion::{BatchAcceptance, IngestedBatch, WebhookIngestionService};
pub use registration::{CreateWebhookRequest, CreatedWebhook, WebhookRegistrationService};
