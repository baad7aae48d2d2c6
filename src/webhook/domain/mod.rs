//! Domain model for webhook-delivered conversions.
//!
//! A webhook authenticates deliveries with a secret it only stores as a
//! digest. Each delivery becomes a batch of conversions whose aggregate
//! status is derived from the conversions themselves.

mod batch;
mod conversion;
mod error;
mod ids;
mod secret;
mod webhook;

pub use batch::{BatchAggregate, BatchStatus, PersistedBatchData, WebhookBatch};
pub use conversion::{
    ConversionPayload, ConversionStatus, PersistedConversionData, WebhookConversion,
};
pub use error::{ParseWebhookStatusError, WebhookDomainError};
pub use ids::{BatchId, WebhookConversionId, WebhookId};
pub use secret::{SECRET_LENGTH, SecretDigest, WebhookSecret};
pub use webhook::{CALLBACK_PATH, PersistedWebhookData, Webhook};
