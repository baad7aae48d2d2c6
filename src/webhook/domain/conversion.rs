//! Individual conversions delivered through a webhook.

use super::{BatchId, ParseWebhookStatusError, WebhookConversionId, WebhookDomainError};
use crate::conversion::domain::{ConversionDomainError, ConversionEvent, ConversionIdentity};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery status of one webhook conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    /// Stored, not yet sent.
    Pending,
    /// Accepted by the reporting API.
    Sent,
    /// Sending failed.
    Error,
}

impl ConversionStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ConversionStatus {
    type Error = ParseWebhookStatusError;

    fn try_from(value: &str) -> Result<Self, ParseWebhookStatusError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "error" => Ok(Self::Error),
            _ => Err(ParseWebhookStatusError(value.to_owned())),
        }
    }
}

/// One conversion as posted by the integrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionPayload {
    /// Metrika client identifier.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Site-assigned user identifier.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Ad click identifier.
    #[serde(default)]
    pub yclid: Option<String>,
    /// Purchase identifier.
    #[serde(default)]
    pub purchase_id: Option<String>,
    /// Goal name.
    #[serde(default)]
    pub target: String,
    /// When the conversion happened.
    pub date_time: DateTime<Utc>,
    /// Optional goal value.
    #[serde(default)]
    pub price: Option<f64>,
    /// Optional ISO 4217 currency of `price`.
    #[serde(default)]
    pub currency: Option<String>,
}

impl ConversionPayload {
    /// Validates the payload into a conversion event.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionDomainError`] when no identity is present or any
    /// field is malformed.
    pub fn into_event(self) -> Result<ConversionEvent, ConversionDomainError> {
        let identity = ConversionIdentity {
            client_id: self.client_id,
            user_id: self.user_id,
            yclid: self.yclid,
            purchase_id: self.purchase_id,
        };
        ConversionEvent::new(
            identity,
            &self.target,
            self.date_time,
            self.price,
            self.currency.as_deref(),
        )
    }
}

/// A stored conversion inside a webhook batch.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookConversion {
    id: WebhookConversionId,
    batch_id: BatchId,
    event: ConversionEvent,
    status: ConversionStatus,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted webhook conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedConversionData {
    /// Persisted conversion identifier.
    pub id: WebhookConversionId,
    /// Owning batch.
    pub batch_id: BatchId,
    /// Validated event.
    pub event: ConversionEvent,
    /// Delivery status.
    pub status: ConversionStatus,
    /// Failure detail, if any.
    pub error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl WebhookConversion {
    /// Creates a pending conversion in `batch_id`.
    #[must_use]
    pub fn new(batch_id: BatchId, event: ConversionEvent, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: WebhookConversionId::new(),
            batch_id,
            event,
            status: ConversionStatus::Pending,
            error: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a conversion from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedConversionData) -> Self {
        Self {
            id: data.id,
            batch_id: data.batch_id,
            event: data.event,
            status: data.status,
            error: data.error,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the conversion identifier.
    #[must_use]
    pub const fn id(&self) -> WebhookConversionId {
        self.id
    }

    /// Returns the owning batch.
    #[must_use]
    pub const fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    /// Returns the validated event.
    #[must_use]
    pub const fn event(&self) -> &ConversionEvent {
        &self.event
    }

    /// Returns the delivery status.
    #[must_use]
    pub const fn status(&self) -> ConversionStatus {
        self.status
    }

    /// Returns the failure detail, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Marks the conversion as accepted by the reporting API.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookDomainError::InvalidTransition`] unless pending.
    pub fn mark_sent(&mut self, clock: &impl Clock) -> Result<(), WebhookDomainError> {
        self.ensure_pending()?;
        self.status = ConversionStatus::Sent;
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Marks the conversion as failed.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookDomainError::InvalidTransition`] unless pending.
    pub fn mark_failed(
        &mut self,
        detail: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), WebhookDomainError> {
        self.ensure_pending()?;
        self.status = ConversionStatus::Error;
        self.error = Some(detail.into());
        self.updated_at = clock.utc();
        Ok(())
    }

    const fn ensure_pending(&self) -> Result<(), WebhookDomainError> {
        match self.status {
            ConversionStatus::Pending => Ok(()),
            status => Err(WebhookDomainError::InvalidTransition {
                conversion_id: self.id,
                status,
            }),
        }
    }
}
