//! Registered inbound webhook aggregate.

use super::{SecretDigest, WebhookDomainError, WebhookId, WebhookSecret};
use crate::counter::{ApiToken, CounterId};
use chrono::{DateTime, Utc};
use mockable::Clock;

/// Path prefix under which webhook callbacks are served.
pub const CALLBACK_PATH: &str = "/webhook/offline-conversions";

/// An inbound endpoint through which a third party delivers conversions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Webhook {
    id: WebhookId,
    name: String,
    description: Option<String>,
    counter: CounterId,
    token: ApiToken,
    secret_digest: SecretDigest,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedWebhookData {
    /// Persisted webhook identifier.
    pub id: WebhookId,
    /// Display name.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Bound counter.
    pub counter: CounterId,
    /// Token used for uploads.
    pub token: ApiToken,
    /// Stored secret digest.
    pub secret_digest: SecretDigest,
    /// Whether deliveries are accepted.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    /// Registers a webhook and generates its secret.
    ///
    /// The returned secret is the only copy of the plaintext; the webhook
    /// keeps only its digest.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookDomainError::EmptyName`] for a blank name.
    pub fn register(
        name: &str,
        description: Option<String>,
        counter: CounterId,
        token: ApiToken,
        clock: &impl Clock,
    ) -> Result<(Self, WebhookSecret), WebhookDomainError> {
        let trimmed_name = name.trim();
        if trimmed_name.is_empty() {
            return Err(WebhookDomainError::EmptyName);
        }
        let id = WebhookId::new();
        let secret = WebhookSecret::generate();
        let timestamp = clock.utc();
        let webhook = Self {
            id,
            name: trimmed_name.to_owned(),
            description: description
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty()),
            counter,
            token,
            secret_digest: secret.digest_for(id),
            is_active: true,
            created_at: timestamp,
            updated_at: timestamp,
        };
        Ok((webhook, secret))
    }

    /// Reconstructs a webhook from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedWebhookData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            description: data.description,
            counter: data.counter,
            token: data.token,
            secret_digest: data.secret_digest,
            is_active: data.is_active,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the webhook identifier.
    #[must_use]
    pub const fn id(&self) -> WebhookId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the bound counter.
    #[must_use]
    pub const fn counter(&self) -> CounterId {
        self.counter
    }

    /// Returns the token used for uploads.
    #[must_use]
    pub const fn token(&self) -> &ApiToken {
        &self.token
    }

    /// Returns the stored secret digest.
    #[must_use]
    pub const fn secret_digest(&self) -> &SecretDigest {
        &self.secret_digest
    }

    /// Returns whether deliveries are accepted.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
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

    /// Builds the callback URL integrators post deliveries to.
    #[must_use]
    pub fn callback_url(&self, public_base_url: &str) -> String {
        format!(
            "{}{CALLBACK_PATH}/{}",
            public_base_url.trim_end_matches('/'),
            self.id
        )
    }

    /// Verifies a supplied secret.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookDomainError::Unauthorized`] when the webhook is
    /// inactive or the secret is missing or wrong.
    pub fn authenticate(&self, supplied: Option<&str>) -> Result<(), WebhookDomainError> {
        let verified = supplied.is_some_and(|secret| self.secret_digest.verify(self.id, secret));
        if self.is_active && verified {
            Ok(())
        } else {
            Err(WebhookDomainError::Unauthorized)
        }
    }

    /// Stops accepting deliveries. Deactivation is permanent.
    pub fn deactivate(&mut self, clock: &impl Clock) {
        if self.is_active {
            self.is_active = false;
            self.updated_at = clock.utc();
        }
    }
}
