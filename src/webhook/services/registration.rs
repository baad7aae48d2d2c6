//! Webhook registration, authentication, and deactivation.

use super::error::{WebhookServiceError, WebhookServiceResult};
use crate::counter::{ApiToken, CounterId};
use crate::webhook::{
    domain::{Webhook, WebhookDomainError, WebhookId, WebhookSecret},
    ports::WebhookRegistry,
};
use mockable::Clock;
use std::sync::Arc;

/// Request to register a webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWebhookRequest {
    /// Display name.
    pub name: String,
    /// Counter conversions are sent to.
    pub counter: i64,
    /// Token used for uploads.
    pub token: String,
    /// Optional description.
    pub description: Option<String>,
}

/// A newly registered webhook with its one-time secret.
#[derive(Debug, Clone)]
pub struct CreatedWebhook {
    /// Stored webhook.
    pub webhook: Webhook,
    /// Plaintext secret; it cannot be retrieved again.
    pub secret: WebhookSecret,
    /// URL integrators post deliveries to.
    pub callback_url: String,
}

/// Owns webhook registrations.
#[derive(Clone)]
pub struct WebhookRegistrationService<W, C>
where
    W: WebhookRegistry,
    C: Clock + Send + Sync,
{
    registry: Arc<W>,
    clock: Arc<C>,
    public_base_url: String,
}

impl<W, C> WebhookRegistrationService<W, C>
where
    W: WebhookRegistry,
    C: Clock + Send + Sync,
{
    /// Creates a registration service building callback URLs under
    /// `public_base_url`.
    #[must_use]
    pub fn new(registry: Arc<W>, clock: Arc<C>, public_base_url: impl Into<String>) -> Self {
        Self {
            registry,
            clock,
            public_base_url: public_base_url.into(),
        }
    }

    /// Registers an active webhook and returns its secret once.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name, a non-positive counter,
    /// or an empty token.
    pub async fn create_webhook(
        &self,
        request: CreateWebhookRequest,
    ) -> WebhookServiceResult<CreatedWebhook> {
        let counter = CounterId::new(request.counter).map_err(WebhookDomainError::from)?;
        let token = ApiToken::new(request.token).map_err(WebhookDomainError::from)?;
        let (webhook, secret) = Webhook::register(
            &request.name,
            request.description,
            counter,
            token,
            &*self.clock,
        )?;
        self.registry.store(&webhook).await?;
        tracing::info!(
            webhook_id = %webhook.id(),
            counter_id = %counter,
            name = webhook.name(),
            "webhook registered"
        );
        Ok(CreatedWebhook {
            callback_url: webhook.callback_url(&self.public_base_url),
            webhook,
            secret,
        })
    }

    /// Returns the webhook when `supplied` matches its secret.
    ///
    /// Unknown webhooks are reported as unauthorized so callers cannot enumerate
    /// registered identifiers.
    ///
    /// # Errors
    ///
    /// Returns an unauthorized error for a missing or wrong secret, an
    /// inactive webhook, or an unknown identifier.
    pub async fn authenticate(
        &self,
        id: WebhookId,
        supplied: Option<&str>,
    ) -> WebhookServiceResult<Webhook> {
        let Some(webhook) = self.registry.find_by_id(id).await? else {
            tracing::warn!(webhook_id = %id, "delivery for unknown webhook rejected");
            return Err(WebhookDomainError::Unauthorized.into());
        };
        if let Err(err) = webhook.authenticate(supplied) {
            tracing::warn!(webhook_id = %id, active = webhook.is_active(), "webhook authentication failed");
            return Err(err.into());
        }
        Ok(webhook)
    }

    /// Stops a webhook from accepting deliveries.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown webhooks.
    pub async fn deactivate(&self, id: WebhookId) -> WebhookServiceResult<Webhook> {
        let mut webhook = self
            .registry
            .find_by_id(id)
            .await?
            .ok_or(WebhookServiceError::WebhookNotFound(id))?;
        webhook.deactivate(&*self.clock);
        self.registry.update(&webhook).await?;
        tracing::info!(webhook_id = %id, "webhook deactivated");
        Ok(webhook)
    }
}
