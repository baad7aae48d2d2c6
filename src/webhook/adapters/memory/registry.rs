//! In-memory webhook registry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::webhook::{
    domain::{Webhook, WebhookId},
    ports::{WebhookRegistry, WebhookRepositoryError, WebhookRepositoryResult},
};

/// Thread-safe in-memory webhook registry.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWebhookRegistry {
    webhooks: Arc<RwLock<HashMap<WebhookId, Webhook>>>,
}

impl InMemoryWebhookRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> WebhookRepositoryError {
    WebhookRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl WebhookRegistry for InMemoryWebhookRegistry {
    async fn store(&self, webhook: &Webhook) -> WebhookRepositoryResult<()> {
        let mut webhooks = self.webhooks.write().map_err(poisoned)?;
        if webhooks.contains_key(&webhook.id()) {
            return Err(WebhookRepositoryError::DuplicateWebhook(webhook.id()));
        }
        webhooks.insert(webhook.id(), webhook.clone());
        Ok(())
    }

    async fn update(&self, webhook: &Webhook) -> WebhookRepositoryResult<()> {
        let mut webhooks = self.webhooks.write().map_err(poisoned)?;
        let stored = webhooks
            .get_mut(&webhook.id())
            .ok_or(WebhookRepositoryError::WebhookNotFound(webhook.id()))?;
        *stored = webhook.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: WebhookId) -> WebhookRepositoryResult<Option<Webhook>> {
        let webhooks = self.webhooks.read().map_err(poisoned)?;
        Ok(webhooks.get(&id).cloned())
    }
}
