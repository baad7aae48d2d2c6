//! Diesel row models for webhook persistence.

use super::schema::{webhook_batches, webhook_conversions, webhooks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Row model for webhooks, used for reads and inserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = webhooks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WebhookRow {
    /// Internal webhook identifier.
    pub id: uuid::Uuid,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Bound counter.
    pub counter_id: i64,
    /// Token used for uploads.
    pub token: String,
    /// Secret digest.
    pub secret_digest: Vec<u8>,
    /// Whether deliveries are accepted.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Row model for batches, used for reads and inserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = webhook_batches)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BatchRow {
    /// Internal batch identifier.
    pub id: uuid::Uuid,
    /// Owning webhook.
    pub webhook_id: uuid::Uuid,
    /// Counter the conversions are sent to.
    pub counter_id: i64,
    /// Aggregate status.
    pub status: String,
    /// Number of conversions.
    pub total: i32,
    /// Conversions no longer pending.
    pub processed: i32,
    /// First remote upload reference.
    pub metrika_upload_id: Option<i64>,
    /// Failure details.
    pub errors: Option<Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Columns rewritten by aggregate recomputation.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = webhook_batches)]
#[diesel(treat_none_as_null = true)]
pub struct BatchAggregateChangeset {
    /// Aggregate status.
    pub status: String,
    /// Number of conversions.
    pub total: i32,
    /// Conversions no longer pending.
    pub processed: i32,
    /// First remote upload reference.
    pub metrika_upload_id: Option<i64>,
    /// Failure details.
    pub errors: Option<Value>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Row model for webhook conversions, used for reads and inserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = webhook_conversions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ConversionRow {
    /// Internal conversion identifier.
    pub id: uuid::Uuid,
    /// Owning batch.
    pub batch_id: uuid::Uuid,
    /// Position in the delivery.
    pub position: i32,
    /// Metrika client identifier.
    pub client_id: Option<String>,
    /// Site-assigned user identifier.
    pub user_id: Option<String>,
    /// Ad click identifier.
    pub yclid: Option<String>,
    /// Purchase identifier.
    pub purchase_id: Option<String>,
    /// Goal name.
    pub target: String,
    /// When the conversion happened.
    pub date_time: DateTime<Utc>,
    /// Goal value.
    pub price: Option<f64>,
    /// ISO 4217 currency.
    pub currency: Option<String>,
    /// Delivery status.
    pub status: String,
    /// Failure detail.
    pub error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Columns changed by dispatch.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = webhook_conversions)]
#[diesel(treat_none_as_null = true)]
pub struct ConversionStatusChangeset {
    /// Delivery status.
    pub status: String,
    /// Failure detail.
    pub error: Option<String>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Activation change for a webhook.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = webhooks)]
pub struct WebhookActivationChangeset {
    /// Whether deliveries are accepted.
    pub is_active: bool,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
