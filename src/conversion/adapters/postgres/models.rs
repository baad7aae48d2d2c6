//! Diesel row models for conversion upload persistence.

use super::schema::conversion_uploads;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Row model for conversion uploads, used for reads and inserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = conversion_uploads)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UploadRow {
    /// Internal upload identifier.
    pub id: uuid::Uuid,
    /// Task the rows came from.
    pub task_id: Option<uuid::Uuid>,
    /// Target counter.
    pub counter_id: i64,
    /// Goal name.
    pub target: String,
    /// API token.
    pub token: String,
    /// Lifecycle status.
    pub status: String,
    /// Rows sent.
    pub total: i32,
    /// Rows processed remotely.
    pub processed: i32,
    /// Error details.
    pub errors: Option<Value>,
    /// Remote upload identifier.
    pub external_id: Option<i64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Columns changed by submission and reconciliation.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = conversion_uploads)]
#[diesel(treat_none_as_null = true)]
pub struct UploadChangeset {
    /// Lifecycle status.
    pub status: String,
    /// Rows processed remotely.
    pub processed: i32,
    /// Error details.
    pub errors: Option<Value>,
    /// Remote upload identifier.
    pub external_id: Option<i64>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
