//! Diesel row models for task persistence.

use super::schema::{task_results, tasks};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Internal task identifier.
    pub id: uuid::Uuid,
    /// Day whose visits are scored.
    pub date: NaiveDate,
    /// Analytics counter identifier.
    pub counter_id: i64,
    /// API token.
    pub token: String,
    /// Lifecycle status.
    pub status: String,
    /// Progress percentage.
    pub progress: i16,
    /// Last reported step.
    pub message: String,
    /// Failure description.
    pub error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// First running timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Terminal status timestamp.
    pub finished_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    /// Internal task identifier.
    pub id: uuid::Uuid,
    /// Day whose visits are scored.
    pub date: NaiveDate,
    /// Analytics counter identifier.
    pub counter_id: i64,
    /// API token.
    pub token: String,
    /// Lifecycle status.
    pub status: String,
    /// Progress percentage.
    pub progress: i16,
    /// Last reported step.
    pub message: String,
    /// Failure description.
    pub error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// First running timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Terminal status timestamp.
    pub finished_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Mutable lifecycle columns written on every task update.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskLifecycleChangeset {
    /// Lifecycle status.
    pub status: String,
    /// Progress percentage.
    pub progress: i16,
    /// Last reported step.
    pub message: String,
    /// Failure description.
    pub error: Option<String>,
    /// First running timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Terminal status timestamp.
    pub finished_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Row model for stored task results.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = task_results)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskResultRow {
    /// Owning task identifier.
    pub task_id: uuid::Uuid,
    /// Ordered scored visits.
    pub visits: Value,
    /// Number of stored visits.
    pub total: i32,
    /// Write timestamp.
    pub created_at: DateTime<Utc>,
}
