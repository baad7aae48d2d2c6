//! `PostgreSQL` adapter for webhook, batch, and conversion persistence.

mod models;
mod repository;
mod schema;

pub use repository::{PostgresBatchRepository, PostgresWebhookRegistry};
