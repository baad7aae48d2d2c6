//! `PostgreSQL` adapter for conversion upload persistence.

mod models;
mod repository;
mod schema;

pub use repository::PostgresUploadRepository;
