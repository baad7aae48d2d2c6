//! Visit scoring and offline conversion pipeline for Metrika counters.
//!
//! The crate downloads raw visit logs for a counter and day, keeps the
//! visits that qualify as highly engaged, and reports them back to the
//! analytics service as offline conversions. Third-party systems can push
//! their own conversions through authenticated webhooks.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, APIs, etc.)
//! - **Services**: Orchestration over ports with an injected clock
//!
//! # Modules
//!
//! - [`task`]: Scoring tasks, their lifecycle, and the scoring worker
//! - [`conversion`]: Conversion files, uploads, and status reconciliation
//! - [`webhook`]: Webhook registration, batch ingestion, and dispatch
//! - [`metrika`]: HTTP adapters for the Logs and offline conversion APIs

pub mod config;
pub mod conversion;
pub mod counter;
pub mod error;
pub mod metrika;
pub mod persistence;
pub mod task;
pub mod telemetry;
pub mod webhook;
