//! Port contracts for webhook persistence.
//!
//! Sending conversions reuses [`crate::conversion::ports::ReportingApi`].

pub mod repository;

pub use repository::{
    BatchRepository, ConversionUpdate, WebhookRegistry, WebhookRepositoryError,
    WebhookRepositoryResult,
};
