//! Port contracts for conversion upload persistence and delivery.

pub mod reporting;
pub mod repository;

pub use reporting::{ReportingApi, ReportingApiError};
pub use repository::{UploadRepository, UploadRepositoryError, UploadRepositoryResult};
