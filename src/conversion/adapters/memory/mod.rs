//! In-memory adapters for conversion uploads.

mod reporting;
mod upload;

pub use reporting::{RecordedSubmission, ScriptedReportingApi};
pub use upload::InMemoryUploadRepository;
