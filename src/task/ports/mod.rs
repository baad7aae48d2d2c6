//! Port contracts for task lifecycle management and scoring.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod repository;
pub mod scoring;

pub use repository::{TaskRepository, TaskRepositoryError, TaskRepositoryResult};
pub use scoring::{ClassifierError, LogSourceError, VisitClassifier, VisitLogSource};
