//! Application services for task lifecycle orchestration and scoring.

mod lifecycle;
mod scheduler;
mod worker;

pub use lifecycle::{
    CreateTaskRequest, TaskLifecycleError, TaskLifecycleResult, TaskLifecycleService,
};
pub use scheduler::{ScoringScheduler, SubmittedTask};
pub use worker::{ScoringError, ScoringWorker};
