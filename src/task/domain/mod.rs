//! Domain model for scoring task lifecycle management.
//!
//! A task fetches one day of raw visit logs for a counter, scores them, and
//! stores the qualifying visits. The domain owns the task state machine and
//! the result paging rules; infrastructure concerns stay outside of it.

mod error;
mod ids;
mod page;
mod params;
mod task;
mod visit;

pub use error::{ParseTaskStatusError, TaskDomainError};
pub use ids::TaskId;
pub use page::{MAX_PAGE_LIMIT, PageRequest, Pagination, ResultPage, TaskResult};
pub use params::{TaskParams, parse_task_date};
pub use task::{PersistedTaskData, ProgressChange, Task, TaskStatus};
pub use visit::{RawHit, RawVisit, RawVisitLogs, ScoredVisit};
