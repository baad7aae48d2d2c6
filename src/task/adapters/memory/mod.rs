//! In-memory adapters for task persistence and log sources.

mod log_source;
mod task;

pub use log_source::StaticLogSource;
pub use task::InMemoryTaskRepository;
