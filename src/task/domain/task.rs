//! Task aggregate root and its lifecycle state machine.

use super::{ParseTaskStatusError, TaskDomainError, TaskId, TaskParams};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest progress value a running task may report.
///
/// One hundred percent is reserved for finished tasks.
const RUNNING_PROGRESS_CAP: u8 = 99;

/// Progress value stored when a task finishes.
const FINISHED_PROGRESS: u8 = 100;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task has been created but the worker has not reported yet.
    Pending,
    /// The worker is fetching or scoring.
    Running,
    /// Scoring finished and the result is stored.
    Finished,
    /// The worker failed.
    Error,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Error => "error",
        }
    }

    /// Returns whether no further transition may leave this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }

    /// Returns whether the lifecycle permits moving to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        match self {
            Self::Pending => matches!(target, Self::Running | Self::Error),
            Self::Running => matches!(target, Self::Running | Self::Finished | Self::Error),
            Self::Finished | Self::Error => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, ParseTaskStatusError> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "finished" => Ok(Self::Finished),
            "error" => Ok(Self::Error),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Outcome of a progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressChange {
    /// The stored progress now equals the reported value.
    Applied {
        /// Stored progress after the update.
        progress: u8,
    },
    /// The report went backwards; the previous value was kept.
    Regressed {
        /// Progress already stored.
        current: u8,
        /// Lower value that was reported.
        requested: u8,
    },
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    params: TaskParams,
    status: TaskStatus,
    progress: u8,
    message: String,
    error: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted task inputs.
    pub params: TaskParams,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted progress percentage.
    pub progress: u8,
    /// Persisted last-step description.
    pub message: String,
    /// Persisted failure description, if any.
    pub error: Option<String>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted start timestamp, if any.
    pub started_at: Option<DateTime<Utc>>,
    /// Persisted finish timestamp, if any.
    pub finished_at: Option<DateTime<Utc>>,
    /// Persisted latest lifecycle timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a pending task for the given inputs.
    #[must_use]
    pub fn new(params: TaskParams, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: TaskId::new(),
            params,
            status: TaskStatus::Pending,
            progress: 0,
            message: "queued".to_owned(),
            error: None,
            created_at: timestamp,
            started_at: None,
            finished_at: None,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            params: data.params,
            status: data.status,
            progress: data.progress,
            message: data.message,
            error: data.error,
            created_at: data.created_at,
            started_at: data.started_at,
            finished_at: data.finished_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the task inputs.
    #[must_use]
    pub const fn params(&self) -> &TaskParams {
        &self.params
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the progress percentage.
    #[must_use]
    pub const fn progress(&self) -> u8 {
        self.progress
    }

    /// Returns the description of the last reported step.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the failure description, if the task failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the worker first reported, if it has.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when the task reached a terminal status, if it has.
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Records a worker progress report and marks the task running.
    ///
    /// The percentage is clamped to `0..=100` and then capped at 99, since
    /// only [`Task::complete`] may reach 100. A report lower than the stored
    /// value keeps the stored value and returns
    /// [`ProgressChange::Regressed`]; the message is still updated.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::TaskAlreadyTerminal`] when the task has
    /// already finished or failed.
    pub fn record_progress(
        &mut self,
        percent: i64,
        message: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<ProgressChange, TaskDomainError> {
        self.transition_to(TaskStatus::Running, clock)?;
        let requested = clamp_percent(percent).min(RUNNING_PROGRESS_CAP);
        self.message = message.into();

        if requested < self.progress {
            return Ok(ProgressChange::Regressed {
                current: self.progress,
                requested,
            });
        }
        self.progress = requested;
        Ok(ProgressChange::Applied {
            progress: self.progress,
        })
    }

    /// Marks the task finished with full progress.
    ///
    /// A pending task passes through running first so that `started_at` is
    /// always set on finished tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::TaskAlreadyTerminal`] when the task has
    /// already finished or failed.
    pub fn complete(
        &mut self,
        message: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.transition_to(TaskStatus::Running, clock)?;
        self.transition_to(TaskStatus::Finished, clock)?;
        self.progress = FINISHED_PROGRESS;
        self.message = message.into();
        Ok(())
    }

    /// Marks the task failed, keeping the progress reached so far.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::TaskAlreadyTerminal`] when the task has
    /// already finished or failed.
    pub fn fail(
        &mut self,
        error: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.transition_to(TaskStatus::Error, clock)?;
        let description = error.into();
        self.message.clone_from(&description);
        self.error = Some(description);
        Ok(())
    }

    /// Checks that the task finished and its result may be read.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotFinished`] for any other status.
    pub const fn ensure_finished(&self) -> Result<(), TaskDomainError> {
        match self.status {
            TaskStatus::Finished => Ok(()),
            status => Err(TaskDomainError::NotFinished {
                task_id: self.id,
                status,
            }),
        }
    }

    fn transition_to(
        &mut self,
        target: TaskStatus,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(TaskDomainError::TaskAlreadyTerminal {
                task_id: self.id,
                status: self.status,
            });
        }
        let now = clock.utc();
        if target == TaskStatus::Running && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if target.is_terminal() {
            self.finished_at = Some(now);
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }
}

fn clamp_percent(percent: i64) -> u8 {
    u8::try_from(percent.clamp(0, i64::from(FINISHED_PROGRESS))).unwrap_or(FINISHED_PROGRESS)
}
