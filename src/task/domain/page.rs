//! Stored task results and deterministic paging over them.

use super::{ScoredVisit, TaskDomainError, TaskId};
use serde::{Deserialize, Serialize};

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: usize = 1000;

const DEFAULT_PAGE_LIMIT: usize = 100;

/// Validated `limit`/`offset` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    limit: usize,
    offset: usize,
}

impl PageRequest {
    /// Validates raw paging inputs.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidPageLimit`] when `limit` is outside
    /// `1..=1000`, or [`TaskDomainError::InvalidPageOffset`] when `offset` is
    /// negative.
    pub fn new(limit: i64, offset: i64) -> Result<Self, TaskDomainError> {
        let page_limit = usize::try_from(limit)
            .ok()
            .filter(|value| (1..=MAX_PAGE_LIMIT).contains(value))
            .ok_or(TaskDomainError::InvalidPageLimit {
                limit,
                max: MAX_PAGE_LIMIT,
            })?;
        let page_offset =
            usize::try_from(offset).map_err(|_| TaskDomainError::InvalidPageOffset(offset))?;
        Ok(Self {
            limit: page_limit,
            offset: page_offset,
        })
    }

    /// Returns the page size.
    #[must_use]
    pub const fn limit(self) -> usize {
        self.limit
    }

    /// Returns the number of rows skipped.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.offset
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

/// Paging metadata returned with every slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Total number of stored rows.
    pub total: usize,
    /// Requested page size.
    pub limit: usize,
    /// Requested offset.
    pub offset: usize,
    /// Whether rows remain after this page.
    pub has_more: bool,
}

/// One slice of a task result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPage {
    /// Rows in this slice.
    pub data: Vec<ScoredVisit>,
    /// Paging metadata.
    pub pagination: Pagination,
}

/// Immutable ordered output of a finished task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    task_id: TaskId,
    visits: Vec<ScoredVisit>,
}

impl TaskResult {
    /// Wraps the scored visits of a task.
    #[must_use]
    pub const fn new(task_id: TaskId, visits: Vec<ScoredVisit>) -> Self {
        Self { task_id, visits }
    }

    /// Returns the owning task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns every stored row in order.
    #[must_use]
    pub fn visits(&self) -> &[ScoredVisit] {
        &self.visits
    }

    /// Returns the number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.visits.len()
    }

    /// Returns whether no visit qualified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    /// Returns the requested slice together with paging metadata.
    #[must_use]
    pub fn page(&self, request: PageRequest) -> ResultPage {
        let total = self.visits.len();
        let data = self
            .visits
            .iter()
            .skip(request.offset())
            .take(request.limit())
            .cloned()
            .collect();
        ResultPage {
            data,
            pagination: Pagination {
                total,
                limit: request.limit(),
                offset: request.offset(),
                has_more: request.offset().saturating_add(request.limit()) < total,
            },
        }
    }
}
