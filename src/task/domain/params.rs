//! Validated task input parameters.

use super::TaskDomainError;
use crate::counter::{ApiToken, CounterId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Parses a strict `YYYY-MM-DD` date.
///
/// Four-digit years and zero-padded month and day are required, so values
/// such as `2024-1-5` are rejected even though they name a real date.
///
/// # Errors
///
/// Returns [`TaskDomainError::InvalidDate`] when the value does not match the
/// pattern or names a non-existent calendar day.
pub fn parse_task_date(value: &str) -> Result<NaiveDate, TaskDomainError> {
    let trimmed = value.trim();
    let well_formed = trimmed.len() == 10
        && trimmed.char_indices().all(|(index, ch)| match index {
            4 | 7 => ch == '-',
            _ => ch.is_ascii_digit(),
        });
    if !well_formed {
        return Err(TaskDomainError::InvalidDate(value.to_owned()));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| TaskDomainError::InvalidDate(value.to_owned()))
}

/// Inputs of a scoring task: which counter and day to score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskParams {
    date: NaiveDate,
    counter: CounterId,
    token: ApiToken,
}

impl TaskParams {
    /// Validates raw task inputs.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError`] when the date is malformed, the counter is
    /// not positive, or the token is blank.
    pub fn new(date: &str, counter: i64, token: &str) -> Result<Self, TaskDomainError> {
        Ok(Self {
            date: parse_task_date(date)?,
            counter: CounterId::new(counter)?,
            token: ApiToken::new(token)?,
        })
    }

    /// Builds parameters from already-validated values.
    #[must_use]
    pub const fn from_parts(date: NaiveDate, counter: CounterId, token: ApiToken) -> Self {
        Self {
            date,
            counter,
            token,
        }
    }

    /// Returns the day whose visits are scored.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns the analytics counter.
    #[must_use]
    pub const fn counter(&self) -> CounterId {
        self.counter
    }

    /// Returns the API token used to fetch logs.
    #[must_use]
    pub const fn token(&self) -> &ApiToken {
        &self.token
    }
}
