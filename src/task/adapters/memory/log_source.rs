//! Fixed log source for tests and offline runs.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};

use crate::counter::{ApiToken, CounterId};
use crate::task::{
    domain::RawVisitLogs,
    ports::{LogSourceError, VisitLogSource},
};

/// Log source that returns a preconfigured outcome for every request.
#[derive(Debug, Clone)]
pub struct StaticLogSource {
    outcome: Result<RawVisitLogs, LogSourceError>,
    requests: Arc<Mutex<Vec<(NaiveDate, CounterId)>>>,
}

impl StaticLogSource {
    /// Creates a source that always returns `logs`.
    #[must_use]
    pub fn with_logs(logs: RawVisitLogs) -> Self {
        Self {
            outcome: Ok(logs),
            requests: Arc::default(),
        }
    }

    /// Creates a source that always fails with `error`.
    #[must_use]
    pub fn failing(error: LogSourceError) -> Self {
        Self {
            outcome: Err(error),
            requests: Arc::default(),
        }
    }

    /// Returns the date and counter of every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<(NaiveDate, CounterId)> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VisitLogSource for StaticLogSource {
    async fn fetch(
        &self,
        date: NaiveDate,
        counter: CounterId,
        _token: &ApiToken,
    ) -> Result<RawVisitLogs, LogSourceError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((date, counter));
        }
        self.outcome.clone()
    }
}
