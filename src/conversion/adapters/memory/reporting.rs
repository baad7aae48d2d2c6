//! Scriptable reporting API for tests and dry runs.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::conversion::{
    domain::{ConversionCsv, RemoteUploadState, UploadReceipt, UploadReport},
    ports::{ReportingApi, ReportingApiError},
};
use crate::counter::{ApiToken, CounterId};

/// A file received by [`ScriptedReportingApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    /// Counter the file was sent to.
    pub counter: CounterId,
    /// Rendered file.
    pub csv: String,
    /// Identity type parameter.
    pub client_id_type: &'static str,
    /// Identifier returned for the file, when accepted.
    pub external_id: Option<u64>,
}

#[derive(Debug, Default)]
struct ScriptState {
    last_id: u64,
    queued_failures: VecDeque<ReportingApiError>,
    rejected_content: Vec<(String, ReportingApiError)>,
    reports: HashMap<u64, UploadReport>,
    submissions: Vec<RecordedSubmission>,
    status_checks: usize,
}

/// In-process reporting API with scripted outcomes.
///
/// Submissions are accepted with increasing identifiers unless a queued or
/// content-matched failure applies. Status checks return the scripted
/// report for an identifier, or an in-progress report when none is set.
#[derive(Debug, Clone, Default)]
pub struct ScriptedReportingApi {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedReportingApi {
    /// Creates an API that accepts every submission.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ScriptState>, ReportingApiError> {
        self.state
            .lock()
            .map_err(|err| ReportingApiError::Transport(err.to_string()))
    }

    /// Fails the next submission with `error`.
    pub fn fail_next_submit(&self, error: ReportingApiError) {
        if let Ok(mut state) = self.lock() {
            state.queued_failures.push_back(error);
        }
    }

    /// Fails every submission whose file contains `needle`.
    pub fn reject_content(&self, needle: impl Into<String>, error: ReportingApiError) {
        if let Ok(mut state) = self.lock() {
            state.rejected_content.push((needle.into(), error));
        }
    }

    /// Sets the report returned for an accepted upload.
    pub fn set_report(&self, external_id: u64, report: UploadReport) {
        if let Ok(mut state) = self.lock() {
            state.reports.insert(external_id, report);
        }
    }

    /// Returns every submission received so far.
    #[must_use]
    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.lock()
            .map(|state| state.submissions.clone())
            .unwrap_or_default()
    }

    /// Returns how many status checks were made.
    #[must_use]
    pub fn status_checks(&self) -> usize {
        self.lock().map(|state| state.status_checks).unwrap_or_default()
    }
}

#[async_trait]
impl ReportingApi for ScriptedReportingApi {
    async fn submit(
        &self,
        counter: CounterId,
        _token: &ApiToken,
        csv: &ConversionCsv,
    ) -> Result<UploadReceipt, ReportingApiError> {
        let mut state = self.lock()?;
        let rejection = state
            .rejected_content
            .iter()
            .find(|(needle, _)| csv.as_str().contains(needle.as_str()))
            .map(|(_, error)| error.clone());
        let outcome = match rejection.or_else(|| state.queued_failures.pop_front()) {
            Some(error) => Err(error),
            None => {
                state.last_id = state.last_id.saturating_add(1);
                Ok(UploadReceipt {
                    external_id: state.last_id,
                    status: "UPLOADED".to_owned(),
                    line_quantity: u32::try_from(csv.rows()).ok(),
                })
            }
        };
        state.submissions.push(RecordedSubmission {
            counter,
            csv: csv.as_str().to_owned(),
            client_id_type: csv.client_id_type().as_param(),
            external_id: outcome.as_ref().ok().map(|receipt| receipt.external_id),
        });
        outcome
    }

    async fn fetch_status(
        &self,
        _counter: CounterId,
        _token: &ApiToken,
        external_id: u64,
    ) -> Result<UploadReport, ReportingApiError> {
        let mut state = self.lock()?;
        state.status_checks = state.status_checks.saturating_add(1);
        Ok(state
            .reports
            .get(&external_id)
            .cloned()
            .unwrap_or_else(|| UploadReport {
                state: RemoteUploadState::InProgress,
                status: "UPLOADED".to_owned(),
                processed: 0,
                errors: Vec::new(),
            }))
    }
}
