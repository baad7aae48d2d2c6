//! Raw visit log downloads through the Logs API.
//!
//! A download is a four step exchange: create a log request, poll it until
//! the export is prepared, fetch every part, then release the request so it
//! stops counting against the counter's quota. Once created, a request is
//! released on every exit path: cleaned when it was prepared or ended in a
//! failed status, cancelled while it is still being prepared.

use super::tsv::{self, HIT_FIELDS, VISIT_FIELDS};
use super::{MetrikaClient, MetrikaError};
use crate::config::PipelineConfig;
use crate::counter::{ApiToken, CounterId};
use crate::task::domain::RawVisitLogs;
use crate::task::ports::{LogSourceError, VisitLogSource};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often and how long a log request is polled before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogPolling {
    /// Delay between status checks.
    pub interval: Duration,
    /// Status checks made before the request is abandoned.
    pub max_polls: u32,
}

impl LogPolling {
    /// Reads the polling budget from pipeline configuration.
    #[must_use]
    pub const fn from_config(config: &PipelineConfig) -> Self {
        Self {
            interval: config.log_poll_interval,
            max_polls: config.log_max_polls,
        }
    }
}

impl Default for LogPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_polls: 60,
        }
    }
}

/// [`VisitLogSource`] backed by the Metrika Logs API.
#[derive(Debug, Clone)]
pub struct MetrikaLogSource {
    client: MetrikaClient,
    polling: LogPolling,
}

impl MetrikaLogSource {
    /// Creates a log source over an existing client.
    #[must_use]
    pub const fn new(client: MetrikaClient, polling: LogPolling) -> Self {
        Self { client, polling }
    }

    /// Creates a log source from pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MetrikaError::Request`] when the HTTP client cannot be built.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, MetrikaError> {
        Ok(Self::new(
            MetrikaClient::from_config(config)?,
            LogPolling::from_config(config),
        ))
    }

    async fn download(
        &self,
        source: LogSource,
        date: NaiveDate,
        counter: CounterId,
        token: &ApiToken,
    ) -> Result<Vec<String>, LogSourceError> {
        let created = self.create_request(source, date, counter, token).await?;
        let request_id = created.request_id;
        debug!(request_id, source = source.name(), "log request created");

        let ready = match self.await_processed(created, counter, token).await {
            Ok(ready) => ready,
            Err(err) => {
                self.release(Release::after_wait_failure(&err), counter, request_id, token)
                    .await;
                return Err(err);
            }
        };
        let downloaded = self.download_parts(&ready, counter, token).await;
        self.release(Release::Clean, counter, request_id, token).await;
        let parts = downloaded?;

        info!(
            request_id,
            source = source.name(),
            parts = parts.len(),
            "log request downloaded"
        );
        Ok(parts)
    }

    async fn download_parts(
        &self,
        ready: &LogRequest,
        counter: CounterId,
        token: &ApiToken,
    ) -> Result<Vec<String>, LogSourceError> {
        let mut parts = Vec::with_capacity(ready.parts.len());
        for part in &ready.parts {
            let path = format!(
                "{}/part/{}/download",
                request_path(counter, ready.request_id),
                part.part_number
            );
            parts.push(MetrikaClient::send_text(self.client.get(&path, token)).await?);
        }
        Ok(parts)
    }

    /// Frees a created log request so it stops counting against the quota.
    ///
    /// Failures are logged and otherwise ignored.
    async fn release(
        &self,
        release: Release,
        counter: CounterId,
        request_id: u64,
        token: &ApiToken,
    ) {
        let path = format!("{}/{}", request_path(counter, request_id), release.action());
        match MetrikaClient::send_text(self.client.post(&path, token)).await {
            Ok(_) => debug!(request_id, action = release.action(), "log request released"),
            Err(err) => warn!(
                request_id,
                action = release.action(),
                error = %err,
                "failed to release log request"
            ),
        }
    }

    async fn create_request(
        &self,
        source: LogSource,
        date: NaiveDate,
        counter: CounterId,
        token: &ApiToken,
    ) -> Result<LogRequest, LogSourceError> {
        let day = date.format("%Y-%m-%d").to_string();
        let fields = source.fields().join(",");
        let request = self
            .client
            .post(
                &format!("/management/v1/counter/{}/logrequests", counter.value()),
                token,
            )
            .query(&[
                ("date1", day.as_str()),
                ("date2", day.as_str()),
                ("fields", fields.as_str()),
                ("source", source.name()),
            ]);
        let envelope: LogRequestEnvelope = MetrikaClient::send_json(request).await?;
        Ok(envelope.log_request)
    }

    async fn await_processed(
        &self,
        created: LogRequest,
        counter: CounterId,
        token: &ApiToken,
    ) -> Result<LogRequest, LogSourceError> {
        let request_id = created.request_id;
        let mut current = created;
        let mut polls: u32 = 0;
        loop {
            match PollDecision::for_status(&current.status) {
                PollDecision::Ready => return Ok(current),
                PollDecision::Failed => {
                    return Err(LogSourceError::RequestFailed {
                        request_id,
                        status: current.status,
                    });
                }
                PollDecision::Wait if polls >= self.polling.max_polls => {
                    return Err(LogSourceError::NotProcessed { request_id, polls });
                }
                PollDecision::Wait => {}
            }

            tokio::time::sleep(self.polling.interval).await;
            polls = polls.saturating_add(1);
            let envelope: LogRequestEnvelope = MetrikaClient::send_json(
                self.client.get(&request_path(counter, request_id), token),
            )
            .await?;
            current = envelope.log_request;
            debug!(request_id, status = %current.status, polls, "log request polled");
        }
    }
}

#[async_trait]
impl VisitLogSource for MetrikaLogSource {
    async fn fetch(
        &self,
        date: NaiveDate,
        counter: CounterId,
        token: &ApiToken,
    ) -> Result<RawVisitLogs, LogSourceError> {
        let mut logs = RawVisitLogs::default();

        for part in self.download(LogSource::Visits, date, counter, token).await? {
            let visits =
                tsv::parse_visits(&part).map_err(|err| LogSourceError::Malformed(err.to_string()))?;
            logs.visits.extend(visits);
        }
        for part in self.download(LogSource::Hits, date, counter, token).await? {
            let hits =
                tsv::parse_hits(&part).map_err(|err| LogSourceError::Malformed(err.to_string()))?;
            logs.hits.extend(hits);
        }

        Ok(logs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogSource {
    Visits,
    Hits,
}

impl LogSource {
    const fn name(self) -> &'static str {
        match self {
            Self::Visits => "visits",
            Self::Hits => "hits",
        }
    }

    const fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Visits => &VISIT_FIELDS,
            Self::Hits => &HIT_FIELDS,
        }
    }
}

/// How a created log request is freed once the download ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Release {
    /// Delete prepared or failed data.
    Clean,
    /// Stop a request that is still being prepared.
    Cancel,
}

impl Release {
    const fn after_wait_failure(err: &LogSourceError) -> Self {
        match err {
            LogSourceError::RequestFailed { .. } => Self::Clean,
            _ => Self::Cancel,
        }
    }

    const fn action(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollDecision {
    Ready,
    Wait,
    Failed,
}

impl PollDecision {
    fn for_status(status: &str) -> Self {
        match status {
            "processed" => Self::Ready,
            "created" | "processing" | "processed_with_errors" | "awaiting_retry" => Self::Wait,
            _ => Self::Failed,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LogRequestEnvelope {
    log_request: LogRequest,
}

#[derive(Debug, Deserialize)]
struct LogRequest {
    request_id: u64,
    status: String,
    #[serde(default)]
    parts: Vec<LogPart>,
}

#[derive(Debug, Deserialize)]
struct LogPart {
    part_number: u32,
}

fn request_path(counter: CounterId, request_id: u64) -> String {
    format!(
        "/management/v1/counter/{}/logrequest/{request_id}",
        counter.value()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Path, State},
        http::StatusCode,
        routing::{get, post},
    };
    use rstest::rstest;
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    /// Fake Logs API whose request goes straight to `status` on first poll.
    #[derive(Clone)]
    struct FakeLogsApi {
        status: &'static str,
        part: (StatusCode, &'static str),
        released: Arc<Mutex<Vec<String>>>,
    }

    impl FakeLogsApi {
        fn new(status: &'static str, part: (StatusCode, &'static str)) -> Self {
            Self {
                status,
                part,
                released: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn released(&self) -> Vec<String> {
            self.released.lock().expect("release log lock").clone()
        }

        async fn serve(&self) -> String {
            async fn create() -> Json<Value> {
                Json(json!({"log_request": {"request_id": 7, "status": "created"}}))
            }
            async fn status(State(api): State<FakeLogsApi>) -> Json<Value> {
                Json(json!({"log_request": {
                    "request_id": 7,
                    "status": api.status,
                    "parts": [{"part_number": 0, "size": 1}]
                }}))
            }
            async fn part(State(api): State<FakeLogsApi>) -> (StatusCode, &'static str) {
                api.part
            }
            async fn release(
                State(api): State<FakeLogsApi>,
                Path((_counter, _id, action)): Path<(i64, u64, String)>,
            ) -> StatusCode {
                api.released.lock().expect("release log lock").push(action);
                StatusCode::OK
            }

            let base = "/management/v1/counter/{counter}";
            let app = Router::new()
                .route(&format!("{base}/logrequests"), post(create))
                .route(&format!("{base}/logrequest/{{id}}"), get(status))
                .route(
                    &format!("{base}/logrequest/{{id}}/part/{{part}}/download"),
                    get(part),
                )
                .route(&format!("{base}/logrequest/{{id}}/{{action}}"), post(release))
                .with_state(self.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind fake logs api");
            let addr = listener.local_addr().expect("local address");
            tokio::spawn(async move { axum::serve(listener, app).await });
            format!("http://{addr}")
        }
    }

    async fn download_from(api: &FakeLogsApi, max_polls: u32) -> Result<Vec<String>, LogSourceError> {
        let client =
            MetrikaClient::new(api.serve().await, Duration::from_secs(5)).expect("client builds");
        let source = MetrikaLogSource::new(
            client,
            LogPolling {
                interval: Duration::from_millis(1),
                max_polls,
            },
        );
        source
            .download(
                LogSource::Visits,
                NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date"),
                CounterId::new(42).expect("valid counter"),
                &ApiToken::new("token").expect("valid token"),
            )
            .await
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn prepared_request_is_cleaned_after_download() {
        let api = FakeLogsApi::new("processed", (StatusCode::OK, "ym:s:visitID\n"));
        let parts = download_from(&api, 3).await.expect("download succeeds");
        assert_eq!(parts, vec!["ym:s:visitID\n".to_owned()]);
        assert_eq!(api.released(), vec!["clean".to_owned()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_part_download_still_cleans_the_request() {
        let api = FakeLogsApi::new("processed", (StatusCode::INTERNAL_SERVER_ERROR, "boom"));
        let err = download_from(&api, 3).await.expect_err("part download fails");
        assert!(matches!(err, LogSourceError::Api { status: 500, .. }));
        assert_eq!(api.released(), vec!["clean".to_owned()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_request_is_cleaned() {
        let api = FakeLogsApi::new("processing_failed", (StatusCode::OK, ""));
        let err = download_from(&api, 3).await.expect_err("request fails");
        assert!(matches!(err, LogSourceError::RequestFailed { request_id: 7, .. }));
        assert_eq!(api.released(), vec!["clean".to_owned()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn request_still_preparing_is_cancelled() {
        let api = FakeLogsApi::new("processing", (StatusCode::OK, ""));
        let err = download_from(&api, 2).await.expect_err("poll budget runs out");
        assert!(matches!(err, LogSourceError::NotProcessed { polls: 2, .. }));
        assert_eq!(api.released(), vec!["cancel".to_owned()]);
    }

    #[rstest]
    #[case("processed", PollDecision::Ready)]
    #[case("created", PollDecision::Wait)]
    #[case("processing", PollDecision::Wait)]
    #[case("processed_with_errors", PollDecision::Wait)]
    #[case("awaiting_retry", PollDecision::Wait)]
    #[case("canceled", PollDecision::Failed)]
    #[case("cleaned_by_user", PollDecision::Failed)]
    fn log_request_statuses_map_to_poll_decisions(
        #[case] status: &str,
        #[case] expected: PollDecision,
    ) {
        assert_eq!(PollDecision::for_status(status), expected);
    }

    #[test]
    fn log_request_envelope_parses_parts() {
        let body = r#"{"log_request":{"request_id":77,"counter_id":1,"status":"processed","parts":[{"part_number":0,"size":10},{"part_number":1,"size":4}]}}"#;
        let envelope: LogRequestEnvelope = serde_json::from_str(body).expect("envelope parses");
        assert_eq!(envelope.log_request.request_id, 77);
        let numbers: Vec<u32> = envelope
            .log_request
            .parts
            .iter()
            .map(|part| part.part_number)
            .collect();
        assert_eq!(numbers, vec![0, 1]);
    }

    #[test]
    fn fresh_requests_have_no_parts() {
        let body = r#"{"log_request":{"request_id":5,"status":"created"}}"#;
        let envelope: LogRequestEnvelope = serde_json::from_str(body).expect("envelope parses");
        assert!(envelope.log_request.parts.is_empty());
    }

    #[test]
    fn request_paths_embed_counter_and_id() {
        let counter = CounterId::new(1234).expect("valid counter");
        assert_eq!(
            request_path(counter, 9),
            "/management/v1/counter/1234/logrequest/9"
        );
    }

    #[tokio::test]
    async fn unreachable_api_surfaces_as_transport_error() {
        let client = MetrikaClient::new("http://127.0.0.1:9", Duration::from_millis(200))
            .expect("client builds");
        let source = MetrikaLogSource::new(
            client,
            LogPolling {
                interval: Duration::from_millis(1),
                max_polls: 1,
            },
        );
        let counter = CounterId::new(1).expect("valid counter");
        let token = ApiToken::new("token").expect("valid token");
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date");

        let err = source
            .fetch(date, counter, &token)
            .await
            .expect_err("nothing listens on the discard port");
        assert!(matches!(err, LogSourceError::Transport(_)));
    }
}
