//! Offline conversion uploads through the management API.

use super::{MetrikaClient, MetrikaError};
use crate::config::PipelineConfig;
use crate::conversion::domain::{ConversionCsv, RemoteUploadState, UploadReceipt, UploadReport};
use crate::conversion::ports::{ReportingApi, ReportingApiError};
use crate::counter::{ApiToken, CounterId};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{info, warn};

const UPLOAD_FILE_NAME: &str = "conversions.csv";

/// [`ReportingApi`] backed by the offline conversions endpoints.
#[derive(Debug, Clone)]
pub struct MetrikaReportingApi {
    client: MetrikaClient,
}

impl MetrikaReportingApi {
    /// Creates a reporting API over an existing client.
    #[must_use]
    pub const fn new(client: MetrikaClient) -> Self {
        Self { client }
    }

    /// Creates a reporting API from pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MetrikaError::Request`] when the HTTP client cannot be built.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, MetrikaError> {
        MetrikaClient::from_config(config).map(Self::new)
    }
}

#[async_trait]
impl ReportingApi for MetrikaReportingApi {
    async fn submit(
        &self,
        counter: CounterId,
        token: &ApiToken,
        csv: &ConversionCsv,
    ) -> Result<UploadReceipt, ReportingApiError> {
        let part = Part::text(csv.as_str().to_owned())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("text/csv")
            .map_err(MetrikaError::from)?;
        let request = self
            .client
            .post(
                &format!(
                    "/management/v1/counter/{}/offline_conversions/upload",
                    counter.value()
                ),
                token,
            )
            .query(&[("client_id_type", csv.client_id_type().as_param())])
            .multipart(Form::new().part("file", part));

        let envelope: UploadingEnvelope = MetrikaClient::send_json(request).await?;
        let receipt = envelope.uploading.into_receipt();
        info!(
            counter = counter.value(),
            external_id = receipt.external_id,
            status = %receipt.status,
            rows = csv.rows(),
            "conversion file accepted"
        );
        Ok(receipt)
    }

    async fn fetch_status(
        &self,
        counter: CounterId,
        token: &ApiToken,
        external_id: u64,
    ) -> Result<UploadReport, ReportingApiError> {
        let request = self.client.get(
            &format!(
                "/management/v1/counter/{}/offline_conversions/uploading/{external_id}",
                counter.value()
            ),
            token,
        );
        let envelope: UploadingEnvelope = MetrikaClient::send_json(request).await?;
        Ok(envelope.uploading.into_report())
    }
}

#[derive(Debug, Deserialize)]
struct UploadingEnvelope {
    uploading: Uploading,
}

#[derive(Debug, Deserialize)]
struct Uploading {
    id: u64,
    #[serde(default)]
    status: String,
    #[serde(default)]
    line_quantity: Option<u32>,
    #[serde(default)]
    processed: Option<u32>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

impl Uploading {
    fn into_receipt(self) -> UploadReceipt {
        UploadReceipt {
            external_id: self.id,
            status: self.status,
            line_quantity: self.line_quantity,
        }
    }

    fn into_report(self) -> UploadReport {
        let state = RemoteUploadState::from_api_status(&self.status).unwrap_or_else(|| {
            warn!(
                external_id = self.id,
                status = %self.status,
                "unknown upload status, treating as in progress"
            );
            RemoteUploadState::InProgress
        });
        let processed = match state {
            RemoteUploadState::Completed => self.processed.or(self.line_quantity).unwrap_or(0),
            RemoteUploadState::InProgress | RemoteUploadState::Failed => self.processed.unwrap_or(0),
        };
        let mut errors: Vec<String> = self.errors.into_iter().map(describe_error).collect();
        if state == RemoteUploadState::Failed && errors.is_empty() {
            errors.push(format!("upload ended with status {}", self.status));
        }
        UploadReport {
            state,
            status: self.status,
            processed,
            errors,
        }
    }
}

fn describe_error(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        other => other
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| other.to_string(), str::to_owned),
    }
}
