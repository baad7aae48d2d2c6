//! HTTP adapters for the Metrika management API.
//!
//! [`MetrikaLogSource`] downloads raw visit logs for the scoring worker and
//! [`MetrikaReportingApi`] uploads offline conversions and reads their
//! processing status. Both share one [`MetrikaClient`], which adds the
//! `OAuth` authorization header and turns non-success responses into
//! [`MetrikaError::Api`].

mod logs;
mod offline_conversions;
pub mod tsv;

pub use logs::{LogPolling, MetrikaLogSource};
pub use offline_conversions::MetrikaReportingApi;

use crate::config::PipelineConfig;
use crate::conversion::ports::ReportingApiError;
use crate::counter::ApiToken;
use crate::task::ports::LogSourceError;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Longest response body kept in error values.
const MAX_ERROR_BODY: usize = 512;

/// Errors from the Metrika HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum MetrikaError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Metrika returned a non-2xx status code.
    #[error("Metrika API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
}

impl From<MetrikaError> for LogSourceError {
    fn from(err: MetrikaError) -> Self {
        match err {
            MetrikaError::Request(inner) if inner.is_decode() => Self::Malformed(inner.to_string()),
            MetrikaError::Request(inner) => Self::Transport(inner.to_string()),
            MetrikaError::Api { status, body } => Self::Api { status, body },
        }
    }
}

impl From<MetrikaError> for ReportingApiError {
    fn from(err: MetrikaError) -> Self {
        match err {
            MetrikaError::Request(inner) if inner.is_decode() => Self::Malformed(inner.to_string()),
            MetrikaError::Request(inner) => Self::Transport(inner.to_string()),
            MetrikaError::Api { status, body } => Self::Api { status, body },
        }
    }
}

/// Authenticated HTTP client for one Metrika API base URL.
#[derive(Debug, Clone)]
pub struct MetrikaClient {
    client: reqwest::Client,
    api_url: String,
}

impl MetrikaClient {
    /// Creates a client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`MetrikaError::Request`] when the TLS backend cannot be
    /// initialised.
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, MetrikaError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url))
    }

    /// Creates a client from pipeline configuration.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn from_config(config: &PipelineConfig) -> Result<Self, MetrikaError> {
        Self::new(config.metrika_api_url.clone(), config.http_timeout)
    }

    /// Creates a client reusing an existing [`reqwest::Client`].
    #[must_use]
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    fn get(&self, path: &str, token: &ApiToken) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header(reqwest::header::AUTHORIZATION, oauth_header(token))
    }

    fn post(&self, path: &str, token: &ApiToken) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header(reqwest::header::AUTHORIZATION, oauth_header(token))
    }

    /// Sends a request and parses a successful JSON body.
    async fn send_json<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> Result<T, MetrikaError> {
        let response = Self::ensure_success(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    /// Sends a request and returns a successful text body.
    async fn send_text(request: reqwest::RequestBuilder) -> Result<String, MetrikaError> {
        let response = Self::ensure_success(request.send().await?).await?;
        Ok(response.text().await?)
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, MetrikaError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_owned());
        Err(MetrikaError::Api {
            status: status.as_u16(),
            body: truncate(&body),
        })
    }
}

fn oauth_header(token: &ApiToken) -> String {
    format!("OAuth {}", token.expose())
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}
