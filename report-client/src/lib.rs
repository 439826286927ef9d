//! Fetching raw report bundles and turning them into a consumer-facing state.

use std::path::PathBuf;
use std::time::Duration;

use report_core::{ReportConfig, ReportError, ReportState};

/// Upstream provider of the raw bundle JSON.
#[allow(async_fn_in_trait)]
pub trait ReportSource {
    async fn fetch_raw_report(&self) -> Result<String, ReportError>;
}

/// Fetches the bundle with a single GET request.
#[derive(Debug, Clone)]
pub struct HttpReportSource {
    http: reqwest::Client,
    url: String,
}

impl HttpReportSource {
    pub fn new(config: &ReportConfig) -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| ReportError::Transport(format!("HTTP client setup failed: {err}")))?;
        Ok(Self {
            http,
            url: config.endpoint(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ReportSource for HttpReportSource {
    async fn fetch_raw_report(&self) -> Result<String, ReportError> {
        tracing::info!(url = %self.url, "fetching diagnostic report");

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|err| ReportError::Transport(format!("HTTP request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Transport(format!(
                "{} responded with {status}",
                self.url
            )));
        }

        response
            .text()
            .await
            .map_err(|err| ReportError::Transport(format!("Failed to read response body: {err}")))
    }
}

/// Reads the bundle from a local file.
#[derive(Debug, Clone)]
pub struct FileReportSource {
    path: PathBuf,
}

impl FileReportSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSource for FileReportSource {
    async fn fetch_raw_report(&self) -> Result<String, ReportError> {
        tracing::info!(path = %self.path.display(), "reading diagnostic report");
        tokio::fs::read_to_string(&self.path).await.map_err(|err| {
            ReportError::Transport(format!("Could not read {}: {err}", self.path.display()))
        })
    }
}

/// Fetch-then-parse use case behind the report screen.
#[derive(Debug, Clone)]
pub struct ReportService<S> {
    source: S,
}

impl<S: ReportSource> ReportService<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// One fetch attempt.
    ///
    /// Transport failures become [`ReportState::Error`]; anything wrong with
    /// the payload itself becomes `Success(None)`.
    pub async fn fetch_report(&self) -> ReportState {
        match self.source.fetch_raw_report().await {
            Ok(raw) => ReportState::Success(report_fhir::parse_report_str(&raw)),
            Err(err) => {
                tracing::error!(error = %err, "diagnostic report fetch failed");
                ReportState::Error(err.to_string())
            }
        }
    }
}

impl ReportService<HttpReportSource> {
    /// Service reading from the configured endpoint.
    pub fn from_config(config: &ReportConfig) -> Result<Self, ReportError> {
        HttpReportSource::new(config).map(Self::new)
    }
}
