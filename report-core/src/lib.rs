//! Display models, fetch outcome and configuration shared by the report crates.

use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://build.fhir.org/";
const DEFAULT_REPORT_PATH: &str = "diagnosticreport-example.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the raw report bundle is fetched from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportConfig {
    /// Server root, e.g. `https://build.fhir.org/`.
    pub base_url: String,
    /// Resource path appended to `base_url`.
    pub report_path: String,
    /// Upper bound for a single fetch, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            report_path: DEFAULT_REPORT_PATH.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ReportConfig {
    /// Defaults overridden by `REPORT_BASE_URL`, `REPORT_PATH` and `REPORT_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(base_url) = lookup("REPORT_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(path) = lookup("REPORT_PATH") {
            config.report_path = path;
        }
        if let Some(secs) = lookup("REPORT_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.request_timeout_secs = secs;
        }
        config
    }

    /// Full URL of the report bundle.
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.report_path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }
}

/// A diagnostic report flattened for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReportDetails {
    pub report_name: String,
    pub test_performers: Vec<String>,
    /// Human-readable effective time, absent for periods or missing values.
    pub effective_date_time: Option<String>,
    pub observations: Vec<ObservationDetails>,
}

/// A single observation as shown in the report's result list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDetails {
    pub observation_name: String,
    /// Measured value as plain decimal text.
    pub value: Option<String>,
    pub unit: Option<String>,
    pub low: Option<f64>,
    pub high: Option<f64>,
    #[serde(default)]
    pub code_display: Option<String>,
    /// Performer displays joined with `", "`.
    #[serde(default)]
    pub performer: Option<String>,
}

impl ObservationDetails {
    /// Observation carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            observation_name: name.into(),
            value: None,
            unit: None,
            low: None,
            high: None,
            code_display: None,
            performer: None,
        }
    }

    /// `value` parsed as a number, when it is one.
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_deref()?.trim().parse().ok()
    }

    /// Where the value sits relative to the reference range.
    ///
    /// Bounds are not validated against each other; a missing bound never
    /// flags the value on that side.
    pub fn range_status(&self) -> Option<RangeStatus> {
        let value = self.numeric_value()?;
        if self.low.is_none() && self.high.is_none() {
            return None;
        }
        if self.low.is_some_and(|low| value < low) {
            Some(RangeStatus::Low)
        } else if self.high.is_some_and(|high| value > high) {
            Some(RangeStatus::High)
        } else {
            Some(RangeStatus::Normal)
        }
    }
}

/// Position of a value relative to its reference range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RangeStatus {
    Low,
    Normal,
    High,
}

/// State of one fetch attempt as seen by the consumer.
///
/// `Loading` is the consumer's initial state; the fetch itself only ever
/// produces `Success` or `Error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ReportState {
    #[default]
    Loading,
    /// `None` when the payload held no usable report.
    Success(Option<DiagnosticReportDetails>),
    Error(String),
}

impl ReportState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ReportState::Loading)
    }

    pub fn report(&self) -> Option<&DiagnosticReportDetails> {
        match self {
            ReportState::Success(report) => report.as_ref(),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ReportState::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Failures raised while fetching or parsing a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Could not fetch report: {0}")]
    Transport(String),
    #[error("Could not parse report bundle: {0}")]
    Parse(String),
    #[error("Expected resourceType Bundle, received {0}")]
    NotABundle(String),
    #[error("Bundle contains no DiagnosticReport")]
    MissingReport,
}
