//! FHIR Bundle JSON to `DiagnosticReportDetails` converter.
//!
//! The pipeline parses the bundle, takes its first `DiagnosticReport`,
//! resolves each result reference to an `Observation` in the same bundle and
//! projects everything into the display models of `report-core`.

pub mod bundle;
pub mod datetime;
pub mod projector;
pub mod resolve;

use report_core::{DiagnosticReportDetails, ReportError};

pub use bundle::{parse_bundle, Bundle, DiagnosticReport, Observation, Resource};
pub use projector::{DefaultModelFactory, ReportModelFactory};
pub use resolve::resolve_observation;

/// Parse a report from a JSON string.
///
/// Every failure (malformed JSON, a non-Bundle document, a bundle without a
/// report) yields `None`; the cause is only logged.
pub fn parse_report_str(bundle_json: &str) -> Option<DiagnosticReportDetails> {
    parse_report_str_with(bundle_json, &DefaultModelFactory)
}

/// [`parse_report_str`] with a caller-supplied projection.
pub fn parse_report_str_with<F>(bundle_json: &str, factory: &F) -> Option<DiagnosticReportDetails>
where
    F: ReportModelFactory + ?Sized,
{
    match try_parse_report_str_with(bundle_json, factory) {
        Ok(details) => Some(details),
        Err(ReportError::MissingReport) => {
            tracing::debug!("bundle holds no DiagnosticReport");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "discarding unreadable report bundle");
            None
        }
    }
}

/// Parse a report from a JSON string, keeping the reason it could not be built.
pub fn try_parse_report_str(bundle_json: &str) -> Result<DiagnosticReportDetails, ReportError> {
    try_parse_report_str_with(bundle_json, &DefaultModelFactory)
}

pub fn try_parse_report_str_with<F>(
    bundle_json: &str,
    factory: &F,
) -> Result<DiagnosticReportDetails, ReportError>
where
    F: ReportModelFactory + ?Sized,
{
    let bundle = parse_bundle(bundle_json)?;
    parse_report_bundle(&bundle, factory).ok_or(ReportError::MissingReport)
}

/// Resolve and project the first `DiagnosticReport` of an already parsed bundle.
///
/// Observations follow the order of the report's `result` list. References
/// that match nothing, and observations the factory declines, are left out.
pub fn parse_report_bundle<F>(bundle: &Bundle, factory: &F) -> Option<DiagnosticReportDetails>
where
    F: ReportModelFactory + ?Sized,
{
    let report = bundle.first_diagnostic_report()?;

    let observations = report
        .result
        .iter()
        .filter_map(|result| {
            let Some(reference) = result.reference.as_deref() else {
                tracing::debug!("result entry without a reference");
                return None;
            };
            let Some(observation) = resolve_observation(reference, bundle) else {
                tracing::debug!(reference, "dropping unresolved observation reference");
                return None;
            };
            factory.observation_details(observation, bundle)
        })
        .collect();

    Some(factory.report_details(report, observations))
}
