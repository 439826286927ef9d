//! Projection of FHIR resources into display models.

use report_core::{DiagnosticReportDetails, ObservationDetails};

use crate::bundle::{
    Bundle, CodeableConcept, DiagnosticReport, Effective, FhirDecimal, Observation, Quantity,
};
use crate::datetime::FhirDateTime;

pub const UNKNOWN_OBSERVATION: &str = "Unknown Observation";
pub const UNKNOWN_REPORT_NAME: &str = "Unknown Report Name";

/// Turns source resources into display models.
pub trait ReportModelFactory {
    /// `None` drops the observation from the report without failing it.
    fn observation_details(
        &self,
        observation: &Observation,
        bundle: &Bundle,
    ) -> Option<ObservationDetails>;

    fn report_details(
        &self,
        report: &DiagnosticReport,
        observations: Vec<ObservationDetails>,
    ) -> DiagnosticReportDetails;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultModelFactory;

impl ReportModelFactory for DefaultModelFactory {
    fn observation_details(
        &self,
        observation: &Observation,
        _bundle: &Bundle,
    ) -> Option<ObservationDetails> {
        let quantity = observation.value_quantity.as_ref();
        let range = observation.reference_range.first();

        Some(ObservationDetails {
            observation_name: codeable_name(&observation.code, UNKNOWN_OBSERVATION),
            value: quantity
                .and_then(|q| q.value.as_ref())
                .map(FhirDecimal::to_plain_string),
            unit: quantity.and_then(|q| q.unit.clone()),
            low: range.and_then(|r| quantity_f64(r.low.as_ref())),
            high: range.and_then(|r| quantity_f64(r.high.as_ref())),
            code_display: observation.code.first_display().map(str::to_string),
            // Unnamed performers keep their slot as an empty string.
            performer: Some(
                observation
                    .performer
                    .iter()
                    .map(|performer| performer.display.as_deref().unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        })
    }

    fn report_details(
        &self,
        report: &DiagnosticReport,
        observations: Vec<ObservationDetails>,
    ) -> DiagnosticReportDetails {
        DiagnosticReportDetails {
            report_name: codeable_name(&report.code, UNKNOWN_REPORT_NAME),
            // Unlike observations, unnamed report performers are dropped.
            test_performers: report
                .performer
                .iter()
                .filter_map(|performer| performer.display.clone())
                .collect(),
            effective_date_time: effective_display(report),
            observations,
        }
    }
}

/// First non-empty of `text`, the first coding's display, then `fallback`.
fn codeable_name(code: &CodeableConcept, fallback: &str) -> String {
    non_empty(code.text.as_deref())
        .or_else(|| non_empty(code.first_display()))
        .unwrap_or(fallback)
        .to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}

fn quantity_f64(quantity: Option<&Quantity>) -> Option<f64> {
    quantity?.value.as_ref().and_then(FhirDecimal::to_f64)
}

fn effective_display(report: &DiagnosticReport) -> Option<String> {
    match report.effective()? {
        Effective::DateTime(value) => {
            let parsed = FhirDateTime::parse(value);
            if parsed.is_none() {
                tracing::debug!(value, "unreadable effectiveDateTime on diagnostic report");
            }
            parsed.map(|date_time| date_time.to_human_display())
        }
        Effective::Period(_) => {
            tracing::debug!("effectivePeriod is not rendered");
            None
        }
    }
}
