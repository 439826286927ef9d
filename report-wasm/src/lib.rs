//! Framework-neutral WASM <-> JavaScript bridge for the report pipeline.

use report_core::{DiagnosticReportDetails, ReportError};
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

/// Parse a FHIR Bundle JSON string into report details, or `null` when the
/// bundle holds no usable report.
#[wasm_bindgen]
pub fn parse_report(bundle_json: &str) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    match report_fhir::parse_report_str(bundle_json) {
        Some(details) => details_to_js(&details),
        None => Ok(JsValue::NULL),
    }
}

/// Like [`parse_report`] but rejects with the reason no report was produced.
#[wasm_bindgen]
pub fn try_parse_report(bundle_json: &str) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let details = report_fhir::try_parse_report_str(bundle_json)
        .map_err(|err| JsValue::from_str(&format_report_error(&err)))?;
    details_to_js(&details)
}

fn details_to_js(details: &DiagnosticReportDetails) -> Result<JsValue, JsValue> {
    to_value(details).map_err(|err| JsValue::from_str(&format!("Could not serialize report: {err}")))
}

fn format_report_error(err: &ReportError) -> String {
    format!("Report error: {err}")
}
