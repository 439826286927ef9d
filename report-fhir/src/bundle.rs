//! Typed view of the FHIR resources the report pipeline reads.
//!
//! Only the fields the projection needs are modelled; everything else in the
//! JSON is ignored. Resource kinds outside the pipeline collapse into
//! [`Resource::Other`]; a report or observation that does not decode becomes
//! [`Resource::Invalid`] so the rest of the bundle stays usable.

use report_core::ReportError;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// Parse raw JSON text into a [`Bundle`].
pub fn parse_bundle(bundle_json: &str) -> Result<Bundle, ReportError> {
    let value: Value =
        serde_json::from_str(bundle_json).map_err(|err| ReportError::Parse(err.to_string()))?;
    Bundle::from_value(value)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Bundle {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub bundle_type: Option<String>,
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

impl Bundle {
    /// Build a bundle from an already decoded JSON document.
    pub fn from_value(value: Value) -> Result<Self, ReportError> {
        match value.get("resourceType").and_then(Value::as_str) {
            Some("Bundle") => {}
            Some(other) => return Err(ReportError::NotABundle(other.to_string())),
            None => return Err(ReportError::NotABundle("a document without resourceType".into())),
        }
        serde_json::from_value(value).map_err(|err| ReportError::Parse(err.to_string()))
    }

    /// Resources in entry order, skipping entries that carry none.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entry.iter().filter_map(|entry| entry.resource.as_ref())
    }

    pub fn first_diagnostic_report(&self) -> Option<&DiagnosticReport> {
        self.resources().find_map(|resource| match resource {
            Resource::DiagnosticReport(report) => Some(report.as_ref()),
            _ => None,
        })
    }

    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.resources().filter_map(|resource| match resource {
            Resource::Observation(observation) => Some(observation.as_ref()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    pub full_url: Option<String>,
    pub resource: Option<Resource>,
}

/// The resource kinds the pipeline distinguishes.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    DiagnosticReport(Box<DiagnosticReport>),
    Observation(Box<Observation>),
    /// A report or observation whose JSON did not fit the model.
    Invalid(InvalidResource),
    /// Any other `resourceType`, kept by name only.
    Other(String),
}

/// What is left of a resource that failed to decode.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidResource {
    pub resource_type: String,
    pub id: Option<String>,
    pub error: String,
}

impl Resource {
    /// Decode one entry resource.
    ///
    /// A malformed report or observation becomes [`Resource::Invalid`]
    /// instead of failing the surrounding bundle.
    pub fn from_value(value: Value) -> Self {
        let kind = value
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let decoded = match kind.as_str() {
            "DiagnosticReport" => serde_json::from_value(value.clone())
                .map(|report| Resource::DiagnosticReport(Box::new(report))),
            "Observation" => serde_json::from_value(value.clone())
                .map(|observation| Resource::Observation(Box::new(observation))),
            _ => return Resource::Other(kind),
        };

        decoded.unwrap_or_else(|err| {
            let id = value.get("id").and_then(Value::as_str).map(str::to_string);
            tracing::debug!(
                resource_type = %kind,
                id = ?id,
                error = %err,
                "undecodable resource in bundle"
            );
            Resource::Invalid(InvalidResource {
                resource_type: kind,
                id,
                error: err.to_string(),
            })
        })
    }

    pub fn resource_type(&self) -> &str {
        match self {
            Resource::DiagnosticReport(_) => "DiagnosticReport",
            Resource::Observation(_) => "Observation",
            Resource::Invalid(invalid) => &invalid.resource_type,
            Resource::Other(kind) => kind,
        }
    }
}

// Decoding through `Value` keeps arbitrary-precision numbers intact, which a
// buffered internally tagged enum would not.
impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Resource::from_value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    pub id: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub code: CodeableConcept,
    #[serde(default)]
    pub performer: Vec<Reference>,
    pub effective_date_time: Option<String>,
    pub effective_period: Option<Period>,
    #[serde(default)]
    pub result: Vec<Reference>,
}

/// The `effective[x]` choice of a report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effective<'a> {
    DateTime(&'a str),
    Period(&'a Period),
}

impl DiagnosticReport {
    pub fn effective(&self) -> Option<Effective<'_>> {
        if let Some(date_time) = self.effective_date_time.as_deref() {
            return Some(Effective::DateTime(date_time));
        }
        self.effective_period.as_ref().map(Effective::Period)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub code: CodeableConcept,
    pub value_quantity: Option<Quantity>,
    #[serde(default)]
    pub reference_range: Vec<ReferenceRange>,
    #[serde(default)]
    pub performer: Vec<Reference>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CodeableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,
    pub text: Option<String>,
}

impl CodeableConcept {
    pub fn first_display(&self) -> Option<&str> {
        self.coding.first()?.display.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Coding {
    pub system: Option<String>,
    pub code: Option<String>,
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Reference {
    pub reference: Option<String>,
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Quantity {
    pub value: Option<FhirDecimal>,
    pub unit: Option<String>,
    pub system: Option<String>,
    pub code: Option<String>,
}

/// A FHIR decimal kept as the number text it arrived with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FhirDecimal(Number);

impl FhirDecimal {
    /// The value without exponent notation.
    ///
    /// Plain input is returned untouched, whatever its magnitude. Exponent
    /// input is expanded when it fits a `Decimal`, otherwise it stays as given.
    pub fn to_plain_string(&self) -> String {
        let text = self.0.to_string();
        if !text.contains(['e', 'E']) {
            return text;
        }
        Decimal::from_scientific(&text)
            .map(|decimal| decimal.to_string())
            .unwrap_or(text)
    }

    pub fn to_f64(&self) -> Option<f64> {
        self.0.as_f64()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReferenceRange {
    pub low: Option<Quantity>,
    pub high: Option<Quantity>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Period {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatches_entries_on_resource_type() {
        let bundle = Bundle::from_value(json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                { "resource": { "resourceType": "Patient", "id": "p1" } },
                { "fullUrl": "urn:uuid:1" },
                { "resource": { "resourceType": "Observation", "id": "o1" } },
                { "resource": { "resourceType": "DiagnosticReport", "id": "r1" } }
            ]
        }))
        .unwrap();

        let kinds: Vec<_> = bundle.resources().map(Resource::resource_type).collect();
        assert_eq!(kinds, ["Patient", "Observation", "DiagnosticReport"]);
        assert_eq!(bundle.observations().count(), 1);
        assert_eq!(
            bundle.first_diagnostic_report().and_then(|r| r.id.as_deref()),
            Some("r1")
        );
    }

    #[test]
    fn rejects_non_bundle_documents() {
        let err = parse_bundle(r#"{"resourceType": "Observation", "id": "1"}"#).unwrap_err();
        assert!(matches!(err, ReportError::NotABundle(kind) if kind == "Observation"));

        let err = parse_bundle(r#"{"entry": []}"#).unwrap_err();
        assert!(matches!(err, ReportError::NotABundle(_)));

        let err = parse_bundle("not json").unwrap_err();
        assert!(matches!(err, ReportError::Parse(_)));
    }

    #[test]
    fn malformed_known_resource_is_kept_as_invalid() {
        let bundle = parse_bundle(
            r#"{"resourceType": "Bundle", "entry": [
                {"resource": {"resourceType": "Observation", "id": "bad", "performer": "Dr. Who"}},
                {"resource": {"resourceType": "Observation", "id": "good"}}
            ]}"#,
        )
        .unwrap();

        let first = bundle.resources().next().unwrap();
        assert!(matches!(
            first,
            Resource::Invalid(InvalidResource { resource_type, id: Some(id), .. })
                if resource_type == "Observation" && id == "bad"
        ));
        let ids: Vec<_> = bundle.observations().filter_map(|o| o.id.as_deref()).collect();
        assert_eq!(ids, ["good"]);
    }

    fn first_value(bundle_json: &str) -> Option<FhirDecimal> {
        let bundle = parse_bundle(bundle_json).unwrap();
        let observation = bundle.observations().next()?;
        observation.value_quantity.as_ref()?.value.clone()
    }

    fn observation_with_value(value: &str) -> String {
        format!(
            r#"{{"resourceType": "Bundle", "entry": [
                {{"resource": {{"resourceType": "Observation", "id": "1",
                    "valueQuantity": {{"value": {value}, "unit": "mmol/L"}}}}}}
            ]}}"#
        )
    }

    #[test]
    fn quantity_keeps_decimal_text() {
        let value = first_value(&observation_with_value("5.40")).unwrap();
        assert_eq!(value.to_plain_string(), "5.40");
        assert_eq!(value.to_f64(), Some(5.4));
    }

    #[test]
    fn out_of_range_decimals_still_decode() {
        let huge = first_value(&observation_with_value("123456789012345678901234567890")).unwrap();
        assert_eq!(huge.to_plain_string(), "123456789012345678901234567890");

        let tiny = first_value(&observation_with_value("0.00000000000000000000000000000012")).unwrap();
        assert_eq!(tiny.to_plain_string(), "0.00000000000000000000000000000012");
    }

    #[test]
    fn exponent_values_render_plain() {
        let value = first_value(&observation_with_value("1.8e2")).unwrap();
        assert_eq!(value.to_plain_string(), "180");
        assert_eq!(value.to_f64(), Some(180.0));
    }

    #[test]
    fn effective_prefers_date_time() {
        let report = DiagnosticReport {
            effective_date_time: Some("2022-05-01".into()),
            effective_period: Some(Period::default()),
            ..DiagnosticReport::default()
        };
        assert_eq!(report.effective(), Some(Effective::DateTime("2022-05-01")));

        let report = DiagnosticReport {
            effective_period: Some(Period::default()),
            ..DiagnosticReport::default()
        };
        assert!(matches!(report.effective(), Some(Effective::Period(_))));
        assert_eq!(DiagnosticReport::default().effective(), None);
    }
}
