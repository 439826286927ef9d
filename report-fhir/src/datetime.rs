//! FHIR `dateTime` parsing and human-readable rendering.

use chrono::{DateTime, FixedOffset, NaiveDate};

/// A FHIR `dateTime` at whatever precision the source gave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FhirDateTime {
    Year(i32),
    YearMonth(NaiveDate),
    Date(NaiveDate),
    Instant(DateTime<FixedOffset>),
}

impl FhirDateTime {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.len() {
            4 => value.parse().ok().map(FhirDateTime::Year),
            7 => NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d")
                .ok()
                .map(FhirDateTime::YearMonth),
            10 => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(FhirDateTime::Date),
            _ => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(FhirDateTime::Instant),
        }
    }

    /// Render for display, e.g. `May 1, 2022, 2:30:00 PM`.
    ///
    /// Instants keep the offset they were recorded with.
    pub fn to_human_display(&self) -> String {
        match self {
            FhirDateTime::Year(year) => year.to_string(),
            FhirDateTime::YearMonth(date) => date.format("%b %Y").to_string(),
            FhirDateTime::Date(date) => date.format("%b %-d, %Y").to_string(),
            FhirDateTime::Instant(instant) => {
                instant.format("%b %-d, %Y, %-I:%M:%S %p").to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(value: &str) -> Option<String> {
        FhirDateTime::parse(value).map(|dt| dt.to_human_display())
    }

    #[test]
    fn renders_each_precision() {
        assert_eq!(display("2022").as_deref(), Some("2022"));
        assert_eq!(display("2022-05").as_deref(), Some("May 2022"));
        assert_eq!(display("2022-05-01").as_deref(), Some("May 1, 2022"));
        assert_eq!(
            display("2022-05-01T14:30:00+02:00").as_deref(),
            Some("May 1, 2022, 2:30:00 PM")
        );
        assert_eq!(
            display("2013-04-02T09:30:10.123Z").as_deref(),
            Some("Apr 2, 2013, 9:30:10 AM")
        );
    }

    #[test]
    fn rejects_malformed_values() {
        assert_eq!(display(""), None);
        assert_eq!(display("2022-13"), None);
        assert_eq!(display("yesterday"), None);
        assert_eq!(display("2022-05-01T14:30:00"), None);
    }
}
