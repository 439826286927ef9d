//! Matching report result references against bundle entries.

use crate::bundle::{Bundle, Observation, Resource};

const OBSERVATION_PREFIX: &str = "Observation/";

/// Id targeted by a reference such as `Observation/123`.
///
/// Everything after the first `Observation/` is the id; a reference without
/// that separator is taken whole.
pub fn observation_id(reference: &str) -> &str {
    reference
        .split_once(OBSERVATION_PREFIX)
        .map_or(reference, |(_, id)| id)
}

/// First Observation in entry order whose id matches the reference.
///
/// When that first match is an observation that failed to decode, the
/// reference resolves to nothing.
pub fn resolve_observation<'a>(reference: &str, bundle: &'a Bundle) -> Option<&'a Observation> {
    let id = observation_id(reference);
    bundle
        .resources()
        .find_map(|resource| match resource {
            Resource::Observation(observation) if observation.id.as_deref() == Some(id) => {
                Some(Some(observation.as_ref()))
            }
            Resource::Invalid(invalid)
                if invalid.resource_type == "Observation" && invalid.id.as_deref() == Some(id) =>
            {
                tracing::debug!(
                    reference,
                    error = %invalid.error,
                    "referenced observation could not be decoded"
                );
                Some(None)
            }
            _ => None,
        })
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::parse_bundle;

    fn bundle() -> Bundle {
        parse_bundle(
            r#"{"resourceType": "Bundle", "entry": [
                {"resource": {"resourceType": "Observation", "id": "a", "code": {"text": "first"}}},
                {"resource": {"resourceType": "Specimen", "id": "b"}},
                {"resource": {"resourceType": "Observation", "code": {"text": "no id"}}},
                {"resource": {"resourceType": "Observation", "id": "a", "code": {"text": "duplicate"}}},
                {"resource": {"resourceType": "Observation", "id": "c", "code": {"text": "third"}}}
            ]}"#,
        )
        .unwrap()
    }

    fn name_of(observation: Option<&Observation>) -> Option<&str> {
        observation?.code.text.as_deref()
    }

    #[test]
    fn extracts_id_after_separator() {
        assert_eq!(observation_id("Observation/123"), "123");
        assert_eq!(observation_id("https://fhir.example/Observation/r1"), "r1");
        assert_eq!(observation_id("urn:uuid:42"), "urn:uuid:42");
    }

    #[test]
    fn first_match_wins_for_duplicate_ids() {
        let bundle = bundle();
        assert_eq!(
            name_of(resolve_observation("Observation/a", &bundle)),
            Some("first")
        );
        assert_eq!(
            name_of(resolve_observation("Observation/c", &bundle)),
            Some("third")
        );
    }

    #[test]
    fn undecodable_first_match_resolves_to_nothing() {
        let bundle = parse_bundle(
            r#"{"resourceType": "Bundle", "entry": [
                {"resource": {"resourceType": "Observation", "id": "x", "referenceRange": {}}},
                {"resource": {"resourceType": "Observation", "id": "x", "code": {"text": "later"}}},
                {"resource": {"resourceType": "Observation", "id": "y", "code": {"text": "fine"}}}
            ]}"#,
        )
        .unwrap();
        assert!(resolve_observation("Observation/x", &bundle).is_none());
        assert_eq!(
            name_of(resolve_observation("Observation/y", &bundle)),
            Some("fine")
        );
    }

    #[test]
    fn only_observations_are_candidates() {
        let bundle = bundle();
        assert!(resolve_observation("Observation/b", &bundle).is_none());
        assert!(resolve_observation("Observation/missing", &bundle).is_none());
    }
}
