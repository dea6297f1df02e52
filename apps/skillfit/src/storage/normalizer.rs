//! Record normalizer: turns an LLM/JSON mapping into a complete `CandidateRecord`.
//!
//! Only absent keys are touched: a missing scalar becomes null, a missing list
//! becomes `[]`, appended after the keys already present. Values that are
//! present stay exactly as written, whatever their shape.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::candidate::{CandidateRecord, CANONICAL_FIELDS, LIST_FIELDS};

/// Builds a complete record from a raw mapping.
///
/// `job_applied_for` fills the position only when the mapping has none.
pub fn normalize_candidate(mut raw: Map<String, Value>, job_applied_for: Option<&str>) -> CandidateRecord {
    let mut filled = 0;
    for key in CANONICAL_FIELDS {
        if raw.contains_key(key) {
            continue;
        }
        let default = if key == "job_applied_for" {
            job_applied_for.map_or(Value::Null, |job| Value::String(job.to_string()))
        } else if LIST_FIELDS.contains(&key) {
            Value::Array(Vec::new())
        } else {
            Value::Null
        };
        raw.insert(key.to_string(), default);
        filled += 1;
    }
    if filled > 0 {
        debug!(filled, "missing candidate fields defaulted");
    }
    CandidateRecord::from(raw)
}

/// Same as [`normalize_candidate`] for an arbitrary JSON value; non-objects yield `None`.
pub fn normalize_value(value: Value, job_applied_for: Option<&str>) -> Option<CandidateRecord> {
    match value {
        Value::Object(map) => Some(normalize_candidate(map, job_applied_for)),
        other => {
            warn!(kind = value_kind(&other), "candidate entry is not an object, skipping");
            None
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::LINEAGE_FIELDS;
    use serde_json::json;

    fn keys_of(record: &CandidateRecord) -> Vec<String> {
        serde_json::to_value(record)
            .unwrap()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect()
    }

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_mapping_gets_every_canonical_key() {
        let record = normalize_candidate(Map::new(), Some("Statisticien"));
        assert_eq!(keys_of(&record), CANONICAL_FIELDS);
        assert_eq!(record.job_applied_for(), Some("Statisticien"));
        assert_eq!(record.get("technical_skills"), Some(&json!([])));
        assert_eq!(record.get("summary"), Some(&Value::Null));
    }

    #[test]
    fn test_present_values_are_preserved() {
        let raw = as_map(json!({
            "full_name": "Zoé Lefèvre",
            "email": "zoe@example.fr",
            "technical_skills": ["R", "SAS"],
            "languages": [{"language": "Français", "level": "natif"}],
            "experiences": [{
                "title": "Statisticienne",
                "company": "INSEE",
                "start_date": "2021-09",
                "end_date": null,
                "skills": ["R"]
            }],
            "summary": "Analyste"
        }));
        let record = normalize_candidate(raw.clone(), None);
        for (key, value) in &raw {
            assert_eq!(record.get(key), Some(value), "{key} changed");
        }
        assert_eq!(record.technical_skills(), vec!["R", "SAS"]);
        assert_eq!(record.languages()[0].level.as_deref(), Some("natif"));
        assert_eq!(record.experiences()[0].company.as_deref(), Some("INSEE"));
        assert!(record.job_applied_for().is_none());
    }

    #[test]
    fn test_loosely_typed_values_are_kept_as_written() {
        let raw = as_map(json!({
            "phone_number": 612345678,
            "languages": "English",
            "summary": ["a", "b"],
            "soft_skills": "rigueur",
            "application_datetime": "27/11/2025 10:00",
            "cv_id": 7
        }));
        let record = normalize_candidate(raw.clone(), None);
        let out = serde_json::to_value(&record).unwrap();
        for (key, value) in &raw {
            assert_eq!(&out[key], value, "{key} changed");
        }
    }

    #[test]
    fn test_null_position_is_not_overwritten() {
        let raw = as_map(json!({"job_applied_for": null}));
        let record = normalize_candidate(raw, Some("Statisticien"));
        assert_eq!(record.get("job_applied_for"), Some(&Value::Null));
    }

    #[test]
    fn test_existing_position_is_not_overwritten() {
        let raw = as_map(json!({"job_applied_for": "Data Analyst"}));
        let record = normalize_candidate(raw, Some("Statisticien"));
        assert_eq!(record.job_applied_for(), Some("Data Analyst"));
    }

    #[test]
    fn test_key_order_is_lineage_then_encounter_then_missing() {
        let raw = as_map(json!({
            "summary": "x",
            "full_name": "A",
            "hobby": "chess",
            "application_datetime": "2025-01-01T10:00:00",
            "cv_id": "CAND-001"
        }));
        let record = normalize_candidate(raw, None);
        let keys = keys_of(&record);
        let expected = [
            "cv_id",
            "candidate_id",
            "source_email_id",
            "application_datetime",
            "job_applied_for",
            "summary",
            "full_name",
            "hobby",
            "first_name",
            "last_name",
            "email",
            "phone_number",
            "technical_skills",
            "secondary_skills",
            "soft_skills",
            "languages",
            "educations",
            "experiences",
            "interests",
        ];
        assert_eq!(&keys[..5], &LINEAGE_FIELDS);
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_normalize_value_rejects_non_objects() {
        assert!(normalize_value(json!(["not", "an", "object"]), None).is_none());
        assert!(normalize_value(json!({}), None).is_some());
    }
}
