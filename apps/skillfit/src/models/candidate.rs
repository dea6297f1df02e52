use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Keys written first, in this order, whenever a candidate record is serialized.
pub const LINEAGE_FIELDS: [&str; 5] = [
    "cv_id",
    "candidate_id",
    "source_email_id",
    "application_datetime",
    "job_applied_for",
];

/// Every key a normalized candidate record carries.
pub const CANONICAL_FIELDS: [&str; 18] = [
    "cv_id",
    "candidate_id",
    "source_email_id",
    "application_datetime",
    "job_applied_for",
    "first_name",
    "last_name",
    "full_name",
    "email",
    "phone_number",
    "technical_skills",
    "secondary_skills",
    "soft_skills",
    "languages",
    "educations",
    "experiences",
    "interests",
    "summary",
];

/// Canonical keys whose default is an empty list rather than null.
pub const LIST_FIELDS: [&str; 7] = [
    "technical_skills",
    "secondary_skills",
    "soft_skills",
    "languages",
    "educations",
    "experiences",
    "interests",
];

/// One CV as stored in the candidate JSON store.
///
/// The record is the mapping itself: values are stored exactly as they were
/// read, keys keep their encounter order. The typed accessors below are
/// read-only views that tolerate loose shapes (a number for a phone, a bare
/// string for a list) without rewriting what is stored.
///
/// Serialization writes the lineage fields first, then every other key in
/// encounter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateRecord {
    fields: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Language {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for CandidateRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl CandidateRecord {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Replaces a value in place; a new key goes to the end.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key)?.as_str()
    }

    pub fn cv_id(&self) -> Option<&str> {
        self.text("cv_id")
    }

    pub fn candidate_id(&self) -> Option<&str> {
        self.text("candidate_id")
    }

    pub fn source_email_id(&self) -> Option<&str> {
        self.text("source_email_id")
    }

    pub fn job_applied_for(&self) -> Option<&str> {
        self.text("job_applied_for")
    }

    pub fn first_name(&self) -> Option<&str> {
        self.text("first_name")
    }

    pub fn last_name(&self) -> Option<&str> {
        self.text("last_name")
    }

    pub fn full_name(&self) -> Option<&str> {
        self.text("full_name")
    }

    pub fn email(&self) -> Option<&str> {
        self.text("email")
    }

    /// Text or number, as written.
    pub fn phone_number(&self) -> Option<String> {
        self.fields.get("phone_number").and_then(scalar_text)
    }

    pub fn summary(&self) -> Option<&str> {
        self.text("summary")
    }

    /// `None` when absent or not in a recognised format.
    pub fn application_datetime(&self) -> Option<NaiveDateTime> {
        parse_application_datetime(self.text("application_datetime")?)
    }

    pub fn technical_skills(&self) -> Vec<String> {
        self.string_list("technical_skills")
    }

    pub fn secondary_skills(&self) -> Vec<String> {
        self.string_list("secondary_skills")
    }

    pub fn soft_skills(&self) -> Vec<String> {
        self.string_list("soft_skills")
    }

    pub fn interests(&self) -> Vec<String> {
        self.string_list("interests")
    }

    pub fn languages(&self) -> Vec<Language> {
        self.entries("languages", "language")
    }

    pub fn educations(&self) -> Vec<Education> {
        self.entries("educations", "title")
    }

    pub fn experiences(&self) -> Vec<Experience> {
        self.entries("experiences", "title")
    }

    /// A bare string reads as a one-item list; non-scalar items are skipped.
    fn string_list(&self, key: &str) -> Vec<String> {
        match self.fields.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
            Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
            _ => Vec::new(),
        }
    }

    /// Typed entries; a bare string reads as an entry with `text_key` set to it.
    fn entries<T: DeserializeOwned>(&self, key: &str, text_key: &str) -> Vec<T> {
        let Some(Value::Array(items)) = self.fields.get(key) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| {
                let item = match item {
                    Value::String(s) => {
                        let mut map = Map::new();
                        map.insert(text_key.to_string(), Value::String(s.clone()));
                        Value::Object(map)
                    }
                    other => other.clone(),
                };
                serde_json::from_value::<T>(item).ok()
            })
            .collect()
    }

    /// `full_name`, or first + last joined, or empty.
    pub fn display_name(&self) -> String {
        if let Some(full) = self.full_name().filter(|n| !n.trim().is_empty()) {
            return full.trim().to_string();
        }
        [self.first_name(), self.last_name()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[cfg(test)]
    pub(crate) fn from_json(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            other => panic!("candidate fixture must be an object, got {other}"),
        }
    }
}

impl Serialize for CandidateRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for key in LINEAGE_FIELDS {
            if let Some(value) = self.fields.get(key) {
                map.serialize_entry(key, value)?;
            }
        }
        for (key, value) in &self.fields {
            if !LINEAGE_FIELDS.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CandidateRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(Self::from)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Timestamp text as written into candidate stores.
pub fn format_application_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Parses the timestamp formats found in candidate stores:
/// naive ISO (`2025-01-01T09:30:00`), RFC 3339 with offset, or a bare date.
pub fn parse_application_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = raw.parse::<NaiveDateTime>() {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_name_prefers_full_name() {
        let record = CandidateRecord::from_json(json!({"full_name": "Zoé Lefèvre", "first_name": "Z"}));
        assert_eq!(record.display_name(), "Zoé Lefèvre");
    }

    #[test]
    fn test_display_name_falls_back_to_parts() {
        let record = CandidateRecord::from_json(json!({"first_name": "Jean", "last_name": "Dupont"}));
        assert_eq!(record.display_name(), "Jean Dupont");
        assert_eq!(CandidateRecord::default().display_name(), "");
    }

    #[test]
    fn test_parse_application_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(parse_application_datetime("2025-01-02T09:30:00"), Some(expected));
        assert_eq!(
            parse_application_datetime("2025-01-02T09:30:00+01:00"),
            Some(expected)
        );
        assert_eq!(parse_application_datetime("2025-01-02 09:30:00"), Some(expected));
        assert_eq!(
            parse_application_datetime("2025-01-02"),
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_application_datetime("yesterday"), None);
        assert_eq!(
            format_application_datetime(expected),
            "2025-01-02T09:30:00"
        );
    }

    #[test]
    fn test_loose_values_read_leniently_but_stay_stored() {
        let raw = json!({
            "phone_number": 612345678,
            "soft_skills": "rigueur",
            "interests": ["chess", 42, {"bad": 1}],
            "educations": ["Master Statistique"],
            "languages": "English",
            "application_datetime": "27/11/2025 10:00"
        });
        let record = CandidateRecord::from_json(raw.clone());

        assert_eq!(record.phone_number().as_deref(), Some("612345678"));
        assert_eq!(record.soft_skills(), vec!["rigueur"]);
        assert_eq!(record.interests(), vec!["chess", "42"]);
        assert_eq!(record.educations()[0].title.as_deref(), Some("Master Statistique"));
        assert!(record.languages().is_empty());
        assert!(record.application_datetime().is_none());

        assert_eq!(serde_json::to_value(&record).unwrap(), raw);
    }

    #[test]
    fn test_serialization_puts_lineage_first_then_encounter_order() {
        let record = CandidateRecord::from_json(json!({
            "summary": "x",
            "cv_id": "CAND-001",
            "hobby": "chess",
            "job_applied_for": "Statisticien"
        }));
        let value = serde_json::to_value(&record).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["cv_id", "job_applied_for", "summary", "hobby"]);
    }

    #[test]
    fn test_set_keeps_position_of_existing_key() {
        let mut record = CandidateRecord::from_json(json!({"full_name": "A", "email": null}));
        record.set("email", "a@b.c");
        record.set("hobby", "chess");
        let keys: Vec<&str> = record.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["full_name", "email", "hobby"]);
        assert_eq!(record.email(), Some("a@b.c"));
    }
}
