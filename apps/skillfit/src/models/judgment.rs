use serde::{Deserialize, Deserializer, Serialize};

/// Match tier, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl MatchLevel {
    /// Rubric bands: VERY_HIGH 80-100, HIGH 60-79, MEDIUM 40-59, LOW 0-39.
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => MatchLevel::VeryHigh,
            60..=79 => MatchLevel::High,
            40..=59 => MatchLevel::Medium,
            _ => MatchLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchLevel::Low => "LOW",
            MatchLevel::Medium => "MEDIUM",
            MatchLevel::High => "HIGH",
            MatchLevel::VeryHigh => "VERY_HIGH",
        }
    }
}

impl std::fmt::Display for MatchLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The model's verdict on one offer/candidate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    #[serde(deserialize_with = "deserialize_score")]
    pub matching_score: u8,
    pub matching_level: MatchLevel,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

/// Accepts integers, floats and numeric strings; clamps into 0..=100.
fn deserialize_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    let raw = match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| D::Error::custom(format!("matching_score is not a number: {value}")))?;

    Ok(raw.round().clamp(0.0, 100.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(MatchLevel::VeryHigh > MatchLevel::High);
        assert!(MatchLevel::High > MatchLevel::Medium);
        assert!(MatchLevel::Medium > MatchLevel::Low);
    }

    #[test]
    fn test_from_score_bands() {
        assert_eq!(MatchLevel::from_score(100), MatchLevel::VeryHigh);
        assert_eq!(MatchLevel::from_score(80), MatchLevel::VeryHigh);
        assert_eq!(MatchLevel::from_score(79), MatchLevel::High);
        assert_eq!(MatchLevel::from_score(60), MatchLevel::High);
        assert_eq!(MatchLevel::from_score(59), MatchLevel::Medium);
        assert_eq!(MatchLevel::from_score(40), MatchLevel::Medium);
        assert_eq!(MatchLevel::from_score(39), MatchLevel::Low);
        assert_eq!(MatchLevel::from_score(0), MatchLevel::Low);
    }

    #[test]
    fn test_judgment_deserializes_reply_contract() {
        let json = r#"{
            "matching_score": 85,
            "matching_level": "VERY_HIGH",
            "rationale": "Profil très adapté",
            "key_points": ["R", "SAS"]
        }"#;
        let judgment: Judgment = serde_json::from_str(json).unwrap();
        assert_eq!(judgment.matching_score, 85);
        assert_eq!(judgment.matching_level, MatchLevel::VeryHigh);
        assert_eq!(judgment.key_points.len(), 2);
    }

    #[test]
    fn test_score_is_clamped_and_coerced() {
        let judgment: Judgment =
            serde_json::from_str(r#"{"matching_score": "140", "matching_level": "HIGH"}"#).unwrap();
        assert_eq!(judgment.matching_score, 100);
        assert!(judgment.rationale.is_empty());

        let judgment: Judgment =
            serde_json::from_str(r#"{"matching_score": 62.6, "matching_level": "HIGH"}"#).unwrap();
        assert_eq!(judgment.matching_score, 63);
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        let result: Result<Judgment, _> =
            serde_json::from_str(r#"{"matching_score": 50, "matching_level": "GREAT"}"#);
        assert!(result.is_err());
    }
}
