use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::FromRow;

/// Message written in place of an offer when the model reply is not JSON.
pub const INVALID_OFFER_ERROR: &str = "Invalid JSON returned by LLM";

/// Offer fields as produced by the extraction model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub responsibilities: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub skills: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Required experience in years.
    #[serde(default, deserialize_with = "lenient_years")]
    pub experience: Option<u32>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Placeholder kept when extraction produced no usable JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidOffer {
    pub error: String,
    pub raw: String,
}

impl InvalidOffer {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            error: INVALID_OFFER_ERROR.to_string(),
            raw: raw.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OfferBody {
    Invalid(InvalidOffer),
    Parsed(OfferDraft),
}

/// One extracted offer file: the body plus where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedOffer {
    #[serde(flatten)]
    pub body: OfferBody,
    pub filename: String,
    /// Source file modification date, `YYYY-MM-DD`.
    #[serde(default)]
    pub offer_date: Option<String>,
}

impl ExtractedOffer {
    pub fn draft(&self) -> Option<&OfferDraft> {
        match &self.body {
            OfferBody::Parsed(draft) => Some(draft),
            OfferBody::Invalid(_) => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.body, OfferBody::Invalid(_))
    }

    /// `offer_id` carried by the file, if any (string or number).
    pub fn offer_id(&self) -> Option<String> {
        match self.draft()?.extra.get("offer_id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// `offer_title` when present, else `title`.
    pub fn offer_title(&self) -> Option<String> {
        let draft = self.draft()?;
        draft
            .extra
            .get("offer_title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| draft.title.clone())
    }
}

/// Values written by insert and update. The id and timestamps are repository-owned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewOffer {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub experience_years: Option<i64>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub offer_date: Option<String>,
}

impl NewOffer {
    /// `None` for a placeholder. A missing title falls back to the file name.
    pub fn from_extracted(extracted: &ExtractedOffer) -> Option<Self> {
        let draft = extracted.draft()?;
        let title = draft
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| extracted.filename.clone());
        Some(Self {
            title,
            description: draft.description.clone(),
            responsibilities: draft.responsibilities.clone(),
            skills: draft.skills.clone(),
            location: draft.location.clone(),
            experience_years: draft.experience.map(i64::from),
            contact_email: draft.contact_email.clone(),
            filename: Some(extracted.filename.clone()),
            offer_date: extracted.offer_date.clone(),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct OfferRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub responsibilities: Json<Vec<String>>,
    pub skills: Json<Vec<String>>,
    pub location: Option<String>,
    pub experience_years: Option<i64>,
    pub contact_email: Option<String>,
    pub filename: Option<String>,
    pub offer_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A persisted offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: i64,
    pub reference: String,
    pub title: String,
    pub description: Option<String>,
    pub responsibilities: Vec<String>,
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub experience_years: Option<i64>,
    pub contact_email: Option<String>,
    pub filename: Option<String>,
    pub offer_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<OfferRow> for Offer {
    fn from(row: OfferRow) -> Self {
        Self {
            id: row.id,
            reference: offer_reference(row.id),
            title: row.title,
            description: row.description,
            responsibilities: row.responsibilities.0,
            skills: row.skills.0,
            location: row.location,
            experience_years: row.experience_years,
            contact_email: row.contact_email,
            filename: row.filename,
            offer_date: row.offer_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Human-facing offer reference, `OFFRE-007`.
pub fn offer_reference(id: i64) -> String {
    format!("OFFRE-{id:03}")
}

/// A list, a single string, or null.
fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

/// `3`, `3.0`, `"3"` and `"3 ans"` all read as 3 years. Anything else is unknown.
fn lenient_years<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().ok()
        }
        _ => None,
    })
}
