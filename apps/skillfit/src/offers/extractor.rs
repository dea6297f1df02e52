use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::documents::{clean_text, pdf::extract_pdf_text, DocumentError};
use crate::llm_client::{clean_reply, ChatCompletion, LlmError, Prompt};
use crate::models::offer::{ExtractedOffer, InvalidOffer, OfferBody, OfferDraft};
use crate::offers::prompts::OFFER_SYSTEM_PROMPT;
use crate::storage::json_file;

#[derive(Debug, Error)]
pub enum OfferExtractionError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl OfferExtractionError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, OfferExtractionError::Llm(e) if e.is_fatal())
    }
}

/// Reads an offer PDF and asks the model for its fields.
///
/// A reply that is not a JSON object becomes the placeholder body; only an
/// unreadable PDF or a failed LLM call is an error.
pub async fn extract_offer(
    llm: &dyn ChatCompletion,
    pdf_path: &Path,
) -> Result<ExtractedOffer, OfferExtractionError> {
    let filename = pdf_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!(filename = %filename, "extracting offer");

    let text = clean_text(&extract_pdf_text(pdf_path)?);
    let offer_date = modification_date(pdf_path);
    Ok(extract_offer_from_text(llm, &text, filename, offer_date).await?)
}

/// Same as [`extract_offer`] for text already pulled out of the document.
pub async fn extract_offer_from_text(
    llm: &dyn ChatCompletion,
    text: &str,
    filename: String,
    offer_date: Option<String>,
) -> Result<ExtractedOffer, LlmError> {
    let body = if text.is_empty() {
        warn!(filename = %filename, "offer document has no text");
        OfferBody::Invalid(InvalidOffer::new(""))
    } else {
        let reply = llm
            .complete(Prompt::user(text).with_system(OFFER_SYSTEM_PROMPT))
            .await?;
        parse_offer_reply(&reply)
    };

    if matches!(body, OfferBody::Invalid(_)) {
        warn!(filename = %filename, "offer reply is not valid JSON, keeping placeholder");
    }
    Ok(ExtractedOffer {
        body,
        filename,
        offer_date,
    })
}

/// Parsed fields, or the placeholder holding the cleaned reply.
pub fn parse_offer_reply(reply: &str) -> OfferBody {
    let cleaned = clean_reply(reply);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(value @ Value::Object(_)) => match serde_json::from_value::<OfferDraft>(value) {
            Ok(draft) => OfferBody::Parsed(draft),
            Err(e) => {
                debug!(error = %e, "offer JSON has unexpected field types");
                OfferBody::Invalid(InvalidOffer::new(cleaned))
            }
        },
        _ => OfferBody::Invalid(InvalidOffer::new(cleaned)),
    }
}

/// Local modification date of `path`, `YYYY-MM-DD`.
fn modification_date(path: &Path) -> Option<String> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Local>::from(modified).format("%Y-%m-%d").to_string())
}

/// Writes the offer as `<out_dir>/<pdf stem>.json`.
pub fn save_offer(offer: &ExtractedOffer, out_dir: &Path) -> Result<PathBuf> {
    let stem = Path::new(&offer.filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "offer".to_string());
    let path = out_dir.join(format!("{stem}.json"));
    json_file::write_pretty(&path, offer).with_context(|| format!("saving offer {}", offer.filename))?;
    info!(path = %path.display(), "offer JSON written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedLlm;
    use crate::models::offer::INVALID_OFFER_ERROR;

    const REPLY: &str = r#"{
        "title": "Statisticien (H/F)",
        "description": "Analyse d'enquêtes",
        "responsibilities": ["Modéliser", "Restituer"],
        "skills": ["R", "SAS"],
        "location": "Lyon",
        "experience": "3 ans",
        "contact_email": "rh@example.fr"
    }"#;

    #[tokio::test]
    async fn test_parsed_offer_carries_metadata() {
        let llm = ScriptedLlm::replying(&[REPLY]);
        let offer = extract_offer_from_text(
            &llm,
            "Statisticien H/F à Lyon",
            "annonce.pdf".to_string(),
            Some("2025-11-20".to_string()),
        )
        .await
        .unwrap();

        let draft = offer.draft().unwrap();
        assert_eq!(draft.title.as_deref(), Some("Statisticien (H/F)"));
        assert_eq!(draft.experience, Some(3));
        assert_eq!(offer.filename, "annonce.pdf");
        assert_eq!(offer.offer_date.as_deref(), Some("2025-11-20"));
    }

    #[tokio::test]
    async fn test_invalid_reply_becomes_placeholder() {
        let llm = ScriptedLlm::replying(&["Voici l'offre :\u{0007} titre Statisticien"]);
        let offer = extract_offer_from_text(&llm, "texte", "a.pdf".to_string(), None)
            .await
            .unwrap();
        assert!(offer.is_placeholder());

        let json = serde_json::to_value(&offer).unwrap();
        assert_eq!(json["error"], INVALID_OFFER_ERROR);
        assert_eq!(json["raw"], "Voici l'offre : titre Statisticien");
        assert_eq!(json["filename"], "a.pdf");
    }

    #[tokio::test]
    async fn test_empty_text_skips_the_model() {
        let llm = ScriptedLlm::replying(&[]);
        let offer = extract_offer_from_text(&llm, "", "blank.pdf".to_string(), None)
            .await
            .unwrap();
        assert!(offer.is_placeholder());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_fatal() {
        let llm = ScriptedLlm::new(vec![Err(LlmError::MissingApiKey)]);
        let err = extract_offer_from_text(&llm, "texte", "a.pdf".to_string(), None)
            .await
            .unwrap_err();
        assert!(OfferExtractionError::from(err).is_fatal());
    }

    #[tokio::test]
    async fn test_unreadable_pdf_is_document_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        let llm = ScriptedLlm::replying(&[]);

        let err = extract_offer(&llm, &path).await.unwrap_err();
        assert!(matches!(err, OfferExtractionError::Document(_)));
        assert!(!err.is_fatal());
        assert_eq!(llm.calls(), 0);
    }

    #[test]
    fn test_fenced_and_array_replies() {
        assert!(matches!(
            parse_offer_reply("```json\n{\"title\": \"Data Analyst\"}\n```"),
            OfferBody::Parsed(_)
        ));
        assert!(matches!(parse_offer_reply("[1, 2]"), OfferBody::Invalid(_)));
        assert!(matches!(parse_offer_reply("{\"title\": 42}"), OfferBody::Invalid(_)));
    }

    #[test]
    fn test_save_offer_uses_pdf_stem_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let offer = ExtractedOffer {
            body: parse_offer_reply(REPLY),
            filename: "annonce_data.pdf".to_string(),
            offer_date: Some("2025-11-20".to_string()),
        };
        let path = save_offer(&offer, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("annonce_data.json"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Analyse d'enquêtes"));
        let reloaded: ExtractedOffer = json_file::read(&path).unwrap();
        assert_eq!(reloaded, offer);
    }
}
