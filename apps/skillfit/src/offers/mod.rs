//! Job offers: PDF extraction, mailbox retrieval and the SQLite repository.

pub mod extractor;
pub mod prompts;
pub mod repository;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::collector::mail::{attachment_bytes, MailSource};
use crate::documents::DocumentKind;
use crate::llm_client::ChatCompletion;
use crate::models::offer::ExtractedOffer;
use crate::offers::extractor::{extract_offer, save_offer};
use crate::storage::json_file;

/// Mailbox search used to find offer announcements.
pub const OFFER_QUERY: &str = "subject:annonce has:attachment";

/// Reads an extracted offer file.
pub fn load_offer(path: &Path) -> Result<ExtractedOffer> {
    if !path.is_file() {
        bail!("offer file not found: {}", path.display());
    }
    json_file::read(path)
}

/// Offer PDFs pulled from the mailbox in one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchSummary {
    pub scanned: usize,
    pub downloaded: usize,
    pub extracted: usize,
    /// Offers written with the placeholder body.
    pub placeholders: usize,
    pub failed: usize,
    pub offer_files: Vec<PathBuf>,
}

/// Downloads PDF attachments of announcement emails into `<data_dir>/offers/downloads`
/// and writes one extracted JSON per PDF into `out_dir`.
pub async fn fetch_offers(
    mail: &dyn MailSource,
    llm: &dyn ChatCompletion,
    max_emails: u32,
    data_dir: &Path,
    out_dir: &Path,
) -> Result<FetchSummary> {
    let downloads = data_dir.join("offers").join("downloads");
    std::fs::create_dir_all(&downloads)
        .with_context(|| format!("creating {}", downloads.display()))?;

    let message_ids = mail
        .list_messages(max_emails, Some(OFFER_QUERY))
        .await
        .context("listing offer emails")?;
    let mut summary = FetchSummary {
        scanned: message_ids.len(),
        ..Default::default()
    };
    if message_ids.is_empty() {
        info!("no offer email found");
        return Ok(summary);
    }

    for message_id in &message_ids {
        let message = match mail.get_message(message_id).await {
            Ok(m) => m,
            Err(e) if e.is_fatal() => return Err(e).context("fetching offer email"),
            Err(e) => {
                warn!(message_id = %message_id, error = %e, "cannot fetch offer email, skipping");
                summary.failed += 1;
                continue;
            }
        };

        let pdfs = message.attachments.iter().filter(|a| {
            DocumentKind::from_name(&a.filename) == Some(DocumentKind::Pdf)
                || a.mime_type.as_deref() == Some("application/pdf")
        });
        for attachment in pdfs {
            let Some(name) = Path::new(&attachment.filename)
                .file_name()
                .and_then(|n| n.to_str())
            else {
                warn!(filename = %attachment.filename, "unusable attachment name, skipping");
                summary.failed += 1;
                continue;
            };

            let bytes = match attachment_bytes(mail, message_id, attachment).await {
                Ok(b) => b,
                Err(e) if e.is_fatal() => return Err(e).context("downloading offer PDF"),
                Err(e) => {
                    warn!(filename = %name, error = %e, "offer download failed");
                    summary.failed += 1;
                    continue;
                }
            };
            let pdf_path = downloads.join(name);
            std::fs::write(&pdf_path, &bytes)
                .with_context(|| format!("writing {}", pdf_path.display()))?;
            summary.downloaded += 1;
            info!(path = %pdf_path.display(), "offer PDF downloaded");

            match extract_offer(llm, &pdf_path).await {
                Ok(offer) => {
                    if offer.is_placeholder() {
                        summary.placeholders += 1;
                    } else {
                        summary.extracted += 1;
                    }
                    summary.offer_files.push(save_offer(&offer, out_dir)?);
                }
                Err(e) if e.is_fatal() => {
                    return Err(anyhow::Error::new(e).context("offer extraction aborted"));
                }
                Err(e) => {
                    warn!(filename = %name, error = %e, "offer extraction failed");
                    summary.failed += 1;
                }
            }
        }
    }

    info!(
        downloaded = summary.downloaded,
        extracted = summary.extracted,
        placeholders = summary.placeholders,
        failed = summary.failed,
        "offer fetch complete"
    );
    Ok(summary)
}

/// Default directory for extracted offer JSON files.
pub fn default_out_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("offers").join("extracted")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mail::testing::StubMailbox;
    use crate::llm_client::testing::ScriptedLlm;
    use crate::models::offer::{InvalidOffer, OfferBody};

    #[test]
    fn test_load_offer_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_offer(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("offer file not found"));
    }

    #[test]
    fn test_load_offer_reads_placeholder_and_parsed_files() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.json");
        std::fs::write(
            &broken,
            r#"{"error": "Invalid JSON returned by LLM", "raw": "???", "filename": "b.pdf", "offer_date": "2025-11-20"}"#,
        )
        .unwrap();
        let offer = load_offer(&broken).unwrap();
        assert_eq!(offer.body, OfferBody::Invalid(InvalidOffer::new("???")));

        let good = dir.path().join("good.json");
        std::fs::write(
            &good,
            r#"{"title": "Statisticien", "skills": "R", "offer_id": 7, "filename": "g.pdf"}"#,
        )
        .unwrap();
        let offer = load_offer(&good).unwrap();
        assert_eq!(offer.offer_id().as_deref(), Some("7"));
        assert_eq!(offer.draft().unwrap().skills, vec!["R"]);
        assert_eq!(offer.offer_date, None);
    }

    #[tokio::test]
    async fn test_fetch_offers_counts_failures_and_keeps_going() {
        let dir = tempfile::tempdir().unwrap();
        let mail = StubMailbox::new()
            .with_message(
                "o1",
                "Annonce Statisticien",
                "Thu, 27 Nov 2025 10:15:00 +0100",
                vec![("annonce.pdf", b"not really a pdf".to_vec()), ("logo.png", vec![0])],
            )
            .with_message("o2", "Annonce vide", "Thu, 27 Nov 2025 10:15:00 +0100", vec![]);
        let llm = ScriptedLlm::replying(&[]);
        let out = default_out_dir(dir.path());

        let summary = fetch_offers(&mail, &llm, 10, dir.path(), &out).await.unwrap();
        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.failed, 1);
        assert!(summary.offer_files.is_empty());
        assert!(dir.path().join("offers/downloads/annonce.pdf").is_file());
        assert_eq!(
            mail.queries.lock().unwrap().as_slice(),
            &[Some(OFFER_QUERY.to_string())]
        );
    }
}
