//! Candidate ingestion: pulls CV attachments from the mailbox, extracts them
//! with the LLM and appends normalized records to the day's candidate store.
//!
//! Runs are idempotent: messages already present in the store are skipped
//! before they are fetched. A missing LLM key or unusable mail credentials
//! abort the run; any other failure only skips the attachment at hand.

pub mod extractor;
pub mod mail;
pub mod paths;
pub mod prompts;
pub mod subject;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collector::extractor::extract_cv;
use crate::collector::mail::{attachment_bytes, Attachment, MailError, MailSource};
use crate::collector::paths::RunPaths;
use crate::collector::subject::{extract_job_title, job_titles_match};
use crate::documents::{self, DocumentError, DocumentKind};
use crate::llm_client::{ChatCompletion, LlmError};
use crate::models::candidate::format_application_datetime;
use crate::storage::{normalize_candidate, CandidateStore};

/// Counters and locations of one ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSummary {
    pub job_title: String,
    pub scanned: usize,
    /// Candidate records appended to the store.
    pub processed: usize,
    /// Messages whose subject names no job, or another job.
    pub filtered: usize,
    /// Messages already ingested by an earlier run.
    pub duplicates: usize,
    /// Attachments with too little text or no usable LLM reply.
    pub skipped: usize,
    pub failed: usize,
    pub cv_dir: PathBuf,
    pub store_file: PathBuf,
}

/// What became of one CV attachment.
#[derive(Debug, Clone, PartialEq)]
enum AttachmentOutcome {
    Stored { cv_id: String, name: String },
    TooShort { chars: usize },
    NoUsableData,
}

#[derive(Debug, Error)]
enum AttachmentError {
    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("attachment name {0:?} is not a usable file name")]
    BadName(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl AttachmentError {
    fn is_fatal(&self) -> bool {
        match self {
            AttachmentError::Mail(e) => e.is_fatal(),
            AttachmentError::Llm(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// Message-level context shared by every attachment of one email.
struct Application<'a> {
    message_id: &'a str,
    job_title: &'a str,
    received_at: NaiveDateTime,
}

/// Scans up to `max_emails` messages and ingests the CVs sent for `job_title`.
pub async fn ingest_candidates(
    mail: &dyn MailSource,
    llm: &dyn ChatCompletion,
    job_title: &str,
    max_emails: u32,
    data_dir: &Path,
) -> Result<IngestSummary> {
    let job_title = job_title.trim();
    if job_title.is_empty() {
        bail!("a target job title is required");
    }

    let paths = RunPaths::for_job(data_dir, job_title, Local::now().date_naive());
    paths.create_dirs()?;
    info!(cv_dir = %paths.cv_dir.display(), store = %paths.store_file.display(), "output paths ready");

    let mut store = CandidateStore::open(&paths.store_file);
    let mut summary = IngestSummary {
        job_title: job_title.to_string(),
        cv_dir: paths.cv_dir.clone(),
        store_file: paths.store_file.clone(),
        ..Default::default()
    };

    let message_ids = mail
        .list_messages(max_emails, None)
        .await
        .context("listing mailbox messages")?;
    summary.scanned = message_ids.len();
    info!("Scanning {} message(s) for '{}'", message_ids.len(), job_title);

    for (i, message_id) in message_ids.iter().enumerate() {
        debug!("Email {}/{} (id={})", i + 1, message_ids.len(), message_id);

        if store.is_already_processed(message_id) {
            info!(message_id = %message_id, "already ingested, skipping");
            summary.duplicates += 1;
            continue;
        }

        let message = match mail.get_message(message_id).await {
            Ok(m) => m,
            Err(e) if e.is_fatal() => return Err(e).context("fetching message"),
            Err(e) => {
                warn!(message_id = %message_id, error = %e, "cannot fetch message, skipping");
                summary.failed += 1;
                continue;
            }
        };

        let subject = message.header("Subject").unwrap_or("No Subject");
        info!(
            message_id = %message_id,
            from = message.header("From").unwrap_or("Unknown"),
            subject,
            "message fetched"
        );

        let Some(subject_title) = extract_job_title(subject) else {
            info!(message_id = %message_id, "no job title in subject, skipping");
            summary.filtered += 1;
            continue;
        };
        if !job_titles_match(&subject_title, job_title) {
            info!(message_id = %message_id, "'{}' does not match '{}', skipping", subject_title, job_title);
            summary.filtered += 1;
            continue;
        }

        let received_at = message
            .header("Date")
            .and_then(parse_date_header)
            .unwrap_or_else(|| Local::now().naive_local());
        let application = Application {
            message_id,
            job_title: &subject_title,
            received_at,
        };

        let cvs: Vec<&Attachment> = message
            .attachments
            .iter()
            .filter(|a| DocumentKind::from_name(&a.filename).is_some())
            .filter(|a| a.attachment_id.is_some() || a.inline_data.is_some())
            .collect();
        if cvs.is_empty() {
            info!(message_id = %message_id, "no CV attachment in this message");
            continue;
        }

        for attachment in cvs {
            info!(filename = %attachment.filename, "CV attachment found");
            match ingest_attachment(mail, llm, &mut store, &paths, &application, attachment).await {
                Ok(AttachmentOutcome::Stored { cv_id, name }) => {
                    info!(cv_id = %cv_id, "candidate added: {}", name);
                    summary.processed += 1;
                }
                Ok(AttachmentOutcome::TooShort { chars }) => {
                    warn!(filename = %attachment.filename, chars, "extracted text too short, skipping");
                    summary.skipped += 1;
                }
                Ok(AttachmentOutcome::NoUsableData) => {
                    warn!(filename = %attachment.filename, "LLM returned no usable data, skipping");
                    summary.skipped += 1;
                }
                Err(e) if e.is_fatal() => {
                    return Err(anyhow::Error::new(e).context("candidate ingestion aborted"));
                }
                Err(e) => {
                    warn!(filename = %attachment.filename, error = %e, "attachment processing failed");
                    summary.failed += 1;
                }
            }
        }
    }

    info!(
        processed = summary.processed,
        filtered = summary.filtered,
        duplicates = summary.duplicates,
        skipped = summary.skipped,
        failed = summary.failed,
        store = %summary.store_file.display(),
        "ingestion complete"
    );
    Ok(summary)
}

async fn ingest_attachment(
    mail: &dyn MailSource,
    llm: &dyn ChatCompletion,
    store: &mut CandidateStore,
    paths: &RunPaths,
    application: &Application<'_>,
    attachment: &Attachment,
) -> Result<AttachmentOutcome, AttachmentError> {
    let file_name = Path::new(&attachment.filename)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AttachmentError::BadName(attachment.filename.clone()))?;

    let bytes = attachment_bytes(mail, application.message_id, attachment).await?;
    let saved = paths.cv_dir.join(format!(
        "{}_{}",
        Local::now().format("%Y%m%d_%H%M%S"),
        file_name
    ));
    std::fs::write(&saved, &bytes).map_err(DocumentError::from)?;
    info!(path = %saved.display(), "CV saved");

    let text = documents::extract_text(&saved)?;
    if documents::is_too_short(&text) {
        return Ok(AttachmentOutcome::TooShort {
            chars: text.chars().count(),
        });
    }

    debug!(chars = text.chars().count(), "sending CV text to the LLM");
    let profile = match extract_cv(llm, &text).await {
        Ok(profile) => profile,
        Err(LlmError::Parse(_) | LlmError::EmptyContent) => {
            return Ok(AttachmentOutcome::NoUsableData)
        }
        Err(e) => return Err(e.into()),
    };

    let mut record = normalize_candidate(profile, Some(application.job_title));
    let ids = store.next_ids();
    record.set("cv_id", ids.cv_id());
    record.set("candidate_id", ids.person_id());
    record.set("source_email_id", application.message_id);
    record.set(
        "application_datetime",
        format_application_datetime(application.received_at),
    );

    let cv_id = ids.cv_id();
    let name = record.display_name();
    store.append(record)?;
    Ok(AttachmentOutcome::Stored { cv_id, name })
}

/// RFC 2822 `Date` header as the sender's wall-clock time.
/// A trailing `(CET)`-style comment is ignored.
pub fn parse_date_header(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let without_comment = match raw.rfind('(') {
        Some(idx) if raw.ends_with(')') => raw[..idx].trim_end(),
        _ => raw,
    };
    DateTime::parse_from_rfc2822(without_comment)
        .ok()
        .map(|dt| dt.naive_local())
}
