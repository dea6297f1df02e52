//! Candidate store: one pretty-printed JSON array per job title and day.
//!
//! Single-writer: every append rewrites the whole file. An unreadable file is
//! renamed aside with a timestamp suffix and the store restarts empty.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde_json::Value;
use tracing::{info, warn};

use crate::models::candidate::CandidateRecord;
use crate::storage::identifiers::{next_ids, NextIds};
use crate::storage::json_file;
use crate::storage::normalizer::normalize_value;

/// In-memory view of a candidate store file plus an index of ingested message ids.
#[derive(Debug)]
pub struct CandidateStore {
    path: PathBuf,
    records: Vec<CandidateRecord>,
    processed: HashSet<String>,
}

impl CandidateStore {
    /// Loads `path`, recovering from corruption. Never fails.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = load_records(&path);
        let processed = records
            .iter()
            .filter_map(|r| r.source_email_id().map(str::to_string))
            .collect();
        Self {
            path,
            records,
            processed,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True iff a stored record came from `message_id`.
    pub fn is_already_processed(&self, message_id: &str) -> bool {
        self.processed.contains(message_id)
    }

    pub fn next_ids(&self) -> NextIds {
        next_ids(&self.records)
    }

    /// Appends one record and rewrites the file.
    pub fn append(&mut self, record: CandidateRecord) -> Result<()> {
        let source = record.source_email_id().map(str::to_string);
        self.records.push(record);
        if let Err(e) = write_records(&self.path, &self.records) {
            self.records.pop();
            return Err(e);
        }
        if let Some(id) = source {
            self.processed.insert(id);
        }
        Ok(())
    }
}

/// Reads a store file into normalized records.
///
/// Missing or blank file → empty. Invalid JSON (or a non-array document) →
/// the file is renamed to `<name>.backup_<YYYYmmdd_HHMMSS>` and the result is empty.
pub fn load_records(path: &Path) -> Vec<CandidateRecord> {
    if !path.exists() {
        return Vec::new();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read candidate store, treating as empty");
            return Vec::new();
        }
    };
    if content.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| normalize_value(item, None))
            .collect(),
        Ok(_) => {
            warn!(path = %path.display(), "candidate store is not a JSON array");
            set_aside(path);
            Vec::new()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "candidate store is corrupt");
            set_aside(path);
            Vec::new()
        }
    }
}

/// Reads a candidate file given as a run input.
///
/// Unlike [`load_records`] nothing is recovered or moved: a missing file or
/// invalid JSON is an error and the file is left as it is. Non-object entries
/// are skipped.
pub fn read_candidate_file(path: &Path) -> Result<Vec<CandidateRecord>> {
    if !path.is_file() {
        anyhow::bail!("candidate file not found: {}", path.display());
    }
    let items: Vec<Value> = json_file::read(path)
        .with_context(|| format!("candidate file {} is not a JSON array", path.display()))?;
    Ok(items
        .into_iter()
        .filter_map(|item| normalize_value(item, None))
        .collect())
}

/// File-scanning duplicate check: true iff any stored record came from `message_id`.
pub fn is_already_processed(path: &Path, message_id: &str) -> bool {
    load_records(path)
        .iter()
        .any(|r| r.source_email_id() == Some(message_id))
}

/// Writes `records` as a pretty-printed UTF-8 JSON array, atomically.
pub fn write_records(path: &Path, records: &[CandidateRecord]) -> Result<()> {
    json_file::write_pretty(path, records).context("writing candidate store")
}

fn set_aside(path: &Path) {
    let backup = backup_path(path);
    match std::fs::rename(path, &backup) {
        Ok(()) => info!(backup = %backup.display(), "corrupt candidate store moved aside"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to move corrupt store aside"),
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".backup_{stamp}"));
    PathBuf::from(name)
}
