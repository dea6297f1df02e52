//! Shortlist exporter: JSON and `;`-separated CSV for both dispositions,
//! plus one JSON sheet per retained candidate.
//!
//! Every run overwrites the previous files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::matching::selector::{ScoredCandidate, Shortlist};
use crate::models::judgment::MatchLevel;
use crate::storage::json_file;

pub const RETAINED_LABEL: &str = "RETENU";
pub const NON_RETAINED_LABEL: &str = "NON RETENU";

pub const RETAINED_JSON: &str = "candidates_retained.json";
pub const NON_RETAINED_JSON: &str = "candidates_non_retained.json";
pub const RETAINED_CSV: &str = "candidates_retained.csv";
pub const NON_RETAINED_CSV: &str = "candidates_non_retained.csv";
pub const SHEETS_DIR: &str = "fiches_candidats";

const CSV_COLUMNS: [&str; 7] = [
    "cv_id",
    "full_name",
    "email",
    "phone",
    "score",
    "level",
    "date_candidature",
];

// ────────────────────────────────────────────────────────────────────────────
// Report rows
// ────────────────────────────────────────────────────────────────────────────

/// Offer identity stamped on every exported row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferRef {
    pub offer_id: Option<String>,
    pub offer_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetainedEntry {
    pub cv_id: Option<String>,
    pub full_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub offer_id: Option<String>,
    pub offer_title: Option<String>,
    pub matching_score: u8,
    pub matching_level: MatchLevel,
    pub application_datetime: Option<NaiveDateTime>,
    pub rationale: String,
    pub key_points: Vec<String>,
    #[serde(rename = "statut")]
    pub disposition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonRetainedEntry {
    pub cv_id: Option<String>,
    pub full_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub offer_id: Option<String>,
    pub matching_score: u8,
    pub matching_level: MatchLevel,
    pub application_datetime: Option<NaiveDateTime>,
    /// The rationale, kept as the rejection reason.
    #[serde(rename = "motif")]
    pub reason: String,
    #[serde(rename = "statut")]
    pub disposition: String,
}

impl RetainedEntry {
    pub fn new(scored: &ScoredCandidate, offer: &OfferRef) -> Self {
        let cv = &scored.candidate;
        Self {
            cv_id: cv.cv_id().map(str::to_string),
            full_name: cv.display_name(),
            email: cv.email().map(str::to_string),
            phone_number: cv.phone_number(),
            offer_id: offer.offer_id.clone(),
            offer_title: offer.offer_title.clone(),
            matching_score: scored.judgment.matching_score,
            matching_level: scored.judgment.matching_level,
            application_datetime: cv.application_datetime(),
            rationale: scored.judgment.rationale.clone(),
            key_points: scored.judgment.key_points.clone(),
            disposition: RETAINED_LABEL.to_string(),
        }
    }

    fn csv_row(&self) -> Vec<String> {
        let mut row = common_row(
            &self.cv_id,
            &self.full_name,
            &self.email,
            &self.phone_number,
            self.matching_score,
            self.matching_level,
            self.application_datetime,
        );
        row.push(self.disposition.clone());
        row
    }
}

impl NonRetainedEntry {
    pub fn new(scored: &ScoredCandidate, offer: &OfferRef) -> Self {
        let cv = &scored.candidate;
        Self {
            cv_id: cv.cv_id().map(str::to_string),
            full_name: cv.display_name(),
            email: cv.email().map(str::to_string),
            phone_number: cv.phone_number(),
            offer_id: offer.offer_id.clone(),
            matching_score: scored.judgment.matching_score,
            matching_level: scored.judgment.matching_level,
            application_datetime: cv.application_datetime(),
            reason: scored.judgment.rationale.clone(),
            disposition: NON_RETAINED_LABEL.to_string(),
        }
    }

    fn csv_row(&self) -> Vec<String> {
        let mut row = common_row(
            &self.cv_id,
            &self.full_name,
            &self.email,
            &self.phone_number,
            self.matching_score,
            self.matching_level,
            self.application_datetime,
        );
        row.push(self.reason.clone());
        row
    }
}

/// Flattened report of one matching run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShortlistReport {
    pub retained: Vec<RetainedEntry>,
    pub non_retained: Vec<NonRetainedEntry>,
}

impl ShortlistReport {
    pub fn new(shortlist: &Shortlist, offer: &OfferRef) -> Self {
        Self {
            retained: shortlist
                .retained
                .iter()
                .map(|s| RetainedEntry::new(s, offer))
                .collect(),
            non_retained: shortlist
                .non_retained
                .iter()
                .map(|s| NonRetainedEntry::new(s, offer))
                .collect(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Writers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportPaths {
    pub retained_json: PathBuf,
    pub non_retained_json: PathBuf,
    pub retained_csv: PathBuf,
    pub non_retained_csv: PathBuf,
    pub sheets_dir: PathBuf,
    pub sheets_written: usize,
}

/// Writes the four list files and the per-candidate sheets under `out_dir`.
pub fn export_report(report: &ShortlistReport, out_dir: &Path) -> Result<ExportPaths> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let retained_json = out_dir.join(RETAINED_JSON);
    json_file::write_pretty(&retained_json, &report.retained)?;
    info!(path = %retained_json.display(), "retained list written");

    let non_retained_json = out_dir.join(NON_RETAINED_JSON);
    json_file::write_pretty(&non_retained_json, &report.non_retained)?;
    info!(path = %non_retained_json.display(), "non-retained list written");

    let retained_csv = out_dir.join(RETAINED_CSV);
    write_csv(
        &retained_csv,
        "statut",
        report.retained.iter().map(RetainedEntry::csv_row),
    )?;

    let non_retained_csv = out_dir.join(NON_RETAINED_CSV);
    write_csv(
        &non_retained_csv,
        "motif",
        report.non_retained.iter().map(NonRetainedEntry::csv_row),
    )?;

    let sheets_dir = out_dir.join(SHEETS_DIR);
    std::fs::create_dir_all(&sheets_dir)
        .with_context(|| format!("creating {}", sheets_dir.display()))?;
    let mut sheets_written = 0;
    for entry in &report.retained {
        let Some(cv_id) = entry.cv_id.as_deref().filter(|id| is_safe_file_stem(id)) else {
            warn!(full_name = %entry.full_name, "retained candidate has no usable cv_id, no sheet written");
            continue;
        };
        json_file::write_pretty(&sheets_dir.join(format!("{cv_id}.json")), entry)?;
        sheets_written += 1;
    }
    info!(dir = %sheets_dir.display(), sheets_written, "candidate sheets written");

    Ok(ExportPaths {
        retained_json,
        non_retained_json,
        retained_csv,
        non_retained_csv,
        sheets_dir,
        sheets_written,
    })
}

/// Reads a `candidates_retained.json` file back.
pub fn load_retained(path: &Path) -> Result<Vec<RetainedEntry>> {
    json_file::read(path)
}

/// Reads a `candidates_non_retained.json` file back.
pub fn load_non_retained(path: &Path) -> Result<Vec<NonRetainedEntry>> {
    json_file::read(path)
}

fn write_csv(path: &Path, last_column: &str, rows: impl Iterator<Item = Vec<String>>) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut header: Vec<&str> = CSV_COLUMNS.to_vec();
    header.push(last_column);
    writer.write_record(&header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), "csv written");
    Ok(())
}

fn common_row(
    cv_id: &Option<String>,
    full_name: &str,
    email: &Option<String>,
    phone: &Option<String>,
    score: u8,
    level: MatchLevel,
    applied: Option<NaiveDateTime>,
) -> Vec<String> {
    vec![
        cv_id.clone().unwrap_or_default(),
        full_name.to_string(),
        email.clone().unwrap_or_default(),
        phone.clone().unwrap_or_default(),
        score.to_string(),
        level.to_string(),
        applied.map(iso_datetime).unwrap_or_default(),
    ]
}

/// Same text the JSON files carry: `2025-01-02T09:30:00`.
fn iso_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

pub(crate) fn is_safe_file_stem(id: &str) -> bool {
    !id.trim().is_empty() && !id.contains(['/', '\\']) && id != "." && id != ".."
}
