//! Interview sheets: one JSON file per retained candidate with profile,
//! matching verdict, offer summary and tailored questions.

pub mod questions;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::matching::exporter::{is_safe_file_stem, load_retained, RetainedEntry};
use crate::models::candidate::{CandidateRecord, Education, Experience};
use crate::models::judgment::MatchLevel;
use crate::models::offer::{ExtractedOffer, OfferDraft};
use crate::offers::load_offer;
use crate::storage::{json_file, read_candidate_file};

pub use questions::generate_questionnaire;

pub const SHEETS_SUMMARY_FILE: &str = "interview_fiches.json";
pub const DEFAULT_QUESTION_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSheet {
    pub cv_id: String,
    pub candidate_info: CandidateInfo,
    pub matching_info: MatchingInfo,
    pub offer_info: OfferInfo,
    pub interview_questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateInfo {
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub technical_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub educations: Vec<Education>,
    pub experiences: Vec<Experience>,
    pub summary: String,
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingInfo {
    pub matching_score: u8,
    pub matching_level: MatchLevel,
    pub rationale: String,
    pub key_points: Vec<String>,
    pub application_datetime: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferInfo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub responsibilities: Vec<String>,
    pub skills_required: Vec<String>,
    pub location: Option<String>,
    pub experience_required: Option<u32>,
    pub contact_email: Option<String>,
    pub offer_date: Option<String>,
}

impl From<&CandidateRecord> for CandidateInfo {
    fn from(c: &CandidateRecord) -> Self {
        Self {
            full_name: c.full_name().map(str::to_string),
            first_name: c.first_name().map(str::to_string),
            last_name: c.last_name().map(str::to_string),
            email: c.email().map(str::to_string),
            phone_number: c.phone_number(),
            technical_skills: c.technical_skills(),
            soft_skills: c.soft_skills(),
            educations: c.educations(),
            experiences: c.experiences(),
            summary: c.summary().unwrap_or_default().to_string(),
            interests: c.interests(),
        }
    }
}

impl From<&RetainedEntry> for MatchingInfo {
    fn from(r: &RetainedEntry) -> Self {
        Self {
            matching_score: r.matching_score,
            matching_level: r.matching_level,
            rationale: r.rationale.clone(),
            key_points: r.key_points.clone(),
            application_datetime: r.application_datetime,
        }
    }
}

impl OfferInfo {
    fn new(draft: &OfferDraft, offer_date: Option<&str>) -> Self {
        Self {
            title: draft.title.clone(),
            description: draft.description.clone(),
            responsibilities: draft.responsibilities.clone(),
            skills_required: draft.skills.clone(),
            location: draft.location.clone(),
            experience_required: draft.experience,
            contact_email: draft.contact_email.clone(),
            offer_date: offer_date.map(str::to_string),
        }
    }
}

/// Sheets for every retained entry whose `cv_id` is found in `pool`, in retained order.
/// The first pool record wins when a `cv_id` appears twice.
pub fn build_interview_sheets(
    retained: &[RetainedEntry],
    pool: &[CandidateRecord],
    offer: &OfferDraft,
    offer_date: Option<&str>,
    question_count: usize,
) -> Vec<InterviewSheet> {
    let mut by_id: HashMap<&str, &CandidateRecord> = HashMap::new();
    for record in pool {
        if let Some(id) = record.cv_id() {
            by_id.entry(id).or_insert(record);
        }
    }
    let offer_info = OfferInfo::new(offer, offer_date);

    retained
        .iter()
        .filter_map(|entry| {
            let cv_id = entry.cv_id.as_deref()?;
            let Some(candidate) = by_id.get(cv_id) else {
                warn!(cv_id, "retained candidate not found in the candidate pool, skipping");
                return None;
            };
            Some(InterviewSheet {
                cv_id: cv_id.to_string(),
                candidate_info: CandidateInfo::from(*candidate),
                matching_info: MatchingInfo::from(entry),
                offer_info: offer_info.clone(),
                interview_questions: generate_questionnaire(
                    &candidate.technical_skills(),
                    &offer.skills,
                    question_count,
                ),
            })
        })
        .collect()
}

/// Files written by one interview run.
#[derive(Debug, Clone, Serialize)]
pub struct InterviewSummary {
    pub retained: usize,
    pub sheets: usize,
    pub sheet_files: Vec<PathBuf>,
    pub summary_file: PathBuf,
}

/// Writes `interview_fiche_<cv_id>.json` per sheet and `interview_fiches.json` with all of them.
pub fn write_interview_sheets(sheets: &[InterviewSheet], out_dir: &Path) -> Result<(Vec<PathBuf>, PathBuf)> {
    let mut files = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        if !is_safe_file_stem(&sheet.cv_id) {
            warn!(cv_id = %sheet.cv_id, "cv_id is not usable as a file name, sheet kept in summary only");
            continue;
        }
        let path = out_dir.join(format!("interview_fiche_{}.json", sheet.cv_id));
        json_file::write_pretty(&path, sheet)?;
        info!(path = %path.display(), "interview sheet written");
        files.push(path);
    }

    let summary_file = out_dir.join(SHEETS_SUMMARY_FILE);
    json_file::write_pretty(&summary_file, sheets)?;
    info!(path = %summary_file.display(), sheets = sheets.len(), "interview summary written");
    Ok((files, summary_file))
}

/// Loads the retained list, the candidate pool files and the offer, then writes the sheets.
pub fn run_interview(
    retained_path: &Path,
    candidate_paths: &[PathBuf],
    offer_path: &Path,
    question_count: usize,
    out_dir: &Path,
) -> Result<InterviewSummary> {
    if !retained_path.is_file() {
        bail!("retained list not found: {}", retained_path.display());
    }
    let retained = load_retained(retained_path)?;

    let mut pool = Vec::new();
    for path in candidate_paths {
        pool.extend(read_candidate_file(path)?);
    }

    let offer: ExtractedOffer = load_offer(offer_path)?;
    let Some(draft) = offer.draft() else {
        bail!(
            "offer file {} holds no usable offer (extraction failed)",
            offer_path.display()
        );
    };
    info!(retained = retained.len(), pool = pool.len(), "building interview sheets");

    let sheets = build_interview_sheets(
        &retained,
        &pool,
        draft,
        offer.offer_date.as_deref(),
        question_count,
    );
    let (sheet_files, summary_file) = write_interview_sheets(&sheets, out_dir)?;

    Ok(InterviewSummary {
        retained: retained.len(),
        sheets: sheets.len(),
        sheet_files,
        summary_file,
    })
}

/// Default directory for interview sheets.
pub fn default_out_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("outputs").join("interview")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::exporter::RETAINED_LABEL;
    use chrono::NaiveDate;
    use serde_json::json;

    fn retained(cv_id: Option<&str>, score: u8) -> RetainedEntry {
        RetainedEntry {
            cv_id: cv_id.map(str::to_string),
            full_name: "X".to_string(),
            email: None,
            phone_number: None,
            offer_id: None,
            offer_title: Some("Statisticien".to_string()),
            matching_score: score,
            matching_level: MatchLevel::from_score(score),
            application_datetime: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0),
            rationale: "Profil solide".to_string(),
            key_points: vec!["R".to_string()],
            disposition: RETAINED_LABEL.to_string(),
        }
    }

    fn candidate(cv_id: &str, name: &str, skills: &[&str]) -> CandidateRecord {
        CandidateRecord::from_json(json!({
            "cv_id": cv_id,
            "full_name": name,
            "technical_skills": skills,
        }))
    }

    fn offer() -> OfferDraft {
        OfferDraft {
            title: Some("Statisticien".to_string()),
            skills: vec!["R".to_string(), "SAS".to_string()],
            experience: Some(3),
            ..Default::default()
        }
    }

    #[test]
    fn test_sheets_follow_retained_order_and_skip_unknown() {
        let pool = vec![
            candidate("CAND-001", "Jean Dupont", &["R", "Python"]),
            candidate("CAND-002", "Zoé Lefèvre", &["SAS"]),
            candidate("CAND-001", "Doublon", &[]),
        ];
        let retained = vec![
            retained(Some("CAND-002"), 91),
            retained(Some("CAND-404"), 88),
            retained(None, 85),
            retained(Some("CAND-001"), 80),
        ];

        let sheets = build_interview_sheets(&retained, &pool, &offer(), Some("2025-11-20"), 5);
        let ids: Vec<_> = sheets.iter().map(|s| s.cv_id.as_str()).collect();
        assert_eq!(ids, vec!["CAND-002", "CAND-001"]);

        let jean = &sheets[1];
        assert_eq!(jean.candidate_info.full_name.as_deref(), Some("Jean Dupont"));
        assert_eq!(jean.candidate_info.summary, "");
        assert_eq!(jean.matching_info.matching_score, 80);
        assert_eq!(jean.offer_info.skills_required, vec!["R", "SAS"]);
        assert_eq!(jean.offer_info.experience_required, Some(3));
        assert_eq!(jean.offer_info.offer_date.as_deref(), Some("2025-11-20"));
        assert_eq!(jean.interview_questions.len(), 5);
        assert!(jean.interview_questions[0].contains("« R »"));
    }

    #[test]
    fn test_run_interview_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let retained_path = dir.path().join("candidates_retained.json");
        json_file::write_pretty(&retained_path, &[retained(Some("CAND-001"), 90)]).unwrap();

        let candidates_path = dir.path().join("candidates.json");
        json_file::write_pretty(
            &candidates_path,
            &json!([{"cv_id": "CAND-001", "full_name": "Zoé Lefèvre", "technical_skills": ["R"]}]),
        )
        .unwrap();

        let offer_path = dir.path().join("offer.json");
        json_file::write_pretty(
            &offer_path,
            &json!({"title": "Statisticien", "skills": ["R"], "experience": 2, "filename": "a.pdf"}),
        )
        .unwrap();

        let out = dir.path().join("interview");
        let summary = run_interview(&retained_path, &[candidates_path], &offer_path, 3, &out).unwrap();
        assert_eq!(summary.sheets, 1);
        assert!(out.join("interview_fiche_CAND-001.json").is_file());

        let all: Vec<InterviewSheet> = json_file::read(&summary.summary_file).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].candidate_info.full_name.as_deref(), Some("Zoé Lefèvre"));
        assert_eq!(all[0].interview_questions.len(), 3);

        let raw = std::fs::read_to_string(&summary.summary_file).unwrap();
        assert!(raw.contains("\"skills_required\""));
        assert!(raw.contains("\"application_datetime\": \"2025-01-01T09:00:00\""));
    }

    #[test]
    fn test_missing_inputs_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = run_interview(&missing, &[], &missing, 5, dir.path()).unwrap_err();
        assert!(err.to_string().contains("retained list not found"));

        let retained_path = dir.path().join("retained.json");
        json_file::write_pretty(&retained_path, &Vec::<RetainedEntry>::new()).unwrap();
        let err = run_interview(&retained_path, &[missing.clone()], &missing, 5, dir.path()).unwrap_err();
        assert!(err.to_string().contains("candidate file not found"));
    }
}
