use tracing::warn;

use crate::models::candidate::CandidateRecord;

/// Prefix of the per-CV identifier (`CAND-001`).
pub const CV_ID_PREFIX: &str = "CAND-";
/// Prefix of the per-person identifier (`PERS-001`).
pub const PERSON_ID_PREFIX: &str = "PERS-";

/// Next free sequence number in each identifier family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextIds {
    pub cv: u32,
    pub person: u32,
}

impl NextIds {
    pub fn cv_id(&self) -> String {
        format_id(CV_ID_PREFIX, self.cv)
    }

    pub fn person_id(&self) -> String {
        format_id(PERSON_ID_PREFIX, self.person)
    }
}

pub fn format_id(prefix: &str, sequence: u32) -> String {
    format!("{prefix}{sequence:03}")
}

/// Max existing suffix + 1 per family, or 1 when the family has no valid id.
/// Malformed identifiers are skipped with a warning.
pub fn next_ids(records: &[CandidateRecord]) -> NextIds {
    let mut last_cv = 0;
    let mut last_person = 0;

    for record in records {
        if let Some(id) = record.cv_id() {
            match parse_sequence(id, CV_ID_PREFIX) {
                Some(n) => last_cv = last_cv.max(n),
                None => warn!(cv_id = %id, "ignoring malformed cv identifier"),
            }
        }
        if let Some(id) = record.candidate_id() {
            match parse_sequence(id, PERSON_ID_PREFIX) {
                Some(n) => last_person = last_person.max(n),
                None => warn!(candidate_id = %id, "ignoring malformed person identifier"),
            }
        }
    }

    NextIds {
        cv: last_cv + 1,
        person: last_person + 1,
    }
}

fn parse_sequence(id: &str, prefix: &str) -> Option<u32> {
    let digits = id.trim().strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // u32::MAX has no successor, so it counts as malformed
    digits.parse().ok().filter(|&n| n < u32::MAX)
}
