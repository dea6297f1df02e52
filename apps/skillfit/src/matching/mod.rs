//! Matching run: judges every candidate against one offer, selects the
//! shortlist and exports it.
//!
//! Candidates are judged one at a time. A failed judgment skips that
//! candidate; a missing LLM credential stops the run.

pub mod exporter;
pub mod judge;
pub mod prompts;
pub mod selector;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::llm_client::{ChatCompletion, LlmError};
use crate::matching::exporter::{export_report, ExportPaths, OfferRef, ShortlistReport};
use crate::matching::judge::MatchJudge;
use crate::matching::selector::{select_shortlist, ScoredCandidate, Shortlist};
use crate::models::candidate::CandidateRecord;
use crate::models::offer::ExtractedOffer;
use crate::offers::load_offer;
use crate::storage::read_candidate_file;

/// Outcome of judging a batch, before export.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub shortlist: Shortlist,
    pub judged: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchingSummary {
    pub candidates: usize,
    pub judged: usize,
    pub failed: usize,
    pub retained: usize,
    pub non_retained: usize,
    pub outputs: ExportPaths,
}

/// Judges `candidates` in order and selects up to `top_n` of them.
pub async fn judge_and_select(
    llm: &dyn ChatCompletion,
    offer: &ExtractedOffer,
    candidates: Vec<CandidateRecord>,
    top_n: usize,
) -> Result<MatchOutcome, LlmError> {
    let judge = MatchJudge::new(llm, offer)?;
    let total = candidates.len();
    let mut scored = Vec::with_capacity(total);
    let mut failed = 0;

    for (i, candidate) in candidates.into_iter().enumerate() {
        let name = candidate.display_name();
        info!("Judging {}/{}: {}", i + 1, total, name);

        match judge.judge(&candidate).await {
            Ok(judgment) => {
                info!(
                    score = judgment.matching_score,
                    level = %judgment.matching_level,
                    "judged {name}"
                );
                scored.push(ScoredCandidate {
                    candidate,
                    judgment,
                });
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(
                    cv_id = candidate.cv_id().unwrap_or("-"),
                    error = %e,
                    "judgment failed, candidate skipped"
                );
                failed += 1;
            }
        }
    }

    let judged = scored.len();
    let shortlist = select_shortlist(scored, top_n);
    info!(
        retained = shortlist.retained.len(),
        non_retained = shortlist.non_retained.len(),
        failed,
        "shortlist selected"
    );

    Ok(MatchOutcome {
        shortlist,
        judged,
        failed,
    })
}

/// Loads the offer and candidate files, runs matching and writes the outputs.
pub async fn run_matching(
    llm: &dyn ChatCompletion,
    offer_path: &Path,
    candidates_path: &Path,
    top_n: usize,
    out_dir: &Path,
) -> Result<MatchingSummary> {
    let offer = load_offer(offer_path)?;
    if offer.is_placeholder() {
        bail!(
            "offer file {} holds no usable offer (extraction failed)",
            offer_path.display()
        );
    }
    info!(
        title = offer.offer_title().as_deref().unwrap_or("N/A"),
        "offer loaded"
    );

    let candidates = read_candidate_file(candidates_path)?;
    let total = candidates.len();
    info!(candidates = total, top_n, "candidates loaded");

    let outcome = judge_and_select(llm, &offer, candidates, top_n).await?;

    let offer_ref = OfferRef {
        offer_id: offer.offer_id(),
        offer_title: offer.offer_title(),
    };
    let report = ShortlistReport::new(&outcome.shortlist, &offer_ref);
    let outputs = export_report(&report, out_dir)?;

    let summary = MatchingSummary {
        candidates: total,
        judged: outcome.judged,
        failed: outcome.failed,
        retained: report.retained.len(),
        non_retained: report.non_retained.len(),
        outputs,
    };
    info!(
        retained = summary.retained,
        non_retained = summary.non_retained,
        failed = summary.failed,
        "matching run complete"
    );
    Ok(summary)
}

/// Default output directory for a matching run.
pub fn default_out_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("outputs")
}
