//! Tiered shortlist selection.
//!
//! Pure and deterministic: the partition depends only on tier, application
//! timestamp and input position. No LLM calls here.

use crate::models::candidate::CandidateRecord;
use crate::models::judgment::{Judgment, MatchLevel};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// One candidate paired with the verdict for the current offer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: CandidateRecord,
    pub judgment: Judgment,
}

/// Retained candidates in selection order; everyone else in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shortlist {
    pub retained: Vec<ScoredCandidate>,
    pub non_retained: Vec<ScoredCandidate>,
}

// ────────────────────────────────────────────────────────────────────────────
// Selection algorithm
// ────────────────────────────────────────────────────────────────────────────

/// Tiers eligible for the shortlist, in fill order. LOW is never retained.
const TIER_PRIORITY: [MatchLevel; 3] = [MatchLevel::VeryHigh, MatchLevel::High, MatchLevel::Medium];

/// Fills at most `top_n` slots by tier priority.
///
/// Algorithm:
/// 1. Bucket candidates by tier (VERY_HIGH, HIGH, MEDIUM)
/// 2. Sort each bucket by application timestamp, earliest first; a missing
///    timestamp sorts before any date, equal keys keep input order
/// 3. Take from VERY_HIGH, then HIGH, then MEDIUM until `top_n` are retained
/// 4. Everything not taken is non-retained
pub fn select_shortlist(scored: Vec<ScoredCandidate>, top_n: usize) -> Shortlist {
    let mut picked: Vec<usize> = Vec::with_capacity(top_n.min(scored.len()));

    for tier in TIER_PRIORITY {
        if picked.len() >= top_n {
            break;
        }
        let mut bucket: Vec<usize> = (0..scored.len())
            .filter(|&i| scored[i].judgment.matching_level == tier)
            .collect();
        // stable sort; the timestamp is parsed once per candidate
        bucket.sort_by_cached_key(|&i| scored[i].candidate.application_datetime());

        let room = top_n - picked.len();
        picked.extend(bucket.into_iter().take(room));
    }

    let mut slots: Vec<Option<ScoredCandidate>> = scored.into_iter().map(Some).collect();
    let retained = picked.iter().filter_map(|&i| slots[i].take()).collect();
    let non_retained = slots.into_iter().flatten().collect();

    Shortlist {
        retained,
        non_retained,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scored(cv_id: &str, level: MatchLevel, applied: Option<(u32, u32)>) -> ScoredCandidate {
        ScoredCandidate {
            candidate: CandidateRecord::from_json(json!({
                "cv_id": cv_id,
                "application_datetime": applied
                    .map(|(day, hour)| format!("2025-01-{day:02}T{hour:02}:00:00")),
            })),
            judgment: Judgment {
                matching_score: match level {
                    MatchLevel::VeryHigh => 90,
                    MatchLevel::High => 70,
                    MatchLevel::Medium => 50,
                    MatchLevel::Low => 10,
                },
                matching_level: level,
                rationale: format!("{cv_id} rationale"),
                key_points: vec![],
            },
        }
    }

    fn ids(list: &[ScoredCandidate]) -> Vec<&str> {
        list.iter()
            .map(|s| s.candidate.cv_id().unwrap())
            .collect()
    }

    /// A(VERY_HIGH, 01-01), B(VERY_HIGH, 01-02), C(HIGH, 01-01), D(LOW, 01-01)
    fn abcd() -> Vec<ScoredCandidate> {
        vec![
            scored("A", MatchLevel::VeryHigh, Some((1, 9))),
            scored("B", MatchLevel::VeryHigh, Some((2, 9))),
            scored("C", MatchLevel::High, Some((1, 9))),
            scored("D", MatchLevel::Low, Some((1, 9))),
        ]
    }

    #[test]
    fn test_top_tier_fills_shortlist() {
        let shortlist = select_shortlist(abcd(), 2);
        assert_eq!(ids(&shortlist.retained), vec!["A", "B"]);
        assert_eq!(ids(&shortlist.non_retained), vec!["C", "D"]);
    }

    #[test]
    fn test_overflow_fills_from_next_tier() {
        let shortlist = select_shortlist(abcd(), 3);
        assert_eq!(ids(&shortlist.retained), vec!["A", "B", "C"]);
        assert_eq!(ids(&shortlist.non_retained), vec!["D"]);
    }

    #[test]
    fn test_saturation_retains_every_eligible_candidate() {
        let shortlist = select_shortlist(abcd(), 10);
        assert_eq!(ids(&shortlist.retained), vec!["A", "B", "C"]);
        assert_eq!(ids(&shortlist.non_retained), vec!["D"]);
    }

    #[test]
    fn test_zero_slots_retains_nobody() {
        let shortlist = select_shortlist(abcd(), 0);
        assert!(shortlist.retained.is_empty());
        assert_eq!(ids(&shortlist.non_retained), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_earliest_application_wins_within_tier() {
        let input = vec![
            scored("late", MatchLevel::VeryHigh, Some((5, 9))),
            scored("early", MatchLevel::VeryHigh, Some((1, 8))),
            scored("mid", MatchLevel::VeryHigh, Some((1, 10))),
        ];
        let shortlist = select_shortlist(input, 2);
        assert_eq!(ids(&shortlist.retained), vec!["early", "mid"]);
        assert_eq!(ids(&shortlist.non_retained), vec!["late"]);
    }

    #[test]
    fn test_every_lower_tier_candidate_can_fill() {
        let input = vec![
            scored("H1", MatchLevel::High, Some((3, 9))),
            scored("M1", MatchLevel::Medium, Some((1, 9))),
            scored("H2", MatchLevel::High, Some((2, 9))),
            scored("M2", MatchLevel::Medium, Some((2, 9))),
            scored("H3", MatchLevel::High, Some((4, 9))),
        ];
        let shortlist = select_shortlist(input, 4);
        assert_eq!(ids(&shortlist.retained), vec!["H2", "H1", "H3", "M1"]);
        assert_eq!(ids(&shortlist.non_retained), vec!["M2"]);
    }

    #[test]
    fn test_low_is_never_retained() {
        let input = vec![
            scored("L1", MatchLevel::Low, Some((1, 9))),
            scored("L2", MatchLevel::Low, None),
        ];
        let shortlist = select_shortlist(input, 5);
        assert!(shortlist.retained.is_empty());
        assert_eq!(shortlist.non_retained.len(), 2);
    }

    #[test]
    fn test_missing_timestamp_sorts_first_and_ties_keep_input_order() {
        let input = vec![
            scored("dated", MatchLevel::High, Some((1, 9))),
            scored("tie_a", MatchLevel::High, Some((2, 9))),
            scored("undated", MatchLevel::High, None),
            scored("tie_b", MatchLevel::High, Some((2, 9))),
        ];
        let shortlist = select_shortlist(input, 4);
        assert_eq!(ids(&shortlist.retained), vec!["undated", "dated", "tie_a", "tie_b"]);
    }

    #[test]
    fn test_duplicate_cv_ids_are_kept_apart() {
        let input = vec![
            scored("same", MatchLevel::VeryHigh, Some((1, 9))),
            scored("same", MatchLevel::Low, Some((1, 9))),
        ];
        let shortlist = select_shortlist(input, 1);
        assert_eq!(shortlist.retained.len(), 1);
        assert_eq!(shortlist.retained[0].judgment.matching_level, MatchLevel::VeryHigh);
        assert_eq!(shortlist.non_retained.len(), 1);
        assert_eq!(shortlist.non_retained[0].judgment.matching_level, MatchLevel::Low);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let input = vec![
            scored("A", MatchLevel::Medium, Some((2, 9))),
            scored("B", MatchLevel::VeryHigh, Some((3, 9))),
            scored("C", MatchLevel::High, None),
            scored("D", MatchLevel::Medium, Some((1, 9))),
            scored("E", MatchLevel::Low, Some((1, 9))),
        ];
        let first = select_shortlist(input.clone(), 3);
        let second = select_shortlist(input, 3);
        assert_eq!(first, second);
        assert_eq!(ids(&first.retained), vec!["B", "C", "D"]);
        assert_eq!(ids(&first.non_retained), vec!["A", "E"]);
    }
}
