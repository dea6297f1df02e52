use tracing::debug;

use crate::llm_client::prompts::{render, JSON_ONLY_INSTRUCTION};
use crate::llm_client::{complete_json, ChatCompletion, LlmError, Prompt};
use crate::matching::prompts::{JUDGMENT_SYSTEM_PROMPT, JUDGMENT_USER_TEMPLATE};
use crate::models::candidate::CandidateRecord;
use crate::models::judgment::Judgment;
use crate::models::offer::ExtractedOffer;

/// Asks the model to grade candidates against one offer.
///
/// The offer is serialized once; each call sends it with one CV.
/// A reply that does not fit the `Judgment` contract is `LlmError::Parse`.
pub struct MatchJudge<'a> {
    llm: &'a dyn ChatCompletion,
    system: String,
    offer_json: String,
}

impl<'a> MatchJudge<'a> {
    pub fn new(llm: &'a dyn ChatCompletion, offer: &ExtractedOffer) -> Result<Self, LlmError> {
        Ok(Self {
            llm,
            system: format!("{JUDGMENT_SYSTEM_PROMPT}\n\n{JSON_ONLY_INSTRUCTION}"),
            offer_json: serde_json::to_string_pretty(offer)?,
        })
    }

    pub async fn judge(&self, candidate: &CandidateRecord) -> Result<Judgment, LlmError> {
        let cv_json = serde_json::to_string_pretty(candidate)?;
        let user = render(
            JUDGMENT_USER_TEMPLATE,
            &[("offer_json", self.offer_json.as_str()), ("cv_json", cv_json.as_str())],
        );

        let judgment: Judgment = complete_json(
            self.llm,
            Prompt::user(&user).with_system(&self.system).json(),
        )
        .await?;

        debug!(
            cv_id = candidate.cv_id().unwrap_or("-"),
            score = judgment.matching_score,
            level = %judgment.matching_level,
            "candidate judged"
        );
        Ok(judgment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedLlm;
    use crate::models::judgment::MatchLevel;
    use crate::models::offer::{OfferBody, OfferDraft};

    fn offer() -> ExtractedOffer {
        ExtractedOffer {
            body: OfferBody::Parsed(OfferDraft {
                title: Some("Statisticien".to_string()),
                skills: vec!["R".to_string()],
                ..Default::default()
            }),
            filename: "annonce.pdf".to_string(),
            offer_date: Some("2025-11-20".to_string()),
        }
    }

    fn candidate() -> CandidateRecord {
        CandidateRecord::from_json(serde_json::json!({
            "cv_id": "CAND-001",
            "full_name": "Zoé Lefèvre"
        }))
    }

    #[tokio::test]
    async fn test_judge_sends_offer_and_cv_and_parses_reply() {
        let llm = ScriptedLlm::replying(&[r#"{"matching_score": 72, "matching_level": "HIGH",
            "rationale": "Bonne base en R", "key_points": ["R"]}"#]);
        let offer = offer();
        let judge = MatchJudge::new(&llm, &offer).unwrap();

        let judgment = judge.judge(&candidate()).await.unwrap();
        assert_eq!(judgment.matching_score, 72);
        assert_eq!(judgment.matching_level, MatchLevel::High);

        let seen = llm.seen.lock().unwrap();
        assert!(seen[0].contains("\"title\": \"Statisticien\""));
        assert!(seen[0].contains("Zoé Lefèvre"));
        assert!(!seen[0].contains("{offer_json}"));
    }

    #[tokio::test]
    async fn test_non_json_reply_is_a_parse_error() {
        let llm = ScriptedLlm::replying(&["I think this candidate is great"]);
        let offer = offer();
        let judge = MatchJudge::new(&llm, &offer).unwrap();
        let err = judge.judge(&candidate()).await.unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[tokio::test]
    async fn test_missing_fields_break_the_contract() {
        let llm = ScriptedLlm::replying(&[r#"{"rationale": "no score"}"#]);
        let offer = offer();
        let judge = MatchJudge::new(&llm, &offer).unwrap();
        assert!(judge.judge(&candidate()).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key_propagates() {
        let llm = ScriptedLlm::new(vec![Err(LlmError::MissingApiKey)]);
        let offer = offer();
        let judge = MatchJudge::new(&llm, &offer).unwrap();
        let err = judge.judge(&candidate()).await.unwrap_err();
        assert!(err.is_fatal());
    }
}
