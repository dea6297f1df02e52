use serde_json::{Map, Value};
use tracing::debug;

use crate::collector::prompts::CV_EXTRACTION_TEMPLATE;
use crate::llm_client::prompts::render;
use crate::llm_client::{complete_json, ChatCompletion, LlmError, Prompt};

/// Asks the model for the structured profile held in `cv_text`.
///
/// The reply must be a JSON object; anything else is `LlmError::Parse`.
pub async fn extract_cv(
    llm: &dyn ChatCompletion,
    cv_text: &str,
) -> Result<Map<String, Value>, LlmError> {
    let prompt = render(CV_EXTRACTION_TEMPLATE, &[("cv_text", cv_text)]);
    let profile: Map<String, Value> = complete_json(llm, Prompt::user(&prompt)).await?;
    debug!(keys = profile.len(), "CV profile extracted");
    Ok(profile)
}
