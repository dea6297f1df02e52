// Prompts for the candidate/offer judgment call.

pub const JUDGMENT_SYSTEM_PROMPT: &str = r#"You are an experienced recruiter.
You compare a candidate CV and a job offer, both given as JSON.

Your job:
- Assess how well the candidate fits the offer
- Give a score between 0 and 100
- Classify the fit as LOW, MEDIUM, HIGH or VERY_HIGH

Rubric:
- VERY_HIGH (80-100): excellent fit
- HIGH (60-79): good fit
- MEDIUM (40-59): partial fit
- LOW (0-39): weak fit

The level MUST agree with the score band above."#;

pub const JUDGMENT_USER_TEMPLATE: &str = r#"Job offer:
{offer_json}

Candidate CV:
{cv_json}

Return ONLY this JSON object:
{
  "matching_score": <integer 0-100>,
  "matching_level": "LOW" | "MEDIUM" | "HIGH" | "VERY_HIGH",
  "rationale": "short explanation",
  "key_points": ["point 1", "point 2"]
}"#;
