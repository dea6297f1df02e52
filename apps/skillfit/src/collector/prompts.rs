// Prompt for structured CV extraction.

pub const CV_EXTRACTION_TEMPLATE: &str = r#"You extract structured data from a CV.
The CV text below was pulled from a PDF or DOCX file; layout may be lost.

Rules:
- Use only information present in the CV. Never invent.
- Unknown scalar fields are null, unknown lists are [].
- Keep names, schools and companies exactly as written (accents included).
- Dates stay as written in the CV (e.g. "2019", "09/2021", "Present").
- technical_skills: tools, languages, methods. secondary_skills: other hard skills.
  soft_skills: interpersonal qualities.

Return ONLY this JSON object:
{
  "first_name": string | null,
  "last_name": string | null,
  "full_name": string | null,
  "email": string | null,
  "phone_number": string | null,
  "technical_skills": [string],
  "secondary_skills": [string],
  "soft_skills": [string],
  "languages": [{"language": string, "level": string | null}],
  "educations": [{"title": string, "institution": string | null, "start_date": string | null, "end_date": string | null}],
  "experiences": [{"title": string, "company": string | null, "start_date": string | null, "end_date": string | null, "skills": [string]}],
  "interests": [string],
  "summary": string | null
}

CV text:
{cv_text}"#;
