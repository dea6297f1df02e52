use std::sync::OnceLock;

use regex::Regex;

fn title_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?i)Candidature\s*[—-]\s*([^—-]+)\s*[—-]").expect("static regex is valid"),
            Regex::new(r"[—-]\s*([^—-]+)\s*[—-]").expect("static regex is valid"),
        ]
    })
}

/// Job title announced in a subject such as `Candidature — Statisticien — Jean Dupont`.
pub fn extract_job_title(subject: &str) -> Option<String> {
    title_patterns().iter().find_map(|pattern| {
        pattern
            .captures(subject)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|title| !title.is_empty())
    })
}

/// Lowercase, French accents folded, whitespace collapsed.
pub fn normalize_job_title(title: &str) -> String {
    let folded: String = title
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' | 'ä' => 'a',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Equal after normalisation, or one contains the other.
pub fn job_titles_match(subject_title: &str, target_title: &str) -> bool {
    let subject = normalize_job_title(subject_title);
    let target = normalize_job_title(target_title);
    subject == target || subject.contains(&target) || target.contains(&subject)
}
