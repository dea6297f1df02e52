use std::collections::HashSet;

/// Questions asked when there is room left after the skill questions.
pub const BEHAVIOURAL_QUESTIONS: [&str; 2] = [
    "Racontez-nous une situation professionnelle difficile et la manière dont vous l'avez résolue.",
    "Comment vous y prenez-vous pour monter rapidement en compétence sur un sujet technique nouveau ?",
];

fn held_and_required(skill: &str) -> String {
    format!(
        "Décrivez une expérience concrète où vous avez mis en œuvre « {skill} ». Quels étaient les enjeux et les résultats ?"
    )
}

fn held_only(skill: &str) -> String {
    format!("Présentez une réalisation marquante liée à « {skill} ». Quelles méthodes avez-vous utilisées ?")
}

fn required_only(skill: &str) -> String {
    format!(
        "Le poste demande « {skill} ». Comment aborderiez-vous ce sujet si vous deviez le prendre en charge (formation, approche, priorités) ?"
    )
}

fn key(skill: &str) -> String {
    skill.trim().to_lowercase()
}

/// Distinct non-blank entries, first spelling kept, input order kept.
fn distinct(items: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && seen.insert(key(s)))
        .collect()
}

/// Up to `n` interview questions for a candidate holding `skills` against an
/// offer requiring `needs`.
///
/// Order: skills both held and required, other held skills, required skills
/// the candidate lacks, then the behavioural questions. Skills compare
/// case-insensitively.
pub fn generate_questionnaire(skills: &[String], needs: &[String], n: usize) -> Vec<String> {
    let skills = distinct(skills);
    let needs = distinct(needs);
    let skill_keys: HashSet<String> = skills.iter().map(|s| key(s)).collect();
    let need_keys: HashSet<String> = needs.iter().map(|s| key(s)).collect();

    let (common, extra): (Vec<&str>, Vec<&str>) =
        skills.iter().copied().partition(|s| need_keys.contains(&key(s)));
    let missing = needs.iter().filter(|s| !skill_keys.contains(&key(s)));

    common
        .iter()
        .map(|s| held_and_required(s))
        .chain(extra.iter().map(|s| held_only(s)))
        .chain(missing.map(|s| required_only(s)))
        .chain(BEHAVIOURAL_QUESTIONS.iter().map(|q| q.to_string()))
        .take(n)
        .collect()
}
