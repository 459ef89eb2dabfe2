use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::Entity;

static RE_DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s.,?!\-]").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Canonical form used for cache keys and provider input.
///
/// Lowercases, drops characters other than word characters, whitespace and
/// `. , ? ! -`, collapses whitespace runs to one space, and trims.
/// Idempotent.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = RE_DISALLOWED.replace_all(&lowered, "");
    RE_WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Cache key: SHA-256 hex over `"<normalized text>:<model>"`.
pub fn text_fingerprint(normalized: &str, model: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hasher.update(b":");
    hasher.update(model.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn push_non_empty(parts: &mut Vec<String>, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        parts.push(value.to_string());
    }
}

fn join_skills(skills: &[String]) -> String {
    skills
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Text embedded for a job: title, description, then the skill list twice so skills weigh more.
pub fn job_text(job: &Entity) -> String {
    let mut parts = Vec::new();
    push_non_empty(&mut parts, job.title.as_deref());
    push_non_empty(&mut parts, job.description.as_deref());

    let skills = join_skills(job.job_skills());
    if !skills.is_empty() {
        parts.push(format!("Skills Required: {skills}"));
        parts.push(format!("Key Skills: {skills}"));
    }

    parts.join(" ")
}

/// Text embedded for a profile: name, bio, skills twice, then past positions.
pub fn profile_text(profile: &Entity) -> String {
    let mut parts = Vec::new();
    push_non_empty(&mut parts, profile.name.as_deref());
    push_non_empty(&mut parts, profile.bio.as_deref());

    let skills = join_skills(profile.profile_skills());
    if !skills.is_empty() {
        parts.push(format!("Skills: {skills}"));
        parts.push(format!("Expertise: {skills}"));
    }

    for entry in &profile.experience {
        let line = [entry.title.trim(), entry.description.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !line.is_empty() {
            parts.push(format!("Experience: {line}"));
        }
    }

    parts.join(" ")
}

/// `"Skills: a, b"`, or empty text (and so the zero vector) for an empty list.
pub fn skills_text(skills: &[String]) -> String {
    let skills = join_skills(skills);
    if skills.is_empty() {
        String::new()
    } else {
        format!("Skills: {skills}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExperienceEntry;

    #[test]
    fn normalize_lowercases_and_collapses_whitespace() {
        assert_eq!(normalize_text("  Senior   RUST\tEngineer \n"), "senior rust engineer");
    }

    #[test]
    fn normalize_strips_disallowed_characters() {
        assert_eq!(normalize_text("C++ & Python (3.x)!"), "c python 3.x!");
        assert_eq!(normalize_text("full-time, remote?"), "full-time, remote?");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = ["Hello,   World!", "a @ b # c", "  ", "Ünïcödé Téxt"];
        for input in inputs {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once);
        }
    }

    #[test]
    fn fingerprint_depends_on_model() {
        let a = text_fingerprint("rust developer", "hash-v1");
        let b = text_fingerprint("rust developer", "hash-v2");
        assert_ne!(a, b);
        assert_eq!(a, text_fingerprint("rust developer", "hash-v1"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn job_text_repeats_skills() {
        let job = Entity {
            title: Some("Backend Engineer".into()),
            description: Some("Build APIs".into()),
            required_skills: vec!["rust".into(), "postgres".into()],
            ..Default::default()
        };
        assert_eq!(
            job_text(&job),
            "Backend Engineer Build APIs Skills Required: rust, postgres Key Skills: rust, postgres"
        );
    }

    #[test]
    fn profile_text_includes_experience() {
        let profile = Entity {
            name: Some("Ada".into()),
            skills: vec!["python".into()],
            experience: vec![ExperienceEntry {
                title: "Data Engineer".into(),
                description: "ETL pipelines".into(),
            }],
            ..Default::default()
        };
        assert_eq!(
            profile_text(&profile),
            "Ada Skills: python Expertise: python Experience: Data Engineer ETL pipelines"
        );
    }

    #[test]
    fn skills_text_is_prefixed_unless_empty() {
        assert_eq!(skills_text(&["go".into(), " ".into(), "rust".into()]), "Skills: go, rust");
        assert_eq!(skills_text(&[]), "");
    }

    #[test]
    fn empty_entities_compose_empty_text() {
        assert_eq!(job_text(&Entity::default()), "");
        assert_eq!(profile_text(&Entity::default()), "");
    }
}
