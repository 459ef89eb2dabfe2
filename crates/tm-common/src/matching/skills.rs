use std::collections::BTreeSet;

use serde::Serialize;

/// Lowercased, trimmed, de-duplicated skill names. Blank entries are dropped.
pub fn normalize_skill_set(skills: &[String]) -> BTreeSet<String> {
    skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Share of the required skills the candidate has, in `[0, 1]`.
///
/// Extra candidate skills neither help nor hurt. An empty set on either side
/// scores 0.0: no requirements is not a perfect match.
pub fn skill_match_score(required: &[String], possessed: &[String]) -> f64 {
    let required = normalize_skill_set(required);
    let possessed = normalize_skill_set(possessed);
    if required.is_empty() || possessed.is_empty() {
        return 0.0;
    }
    let matched = required.intersection(&possessed).count();
    matched as f64 / required.len() as f64
}

/// Sorted breakdown of how two skill lists overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkillOverlap {
    /// Required and possessed
    pub matching: Vec<String>,
    /// Required but not possessed
    pub missing: Vec<String>,
    /// Possessed but not required
    pub additional: Vec<String>,
    pub required_count: usize,
}

pub fn skill_overlap(required: &[String], possessed: &[String]) -> SkillOverlap {
    let required = normalize_skill_set(required);
    let possessed = normalize_skill_set(possessed);

    SkillOverlap {
        matching: required.intersection(&possessed).cloned().collect(),
        missing: required.difference(&possessed).cloned().collect(),
        additional: possessed.difference(&required).cloned().collect(),
        required_count: required.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skills(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn matching_is_case_and_whitespace_insensitive() {
        let score = skill_match_score(&skills(&["Python", " Django"]), &skills(&["python", "DJANGO "]));
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn partial_overlap_scores_fraction_of_required() {
        let score = skill_match_score(
            &skills(&["python", "django", "postgres", "aws"]),
            &skills(&["python", "aws", "react"]),
        );
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_requirements_score_zero() {
        assert_eq!(skill_match_score(&[], &skills(&["go"])), 0.0);
        assert_eq!(skill_match_score(&skills(&["  "]), &skills(&["go"])), 0.0);
        assert_eq!(skill_match_score(&[], &[]), 0.0);
    }

    #[test]
    fn extra_candidate_skills_do_not_dilute_score() {
        let score = skill_match_score(
            &skills(&["rust"]),
            &skills(&["rust", "go", "python", "java", "c"]),
        );
        assert_eq!(score, 1.0);
    }

    #[test]
    fn case_changes_never_change_score() {
        let required = skills(&["Rust", "AWS", "kubernetes"]);
        let possessed = skills(&["rust", "aws", "Docker"]);
        let upper = |v: &[String]| v.iter().map(|s| s.to_uppercase()).collect::<Vec<_>>();
        let base = skill_match_score(&required, &possessed);
        assert_eq!(base, skill_match_score(&upper(&required), &possessed));
        assert_eq!(base, skill_match_score(&required, &upper(&possessed)));
        assert!((0.0..=1.0).contains(&base));
    }

    #[test]
    fn candidate_without_skills_scores_zero() {
        assert_eq!(skill_match_score(&skills(&["go"]), &[]), 0.0);
    }

    #[test]
    fn duplicates_do_not_inflate_score() {
        let score = skill_match_score(&skills(&["go", "Go", "rust"]), &skills(&["go"]));
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn overlap_lists_are_sorted_and_disjoint() {
        let overlap = skill_overlap(
            &skills(&["Rust", "AWS", "Kubernetes"]),
            &skills(&["docker", "rust", "aws"]),
        );
        assert_eq!(overlap.matching, skills(&["aws", "rust"]));
        assert_eq!(overlap.missing, skills(&["kubernetes"]));
        assert_eq!(overlap.additional, skills(&["docker"]));
        assert_eq!(overlap.required_count, 3);
    }
}
