use serde::Serialize;

/// Seniority bands on an ordinal scale.
///
/// Only the labels below are recognized (case-insensitive, untrimmed); every
/// other label, `junior` and `entry-level` included, counts as intermediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExperienceLevel {
    Entry = 1,
    Intermediate = 2,
    Expert = 3,
}

impl ExperienceLevel {
    pub fn parse(label: Option<&str>) -> Self {
        match label.map(str::to_lowercase).as_deref() {
            Some("beginner" | "entry") => ExperienceLevel::Entry,
            Some("expert" | "senior" | "advanced") => ExperienceLevel::Expert,
            _ => ExperienceLevel::Intermediate,
        }
    }
}

/// 1.0 for an exact level match, 0.8 when overqualified, 0.5 when underqualified.
pub fn experience_compatibility(required: Option<&str>, candidate: Option<&str>) -> f64 {
    match ExperienceVerdict::between(required, candidate) {
        ExperienceVerdict::ExactMatch => 1.0,
        ExperienceVerdict::Overqualified => 0.8,
        ExperienceVerdict::Underqualified => 0.5,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExperienceVerdict {
    #[serde(rename = "Exact Match")]
    ExactMatch,
    Overqualified,
    Underqualified,
}

impl ExperienceVerdict {
    pub fn between(required: Option<&str>, candidate: Option<&str>) -> Self {
        let required = ExperienceLevel::parse(required);
        let candidate = ExperienceLevel::parse(candidate);
        match candidate.cmp(&required) {
            std::cmp::Ordering::Equal => ExperienceVerdict::ExactMatch,
            std::cmp::Ordering::Greater => ExperienceVerdict::Overqualified,
            std::cmp::Ordering::Less => ExperienceVerdict::Underqualified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceVerdict::ExactMatch => "Exact Match",
            ExperienceVerdict::Overqualified => "Overqualified",
            ExperienceVerdict::Underqualified => "Underqualified",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_scores_one() {
        assert_eq!(experience_compatibility(Some("expert"), Some("expert")), 1.0);
        assert_eq!(experience_compatibility(Some("Senior"), Some("advanced")), 1.0);
    }

    #[test]
    fn overqualified_scores_point_eight() {
        assert_eq!(experience_compatibility(Some("entry"), Some("expert")), 0.8);
        assert_eq!(experience_compatibility(Some("intermediate"), Some("senior")), 0.8);
    }

    #[test]
    fn underqualified_scores_half_regardless_of_gap() {
        assert_eq!(experience_compatibility(Some("expert"), Some("intermediate")), 0.5);
        assert_eq!(experience_compatibility(Some("expert"), Some("beginner")), 0.5);
    }

    #[test]
    fn unknown_or_missing_levels_default_to_intermediate() {
        assert_eq!(ExperienceLevel::parse(None), ExperienceLevel::Intermediate);
        assert_eq!(ExperienceLevel::parse(Some("guru")), ExperienceLevel::Intermediate);
        assert_eq!(ExperienceLevel::parse(Some("mid-level")), ExperienceLevel::Intermediate);
        assert_eq!(ExperienceLevel::parse(Some("Expert")), ExperienceLevel::Expert);
        assert_eq!(experience_compatibility(None, Some("unheard-of")), 1.0);
    }

    #[test]
    fn unlisted_aliases_are_intermediate() {
        for label in ["junior", "entry-level", "Junior", " entry", "lead", "principal"] {
            assert_eq!(ExperienceLevel::parse(Some(label)), ExperienceLevel::Intermediate, "{label}");
        }
        assert_eq!(experience_compatibility(Some("intermediate"), Some("junior")), 1.0);
        assert_eq!(experience_compatibility(Some("intermediate"), Some("entry-level")), 1.0);
        assert_eq!(experience_compatibility(Some("expert"), Some("junior")), 0.5);
    }

    #[test]
    fn verdicts() {
        assert_eq!(
            ExperienceVerdict::between(Some("expert"), Some("expert")),
            ExperienceVerdict::ExactMatch
        );
        assert_eq!(
            ExperienceVerdict::between(Some("entry"), Some("expert")),
            ExperienceVerdict::Overqualified
        );
        assert_eq!(
            ExperienceVerdict::between(Some("expert"), None),
            ExperienceVerdict::Underqualified
        );
        assert_eq!(ExperienceVerdict::ExactMatch.as_str(), "Exact Match");
    }
}
