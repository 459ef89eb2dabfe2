use serde::Serialize;

use crate::matching::{
    ExperienceVerdict, is_rate_compatible, rate_difference, skill_match_score, skill_overlap,
};
use crate::{Job, Profile};

/// Everything a caller needs to show why one job and one profile were paired.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedExplanation {
    pub score: f64,
    pub skill_match: f64,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    /// Candidate skills the job did not ask for. Empty when not requested.
    pub additional_skills: Vec<String>,
    pub experience_match: ExperienceVerdict,
    pub rate_compatible: bool,
    pub rate_difference: f64,
    pub explanation: String,
}

impl DetailedExplanation {
    pub(crate) fn build(
        job: &Job,
        profile: &Profile,
        score: f64,
        explanation: String,
        include_additional: bool,
    ) -> Self {
        let overlap = skill_overlap(job.job_skills(), profile.profile_skills());
        Self {
            score,
            skill_match: skill_match_score(job.job_skills(), profile.profile_skills()),
            matching_skills: overlap.matching,
            missing_skills: overlap.missing,
            additional_skills: if include_additional {
                overlap.additional
            } else {
                Vec::new()
            },
            experience_match: ExperienceVerdict::between(
                job.experience_level.as_deref(),
                profile.experience_level.as_deref(),
            ),
            rate_compatible: is_rate_compatible(job.budget, profile.hourly_rate),
            rate_difference: rate_difference(job.budget, profile.hourly_rate),
            explanation,
        }
    }
}
