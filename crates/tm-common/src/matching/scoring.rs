use serde::Serialize;

use super::experience::experience_compatibility;
use super::rate::rate_compatibility;
use super::skills::skill_match_score;
use super::weights::{DEFAULT_WEIGHTS, ScoreWeights};
use crate::Entity;

/// Components of one job/profile score, kept for logging and explanations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub similarity: f64,
    pub skills: f64,
    pub experience: f64,
    pub rate: f64,
    pub total: f64,
}

impl ScoreBreakdown {
    /// Blend raw similarity with the rule-based factors. `total` is clamped to `[0, 1]`.
    pub fn compute(raw_similarity: f64, job: &Entity, profile: &Entity, weights: &ScoreWeights) -> Self {
        let similarity = if raw_similarity.is_finite() { raw_similarity } else { 0.0 };
        let skills = skill_match_score(job.job_skills(), profile.profile_skills());
        let experience =
            experience_compatibility(job.experience_level.as_deref(), profile.experience_level.as_deref());
        let rate = rate_compatibility(job.budget, profile.hourly_rate);

        let total = weights.similarity * similarity
            + weights.skills * skills
            + weights.experience * experience
            + weights.rate * rate;

        Self {
            similarity,
            skills,
            experience,
            rate,
            total: total.clamp(0.0, 1.0),
        }
    }
}

/// `0.5·similarity + 0.3·skills + 0.1·experience + 0.1·rate`, clamped to `[0, 1]`.
pub fn adjusted_score(raw_similarity: f64, job: &Entity, profile: &Entity) -> f64 {
    adjusted_score_with(raw_similarity, job, profile, &DEFAULT_WEIGHTS)
}

pub fn adjusted_score_with(raw_similarity: f64, job: &Entity, profile: &Entity, weights: &ScoreWeights) -> f64 {
    let breakdown = ScoreBreakdown::compute(raw_similarity, job, profile, weights);
    tracing::debug!(
        job_id = job.id().unwrap_or(""),
        profile_id = profile.id().unwrap_or(""),
        similarity = breakdown.similarity,
        skills = breakdown.skills,
        experience = breakdown.experience,
        rate = breakdown.rate,
        total = breakdown.total,
        "scored pair"
    );
    breakdown.total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(rate_budget: f64) -> Entity {
        Entity {
            id: Some("job-1".into()),
            required_skills: vec!["python".into(), "tensorflow".into()],
            experience_level: Some("expert".into()),
            budget: Some(rate_budget),
            ..Default::default()
        }
    }

    fn profile(rate: f64) -> Entity {
        Entity {
            id: Some("p-1".into()),
            skills: vec!["Python".into(), "TensorFlow".into()],
            experience_level: Some("expert".into()),
            hourly_rate: Some(rate),
            ..Default::default()
        }
    }

    #[test]
    fn perfect_fit_blends_to_expected_score() {
        let score = adjusted_score(0.9, &job(100.0), &profile(95.0));
        assert!((score - 0.95).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn over_budget_candidate_scores_strictly_lower() {
        let within = adjusted_score(0.9, &job(100.0), &profile(95.0));
        let over = adjusted_score(0.9, &job(100.0), &profile(200.0));
        assert!(over < within);
        assert!((over - 0.90).abs() < 1e-9, "got {over}");
    }

    #[test]
    fn score_is_clamped() {
        let heavy = ScoreWeights {
            similarity: 3.0,
            skills: 0.0,
            experience: 0.0,
            rate: 0.0,
        };
        let score = adjusted_score_with(0.9, &job(100.0), &profile(95.0), &heavy);
        assert_eq!(score, 1.0);
        assert_eq!(adjusted_score(f64::NAN, &Entity::default(), &Entity::default()), 0.2);
    }

    #[test]
    fn breakdown_exposes_components() {
        let breakdown = ScoreBreakdown::compute(0.6, &job(100.0), &profile(200.0), &DEFAULT_WEIGHTS);
        assert_eq!(breakdown.skills, 1.0);
        assert_eq!(breakdown.experience, 1.0);
        assert!((breakdown.rate - 0.5).abs() < 1e-12);
    }
}
