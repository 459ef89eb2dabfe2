//! Natural-language match explanations.
//!
//! [`MatchExplainer`] is the seam for an external text generator. Whatever it
//! does, the engine never surfaces its failure: [`fallback_explanation`] is
//! deterministic, infallible and never empty.

use async_trait::async_trait;

use crate::error::Result;
use crate::matching::skill_overlap;
use crate::{Entity, Job, Profile};

const DEFAULT_CANDIDATE_NAME: &str = "This candidate";
const DEFAULT_JOB_TITLE: &str = "This job";
const MAX_LISTED_SKILLS: usize = 5;

#[async_trait]
pub trait MatchExplainer: Send + Sync {
    async fn explain(&self, job: &Job, profile: &Profile, score: f64) -> Result<String>;
}

fn percent(score: f64) -> u32 {
    if score.is_finite() {
        (score.clamp(0.0, 1.0) * 100.0).floor() as u32
    } else {
        0
    }
}

fn display_name<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(default)
}

fn listed(skills: &[String]) -> String {
    skills.iter().take(MAX_LISTED_SKILLS).cloned().collect::<Vec<_>>().join(", ")
}

/// Explanation built only from skill overlap and score.
pub fn fallback_explanation(job: &Job, profile: &Profile, score: f64) -> String {
    let candidate = display_name(profile.name.as_deref(), DEFAULT_CANDIDATE_NAME);
    let title = display_name(job.title.as_deref(), DEFAULT_JOB_TITLE);
    let overlap = skill_overlap(job.job_skills(), profile.profile_skills());

    let mut text = format!(
        "{candidate} matches {title} with a score of {}%.",
        percent(score)
    );
    if overlap.required_count > 0 {
        text.push_str(&format!(
            " The candidate possesses {} of the {} required skills",
            overlap.matching.len(),
            overlap.required_count
        ));
        if overlap.matching.is_empty() {
            text.push('.');
        } else {
            text.push_str(&format!(", including: {}.", listed(&overlap.matching)));
        }
    }
    text
}

/// Explanation for two profiles of the same kind, e.g. similar freelancers.
pub fn peer_explanation(a: &Profile, b: &Profile, score: f64) -> String {
    let first = display_name(a.name.as_deref(), "The first candidate");
    let second = display_name(b.name.as_deref(), "the second candidate");
    let shared = skill_overlap(a.profile_skills(), b.profile_skills()).matching;

    let skills = if shared.is_empty() {
        format!("{first} and {second} share no listed skills.")
    } else {
        format!(
            "{first} and {second} share {} skills including: {}.",
            shared.len(),
            listed(&shared)
        )
    };
    format!(
        "{skills} Their profiles have a {}% similarity based on their expertise and experience.",
        percent(score)
    )
}

/// Deterministic skill-analysis summary. Used when no external generator is configured.
#[derive(Debug, Clone, Default)]
pub struct TemplateExplainer;

#[async_trait]
impl MatchExplainer for TemplateExplainer {
    async fn explain(&self, job: &Job, profile: &Profile, score: f64) -> Result<String> {
        Ok(template_text(job, profile, score))
    }
}

fn template_text(job: &Entity, profile: &Entity, score: f64) -> String {
    let candidate = display_name(profile.name.as_deref(), DEFAULT_CANDIDATE_NAME);
    let title = display_name(job.title.as_deref(), DEFAULT_JOB_TITLE);
    let overlap = skill_overlap(job.job_skills(), profile.profile_skills());
    let or_none = |skills: &[String]| {
        if skills.is_empty() {
            "none".to_string()
        } else {
            listed(skills)
        }
    };

    format!(
        "{candidate} is a {}% match for {title}. Matching skills: {}. Missing skills: {}. Additional skills: {}.",
        percent(score),
        or_none(&overlap.matching),
        or_none(&overlap.missing),
        or_none(&overlap.additional),
    )
}
