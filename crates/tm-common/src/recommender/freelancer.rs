use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use super::{availability_satisfies, with_status};
use crate::engine::{
    DetailedExplanation, MatchDirection, RankedList, RecommendRequest, RecommendationEngine,
    RecommendationFilters, rerank,
};
use crate::error::Result;
use crate::matching::ScoreWeights;
use crate::{EntityRole, Job, Profile};

const AVAILABLE_STATUSES: &[&str] = &["available", "active"];

/// Finds freelancers for a job.
pub struct FreelancerRecommender {
    engine: Arc<RecommendationEngine>,
    weights: ScoreWeights,
}

impl FreelancerRecommender {
    pub fn new(engine: Arc<RecommendationEngine>, weights: Option<ScoreWeights>) -> Self {
        let weights = weights.map_or_else(|| engine.weights(), ScoreWeights::normalized);
        info!(?weights, "freelancer recommender ready");
        Self { engine, weights }
    }

    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    /// Available profiles ranked for `job`, with explanations.
    ///
    /// When the job declares `required_availability`, profiles whose
    /// availability does not cover it are dropped and ranks are reassigned.
    pub async fn get_recommendations(
        &self,
        job: &Job,
        available_profiles: &[Profile],
        limit: Option<usize>,
        filters: RecommendationFilters,
    ) -> Result<RankedList> {
        let available = with_status(available_profiles, AVAILABLE_STATUSES);
        debug!(
            profiles = available_profiles.len(),
            available = available.len(),
            "pre-filtered profiles by status"
        );

        let request = RecommendRequest {
            limit,
            min_score: None,
            filters,
            include_explanation: true,
            weights: Some(self.weights),
        };
        let ranked = self
            .engine
            .recommend(MatchDirection::ProfilesForJob, job, &available, &request)
            .await?;

        match job.required_availability.as_deref().filter(|r| !r.trim().is_empty()) {
            Some(required) => Ok(filter_by_availability(ranked, required)),
            None => Ok(ranked),
        }
    }

    /// Breakdown of one pair including skills the candidate has beyond the job's.
    pub async fn explain_match(&self, job: &Job, profile: &Profile, score: f64) -> DetailedExplanation {
        self.engine.explain_pair(job, profile, score, true).await
    }

    /// Profiles from `pool` most similar to `reference`, each with a peer explanation.
    pub async fn similar_profiles(
        &self,
        reference: &Profile,
        pool: &[Profile],
        limit: Option<usize>,
    ) -> Result<RankedList> {
        let mut ranked = self
            .engine
            .similar_to(reference, pool, limit, EntityRole::Profile)
            .await?;

        for recommendation in &mut ranked {
            let peer = pool
                .iter()
                .find(|candidate| candidate.id.is_some() && candidate.id == recommendation.id);
            if let Some(peer) = peer {
                recommendation.explanation =
                    Some(self.engine.explain_peers(reference, peer, recommendation.score));
            }
        }
        Ok(ranked)
    }
}

/// Keep recommendations whose profile availability covers `required`, then re-rank.
pub fn filter_by_availability(recommendations: RankedList, required: &str) -> RankedList {
    let before = recommendations.len();
    let mut kept: RankedList = recommendations
        .into_iter()
        .filter(|recommendation| {
            let declared = recommendation
                .data
                .get("availability")
                .and_then(Value::as_str)
                .unwrap_or("");
            availability_satisfies(declared, required)
        })
        .collect();
    rerank(&mut kept);

    debug!(before, after = kept.len(), required, "filtered by availability");
    kept
}
