use std::sync::Arc;

use tracing::{debug, info};

use super::with_status;
use crate::engine::{
    DetailedExplanation, MatchDirection, RankedList, RecommendRequest, RecommendationEngine,
    RecommendationFilters,
};
use crate::error::Result;
use crate::matching::ScoreWeights;
use crate::{EntityRole, Job, Profile};

const OPEN_STATUSES: &[&str] = &["open", "active"];

/// Finds jobs for a freelancer.
pub struct JobRecommender {
    engine: Arc<RecommendationEngine>,
    weights: ScoreWeights,
}

impl JobRecommender {
    pub fn new(engine: Arc<RecommendationEngine>, weights: Option<ScoreWeights>) -> Self {
        let weights = weights.map_or_else(|| engine.weights(), ScoreWeights::normalized);
        info!(?weights, "job recommender ready");
        Self { engine, weights }
    }

    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    /// Open or active jobs from `available_jobs`, ranked for `profile`, with explanations.
    pub async fn get_recommendations(
        &self,
        profile: &Profile,
        available_jobs: &[Job],
        limit: Option<usize>,
        filters: RecommendationFilters,
    ) -> Result<RankedList> {
        let open_jobs = with_status(available_jobs, OPEN_STATUSES);
        debug!(
            available = available_jobs.len(),
            open = open_jobs.len(),
            "pre-filtered jobs by status"
        );

        let request = RecommendRequest {
            limit,
            min_score: None,
            filters,
            include_explanation: true,
            weights: Some(self.weights),
        };
        self.engine
            .recommend(MatchDirection::JobsForProfile, profile, &open_jobs, &request)
            .await
    }

    /// Breakdown of one pair without the candidate's additional skills.
    pub async fn explain_match(&self, job: &Job, profile: &Profile, score: f64) -> DetailedExplanation {
        self.engine.explain_pair(job, profile, score, false).await
    }

    /// Jobs from `pool` most similar to `reference`.
    pub async fn similar_jobs(&self, reference: &Job, pool: &[Job], limit: Option<usize>) -> Result<RankedList> {
        self.engine.similar_to(reference, pool, limit, EntityRole::Job).await
    }
}
