use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ScoredCandidate;
use crate::index::strip_embedding;

/// One entry of a ranked list as handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Option<String>,
    /// Adjusted score in `[0, 1]`, rounded to 4 decimals
    pub score: f64,
    /// 1-based, contiguous
    pub rank: usize,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

pub type RankedList = Vec<Recommendation>;

pub fn round_score(score: f64) -> f64 {
    if score.is_finite() {
        (score * 10_000.0).round() / 10_000.0
    } else {
        0.0
    }
}

/// Assign ranks in the given order, round scores and strip internal fields.
pub fn format_recommendations(candidates: Vec<ScoredCandidate>) -> RankedList {
    candidates
        .into_iter()
        .enumerate()
        .map(|(idx, candidate)| Recommendation {
            id: candidate.entity.id.clone(),
            score: round_score(candidate.score),
            rank: idx + 1,
            data: strip_embedding(candidate.data),
            explanation: candidate.explanation,
        })
        .collect()
}

/// Re-number ranks after entries were dropped from a formatted list.
pub fn rerank(recommendations: &mut [Recommendation]) {
    for (idx, recommendation) in recommendations.iter_mut().enumerate() {
        recommendation.rank = idx + 1;
    }
}
