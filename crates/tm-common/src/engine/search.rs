use std::collections::HashMap;

use tracing::{Instrument, debug, info_span};

use super::RecommendationEngine;
use crate::error::Result;
use crate::index::{IndexFilters, SearchHit};
use crate::retry::retry_with_backoff;
use crate::{EntityRole, run_id, telemetry};

/// Options for [`RecommendationEngine::hybrid_search`].
#[derive(Debug, Clone, PartialEq)]
pub struct HybridSearch {
    pub size: usize,
    /// Falls back to the configured default threshold
    pub min_score: Option<f64>,
    pub filters: IndexFilters,
    pub vector_weight: f64,
    pub text_weight: f64,
}

impl Default for HybridSearch {
    fn default() -> Self {
        Self {
            size: 10,
            min_score: None,
            filters: IndexFilters::new(),
            vector_weight: 0.7,
            text_weight: 0.3,
        }
    }
}

impl HybridSearch {
    /// Blend used for skill lookups, leaning less on the vector side.
    pub fn for_skills(size: usize, filters: IndexFilters) -> Self {
        Self {
            size,
            filters,
            vector_weight: 0.6,
            text_weight: 0.4,
            ..Self::default()
        }
    }

    /// Weights scaled to sum to 1; non-finite or non-positive pairs fall back to the defaults.
    fn weights(&self) -> (f64, f64) {
        let vector = self.vector_weight.max(0.0);
        let text = self.text_weight.max(0.0);
        let total = vector + text;
        if total > 0.0 && total.is_finite() {
            (vector / total, text / total)
        } else {
            let defaults = Self::default();
            (defaults.vector_weight, defaults.text_weight)
        }
    }
}

/// Boosted text fields searched for each role.
pub fn text_fields(role: EntityRole) -> Vec<String> {
    let fields: &[&str] = match role {
        EntityRole::Job => &["title^3", "description", "required_skills^2"],
        EntityRole::Profile => &["name^3", "bio", "skills^2"],
    };
    fields.iter().map(|f| f.to_string()).collect()
}

struct Blended {
    hit: SearchHit,
    vector: f64,
    text: f64,
}

impl RecommendationEngine {
    /// Keyword search over the collection of `role`, best first.
    pub async fn search_by_text(
        &self,
        role: EntityRole,
        query: &str,
        size: usize,
        filters: &IndexFilters,
    ) -> Result<Vec<SearchHit>> {
        let collection = self.config.collection_for(role);
        let hits = self.text_hits(collection, role, query, size, filters).await?;
        debug!(collection, returned = hits.len(), "text search finished");
        Ok(hits)
    }

    /// Vector and keyword relevance blended into one score.
    ///
    /// Vector scores are unit similarities; text scores are scaled so the best
    /// keyword hit is 1. A document found by only one side scores 0 on the other.
    /// Hits below the threshold are dropped and ties keep vector order.
    pub async fn hybrid_search(
        &self,
        role: EntityRole,
        query_vector: &[f32],
        query_text: &str,
        options: &HybridSearch,
    ) -> Result<Vec<SearchHit>> {
        let index = self.index()?;
        let collection = self.config.collection_for(role);
        let span = info_span!("hybrid_search", run_id = %run_id::generate(), collection);

        async {
            let candidates = options.size.saturating_mul(2).max(1);
            let vector_hits = retry_with_backoff("vector_search", &self.retry, || {
                index.vector_search(query_vector, collection, candidates, 0.0, &options.filters)
            })
            .await
            .map_err(|err| {
                telemetry::increment(telemetry::INDEX_FAILURES);
                err.into_index_unavailable()
            })?;
            let text_hits = self
                .text_hits(collection, role, query_text, candidates, &options.filters)
                .await?;

            let mut blended: Vec<Blended> = Vec::with_capacity(vector_hits.len() + text_hits.len());
            let mut positions: HashMap<String, usize> = HashMap::new();
            for hit in vector_hits {
                let vector = if hit.score.is_finite() { hit.score.clamp(0.0, 1.0) } else { 0.0 };
                positions.insert(hit.id.clone(), blended.len());
                blended.push(Blended { hit, vector, text: 0.0 });
            }

            let best_text = text_hits.iter().map(|h| h.score).fold(0.0_f64, f64::max);
            for hit in text_hits {
                let text = if best_text > 0.0 && hit.score.is_finite() {
                    (hit.score / best_text).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                match positions.get(&hit.id) {
                    Some(&at) => blended[at].text = text,
                    None => {
                        positions.insert(hit.id.clone(), blended.len());
                        blended.push(Blended { hit, vector: 0.0, text });
                    }
                }
            }

            let (vector_weight, text_weight) = options.weights();
            let min_score = options.min_score.unwrap_or(self.config.default_min_score);
            let mut hits: Vec<SearchHit> = blended
                .into_iter()
                .map(|b| SearchHit {
                    score: vector_weight * b.vector + text_weight * b.text,
                    ..b.hit
                })
                .filter(|hit| hit.score >= min_score)
                .collect();
            hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            hits.truncate(options.size);

            debug!(returned = hits.len(), vector_weight, text_weight, "hybrid search finished");
            Ok(hits)
        }
        .instrument(span)
        .await
    }

    /// Documents of `role` matching `skills`, by skills embedding and skill keywords.
    pub async fn search_by_skills(
        &self,
        role: EntityRole,
        skills: &[String],
        size: usize,
        filters: IndexFilters,
    ) -> Result<Vec<SearchHit>> {
        let vector = self.embeddings.embed_skills(skills).await?;
        let text = skills.join(", ");
        self.hybrid_search(role, &vector, &text, &HybridSearch::for_skills(size, filters))
            .await
    }

    async fn text_hits(
        &self,
        collection: &str,
        role: EntityRole,
        query: &str,
        size: usize,
        filters: &IndexFilters,
    ) -> Result<Vec<SearchHit>> {
        let index = self.index()?;
        let fields = text_fields(role);
        retry_with_backoff("text_search", &self.retry, || {
            index.text_search(query, collection, &fields, size, filters)
        })
        .await
        .map_err(|err| {
            telemetry::increment(telemetry::INDEX_FAILURES);
            err.into_index_unavailable()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_scaled_to_one() {
        let options = HybridSearch {
            vector_weight: 3.0,
            text_weight: 1.0,
            ..HybridSearch::default()
        };
        assert_eq!(options.weights(), (0.75, 0.25));

        let broken = HybridSearch {
            vector_weight: 0.0,
            text_weight: -1.0,
            ..HybridSearch::default()
        };
        assert_eq!(broken.weights(), (0.7, 0.3));
    }

    #[test]
    fn fields_follow_role() {
        assert_eq!(text_fields(EntityRole::Job)[0], "title^3");
        assert_eq!(text_fields(EntityRole::Profile), vec!["name^3", "bio", "skills^2"]);
    }
}
