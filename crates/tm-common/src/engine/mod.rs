//! Recommendation pipeline.
//!
//! Every call runs EMBED → SCORE → FILTER → SORT → TRUNCATE → EXPLAIN? → FORMAT
//! on entities supplied by the caller. The embedding cache is the only state
//! shared between calls.

mod batch;
mod detail;
mod filter;
mod format;
mod search;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{Instrument, info, info_span, warn};

pub use batch::{BatchEntryReport, BatchOutcome, CancellationHandle};
pub use detail::DetailedExplanation;
pub use filter::{RecommendationFilters, filter_recommendations};
pub use format::{RankedList, Recommendation, format_recommendations, rerank, round_score};
pub use search::{HybridSearch, text_fields};

use crate::config::EngineConfig;
use crate::embedding::{CacheStats, EmbeddingCache, EmbeddingProvider, EmbeddingService};
use crate::error::{MatchError, Result};
use crate::explain::{MatchExplainer, fallback_explanation, peer_explanation};
use crate::index::{IndexFilters, SearchIndex};
use crate::matching::{ScoreWeights, adjusted_score_with};
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::vector::{top_k_similarities, unit_similarity};
use crate::{Entity, EntityRole, Job, Profile, run_id, telemetry};

/// Which side is the query and which side is ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchDirection {
    /// Query is a profile, candidates are jobs
    JobsForProfile,
    /// Query is a job, candidates are profiles
    ProfilesForJob,
}

impl MatchDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchDirection::JobsForProfile => "jobs-for-profile",
            MatchDirection::ProfilesForJob => "profiles-for-job",
        }
    }

    pub fn query_role(&self) -> EntityRole {
        match self {
            MatchDirection::JobsForProfile => EntityRole::Profile,
            MatchDirection::ProfilesForJob => EntityRole::Job,
        }
    }

    pub fn candidate_role(&self) -> EntityRole {
        match self {
            MatchDirection::JobsForProfile => EntityRole::Job,
            MatchDirection::ProfilesForJob => EntityRole::Profile,
        }
    }

    /// `(job, profile)` for a query/candidate pair.
    fn orient<'a>(&self, query: &'a Entity, candidate: &'a Entity) -> (&'a Job, &'a Profile) {
        match self {
            MatchDirection::JobsForProfile => (candidate, query),
            MatchDirection::ProfilesForJob => (query, candidate),
        }
    }
}

/// Per-call options. `None` fields take the engine's configured defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendRequest {
    pub limit: Option<usize>,
    pub min_score: Option<f64>,
    pub filters: RecommendationFilters,
    pub include_explanation: bool,
    pub weights: Option<ScoreWeights>,
}

/// A candidate that survived scoring, before ranks are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub entity: Entity,
    pub score: f64,
    /// Transport form of `entity`; filters read attributes from here
    pub data: Value,
    pub explanation: Option<String>,
}

impl ScoredCandidate {
    pub fn new(entity: Entity, score: f64) -> Self {
        let data = entity.to_transport();
        Self {
            entity,
            score,
            data,
            explanation: None,
        }
    }

    /// Candidate built from a hand-written document; fields that do not fit
    /// `Entity` leave it at its defaults.
    #[cfg(test)]
    pub(crate) fn from_data(data: Value, score: f64) -> Self {
        let entity = serde_json::from_value(data.clone()).unwrap_or_default();
        Self {
            entity,
            score,
            data,
            explanation: None,
        }
    }
}

pub struct RecommendationEngine {
    embeddings: EmbeddingService,
    explainer: Arc<dyn MatchExplainer>,
    index: Option<Arc<dyn SearchIndex>>,
    weights: ScoreWeights,
    retry: RetryPolicy,
    config: EngineConfig,
}

impl RecommendationEngine {
    pub fn new(config: EngineConfig, embeddings: EmbeddingService, explainer: Arc<dyn MatchExplainer>) -> Self {
        info!(
            model = embeddings.model(),
            dimension = embeddings.dimension(),
            cache_capacity = embeddings.cache().capacity(),
            max_recommendations = config.max_recommendations,
            default_min_score = config.default_min_score,
            "recommendation engine ready"
        );
        Self {
            embeddings,
            explainer,
            index: None,
            weights: ScoreWeights::default(),
            retry: config.retry_policy(),
            config,
        }
    }

    /// Engine with a fresh cache sized and a retry policy taken from `config`.
    pub fn from_provider(
        config: EngineConfig,
        provider: Arc<dyn EmbeddingProvider>,
        explainer: Arc<dyn MatchExplainer>,
    ) -> Self {
        let embeddings = EmbeddingService::new(
            provider,
            Arc::new(EmbeddingCache::new(config.cache_capacity)),
            config.retry_policy(),
            config.embedding_batch_size,
        );
        Self::new(config, embeddings, explainer)
    }

    pub fn with_index(mut self, index: Arc<dyn SearchIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights.normalized();
        self
    }

    /// Retry policy for explainer and index calls. Provider calls use the embedding service's own.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn embeddings(&self) -> &EmbeddingService {
        &self.embeddings
    }

    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.embeddings.cache_stats()
    }

    fn index(&self) -> Result<&Arc<dyn SearchIndex>> {
        self.index
            .as_ref()
            .ok_or_else(|| MatchError::InvalidArgument("no search index configured".into()))
    }

    fn weights_for(&self, request: &RecommendRequest) -> ScoreWeights {
        request.weights.map_or(self.weights, ScoreWeights::normalized)
    }

    /// Rank `pool` against `query`.
    pub async fn recommend(
        &self,
        direction: MatchDirection,
        query: &Entity,
        pool: &[Entity],
        request: &RecommendRequest,
    ) -> Result<RankedList> {
        let span = info_span!(
            "recommend",
            run_id = %run_id::generate(),
            direction = direction.as_str(),
            query_id = query.id().unwrap_or(""),
            pool_size = pool.len(),
        );

        async {
            let started = Instant::now();
            let query_vector = self.embeddings.embedding_for(query, direction.query_role()).await?;
            let weights = self.weights_for(request);

            let mut scored = Vec::with_capacity(pool.len());
            for candidate in pool {
                let candidate_vector = self
                    .embeddings
                    .embedding_for(candidate, direction.candidate_role())
                    .await?;
                let raw = f64::from(unit_similarity(&query_vector, &candidate_vector));
                let (job, profile) = direction.orient(query, candidate);
                let score = adjusted_score_with(raw, job, profile, &weights);
                scored.push(ScoredCandidate::new(candidate.clone(), score));
            }

            let ranked = self.finish(direction, query, scored, request).await;
            telemetry::record_recommend_duration(direction.as_str(), started.elapsed());
            info!(
                returned = ranked.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "recommendations ready"
            );
            Ok(ranked)
        }
        .instrument(span)
        .await
    }

    /// FILTER → SORT → TRUNCATE → EXPLAIN? → FORMAT.
    async fn finish(
        &self,
        direction: MatchDirection,
        query: &Entity,
        scored: Vec<ScoredCandidate>,
        request: &RecommendRequest,
    ) -> RankedList {
        let min_score = request.min_score.unwrap_or(self.config.default_min_score);
        let limit = request.limit.unwrap_or(self.config.max_recommendations);

        let mut kept = filter_recommendations(scored, min_score, &request.filters);
        kept.truncate(limit);

        if request.include_explanation {
            for candidate in &mut kept {
                let (job, profile) = direction.orient(query, &candidate.entity);
                let text = self.explain_match(job, profile, candidate.score).await;
                candidate.explanation = Some(text);
            }
        }

        let ranked = format_recommendations(kept);
        telemetry::add(telemetry::RECOMMENDATIONS_RETURNED, ranked.len() as u64);
        ranked
    }

    /// Natural-language explanation for one pair. Falls back to a deterministic text
    /// when the explainer fails or returns nothing, so it never fails itself.
    pub async fn explain_match(&self, job: &Job, profile: &Profile, score: f64) -> String {
        let explainer = &self.explainer;
        let outcome =
            retry_with_backoff("explain", &self.retry, || explainer.explain(job, profile, score)).await;

        match outcome {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(job_id = job.id().unwrap_or(""), "explainer returned empty text; using fallback");
                telemetry::increment(telemetry::EXPLANATION_FALLBACKS);
                fallback_explanation(job, profile, score)
            }
            Err(err) => {
                warn!(
                    job_id = job.id().unwrap_or(""),
                    profile_id = profile.id().unwrap_or(""),
                    error = %err,
                    "explainer failed; using fallback"
                );
                telemetry::increment(telemetry::EXPLANATION_FALLBACKS);
                fallback_explanation(job, profile, score)
            }
        }
    }

    /// Explanation for two profiles, e.g. a "similar freelancers" list.
    pub fn explain_peers(&self, a: &Profile, b: &Profile, score: f64) -> String {
        peer_explanation(a, b, score)
    }

    /// Full breakdown for one job/profile pair.
    pub async fn explain_pair(
        &self,
        job: &Job,
        profile: &Profile,
        score: f64,
        include_additional: bool,
    ) -> DetailedExplanation {
        let explanation = self.explain_match(job, profile, score).await;
        DetailedExplanation::build(job, profile, score, explanation, include_additional)
    }

    /// Items of the same kind most similar to `reference`, scored by `(cos + 1) / 2`.
    ///
    /// The reference is excluded from the pool by id before scoring.
    pub async fn similar_to(
        &self,
        reference: &Entity,
        pool: &[Entity],
        limit: Option<usize>,
        role: EntityRole,
    ) -> Result<RankedList> {
        let span = info_span!(
            "similar_to",
            run_id = %run_id::generate(),
            role = role.as_str(),
            reference_id = reference.id().unwrap_or(""),
        );

        async {
            let reference_vector = self.embeddings.embedding_for(reference, role).await?;
            let reference_id = reference.id();

            let mut entities = Vec::with_capacity(pool.len());
            let mut vectors = Vec::with_capacity(pool.len());
            for candidate in pool {
                if reference_id.is_some() && candidate.id() == reference_id {
                    continue;
                }
                vectors.push(self.embeddings.embedding_for(candidate, role).await?);
                entities.push(candidate);
            }

            let limit = limit.unwrap_or(self.config.max_recommendations);
            let ranked = format_recommendations(top_matches(&reference_vector, &entities, &vectors, limit));
            info!(returned = ranked.len(), "similar items ready");
            Ok(ranked)
        }
        .instrument(span)
        .await
    }

    /// Top-k over candidates that already carry usable embeddings; others are skipped.
    pub fn similarity_search(&self, query_embedding: &[f32], candidates: &[Entity], top_k: usize) -> Vec<ScoredCandidate> {
        let (entities, vectors): (Vec<&Entity>, Vec<&[f32]>) = candidates
            .iter()
            .filter_map(|candidate| match candidate.usable_embedding(Some(query_embedding.len())) {
                Some(vector) => Some((candidate, vector)),
                None => {
                    warn!(id = candidate.id().unwrap_or(""), "candidate has no usable embedding; skipping");
                    None
                }
            })
            .unzip();

        top_matches(query_embedding, &entities, &vectors, top_k)
    }

    /// Rank candidates fetched from the search index instead of a caller-supplied pool.
    pub async fn recommend_from_index(
        &self,
        direction: MatchDirection,
        query: &Entity,
        request: &RecommendRequest,
    ) -> Result<RankedList> {
        let index = self.index()?;
        let span = info_span!(
            "recommend_from_index",
            run_id = %run_id::generate(),
            direction = direction.as_str(),
            query_id = query.id().unwrap_or(""),
        );

        async {
            let started = Instant::now();
            let query_vector = self.embeddings.embedding_for(query, direction.query_role()).await?;
            let limit = request.limit.unwrap_or(self.config.max_recommendations);
            let collection = self.config.collection_for(direction.candidate_role());
            let size = limit.saturating_mul(2).max(1);
            let no_filters = IndexFilters::new();

            let hits = retry_with_backoff("vector_search", &self.retry, || {
                index.vector_search(&query_vector, collection, size, 0.0, &no_filters)
            })
            .await
            .map_err(|err| {
                telemetry::increment(telemetry::INDEX_FAILURES);
                err.into_index_unavailable()
            })?;

            let weights = self.weights_for(request);
            let mut scored = Vec::with_capacity(hits.len());
            for hit in hits {
                let candidate = match Entity::from_document(Some(hit.id.as_str()), hit.data) {
                    Ok(candidate) => candidate,
                    Err(err) => {
                        warn!(id = %hit.id, error = %err, "skipping malformed index document");
                        continue;
                    }
                };
                let raw = if hit.score.is_finite() { hit.score.clamp(0.0, 1.0) } else { 0.0 };
                let (job, profile) = direction.orient(query, &candidate);
                let score = adjusted_score_with(raw, job, profile, &weights);
                scored.push(ScoredCandidate::new(candidate, score));
            }

            let ranked = self.finish(direction, query, scored, request).await;
            telemetry::record_recommend_duration(direction.as_str(), started.elapsed());
            info!(collection, returned = ranked.len(), "index recommendations ready");
            Ok(ranked)
        }
        .instrument(span)
        .await
    }

    /// Write `entity` to its collection, embedding it when asked or when it has no usable vector.
    ///
    /// Updates in place and inserts when the document does not exist yet. Returns the id.
    pub async fn sync_entity(&self, role: EntityRole, entity: &Entity, regenerate_embedding: bool) -> Result<String> {
        let index = self.index()?;
        let id = entity
            .id()
            .ok_or_else(|| MatchError::InvalidArgument(format!("{} has no id", role.as_str())))?
            .to_string();
        let collection = self.config.collection_for(role);

        let mut document = entity.clone();
        if regenerate_embedding || document.usable_embedding(Some(self.embeddings.dimension())).is_none() {
            let vector = match role {
                EntityRole::Job => self.embeddings.embed_job(entity).await?,
                EntityRole::Profile => self.embeddings.embed_profile(entity).await?,
            };
            document.embedding = Some(vector);
        }
        let body = serde_json::to_value(&document)
            .map_err(|err| MatchError::InvalidArgument(format!("cannot serialize {id}: {err}")))?;

        let index_failure = |err: MatchError| {
            telemetry::increment(telemetry::INDEX_FAILURES);
            err.into_index_unavailable()
        };

        match retry_with_backoff("update", &self.retry, || index.update(collection, &id, body.clone())).await {
            Ok(()) => {}
            Err(MatchError::NotFound(_)) => {
                warn!(%id, collection, "document missing on update; inserting instead");
                retry_with_backoff("index", &self.retry, || index.index(collection, &id, body.clone()))
                    .await
                    .map_err(index_failure)?;
            }
            Err(err) => return Err(index_failure(err)),
        }

        info!(%id, collection, "entity synced");
        Ok(id)
    }
}

fn top_matches<V: AsRef<[f32]>>(query: &[f32], entities: &[&Entity], vectors: &[V], k: usize) -> Vec<ScoredCandidate> {
    top_k_similarities(query, vectors, k, true)
        .into_iter()
        .filter_map(|(idx, cosine)| {
            let entity = entities.get(idx)?;
            Some(ScoredCandidate::new((*entity).clone(), f64::from((cosine + 1.0) / 2.0)))
        })
        .collect()
}
