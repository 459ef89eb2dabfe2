#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use tm_common::embedding::{EmbeddingCache, EmbeddingProvider, EmbeddingService, HashEmbeddingProvider};
use tm_common::engine::RecommendationEngine;
use tm_common::explain::{MatchExplainer, TemplateExplainer};
use tm_common::index::{IndexFilters, SearchHit, SearchIndex};
use tm_common::retry::RetryPolicy;
use tm_common::{EngineConfig, Entity, Job, MatchError, Profile, Result};

pub const DIMENSION: usize = 2;

/// Provider that fails its first `failures` calls, then delegates to the hash provider.
pub struct FlakyProvider {
    inner: HashEmbeddingProvider,
    failures: usize,
    pub calls: AtomicUsize,
}

impl FlakyProvider {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: HashEmbeddingProvider::new("hash-v1", DIMENSION),
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_failing() -> Self {
        Self::new(usize::MAX)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyProvider {
    fn model(&self) -> &str {
        self.inner.model()
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(MatchError::ProviderUnavailable("embedding backend returned 503".into()));
        }
        self.inner.embed(text).await
    }
}

/// Explainer that always fails with a transient error.
#[derive(Default)]
pub struct FailingExplainer {
    pub calls: AtomicUsize,
}

impl FailingExplainer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatchExplainer for FailingExplainer {
    async fn explain(&self, _job: &Job, _profile: &Profile, _score: f64) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MatchError::ProviderUnavailable("completion backend unreachable".into()))
    }
}

/// Search index that is down for every call.
#[derive(Default)]
pub struct DownIndex {
    pub calls: AtomicUsize,
}

impl DownIndex {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MatchError::IndexUnavailable("connection refused".into()))
    }
}

#[async_trait]
impl SearchIndex for DownIndex {
    async fn vector_search(
        &self,
        _vector: &[f32],
        _collection: &str,
        _size: usize,
        _min_score: f64,
        _filters: &IndexFilters,
    ) -> Result<Vec<SearchHit>> {
        self.fail()
    }

    async fn text_search(
        &self,
        _query: &str,
        _collection: &str,
        _fields: &[String],
        _size: usize,
        _filters: &IndexFilters,
    ) -> Result<Vec<SearchHit>> {
        self.fail()
    }

    async fn get(&self, _collection: &str, _id: &str) -> Result<Value> {
        self.fail()
    }

    async fn index(&self, _collection: &str, _id: &str, _document: Value) -> Result<()> {
        self.fail()
    }

    async fn update(&self, _collection: &str, _id: &str, _document: Value) -> Result<()> {
        self.fail()
    }

    async fn delete(&self, _collection: &str, _id: &str) -> Result<()> {
        self.fail()
    }
}

pub fn config() -> EngineConfig {
    EngineConfig {
        embedding_dimension: DIMENSION,
        default_min_score: 0.0,
        batch_concurrency: 2,
        ..EngineConfig::default()
    }
}

/// Engine with instant retries (`attempts` per call) over the given seams.
pub fn engine_with(
    provider: Arc<dyn EmbeddingProvider>,
    explainer: Arc<dyn MatchExplainer>,
    attempts: u32,
) -> RecommendationEngine {
    engine_with_config(config(), provider, explainer, attempts)
}

pub fn engine_with_config(
    config: EngineConfig,
    provider: Arc<dyn EmbeddingProvider>,
    explainer: Arc<dyn MatchExplainer>,
    attempts: u32,
) -> RecommendationEngine {
    let embeddings = EmbeddingService::new(
        provider,
        Arc::new(EmbeddingCache::new(64)),
        RetryPolicy::immediate(attempts),
        16,
    );
    RecommendationEngine::new(config, embeddings, explainer).with_retry_policy(RetryPolicy::immediate(attempts))
}

pub fn engine() -> RecommendationEngine {
    engine_with(
        Arc::new(HashEmbeddingProvider::new("hash-v1", DIMENSION)),
        Arc::new(TemplateExplainer),
        2,
    )
}

pub fn job(id: &str, skills: &[&str], vector: [f32; 2]) -> Entity {
    Entity {
        id: Some(id.into()),
        title: Some(format!("Job {id}")),
        required_skills: skills.iter().map(|s| s.to_string()).collect(),
        experience_level: Some("intermediate".into()),
        budget: Some(100.0),
        status: Some("open".into()),
        embedding: Some(vector.to_vec()),
        ..Default::default()
    }
}

pub fn profile(id: &str, skills: &[&str], rate: f64, vector: [f32; 2]) -> Entity {
    Entity {
        id: Some(id.into()),
        name: Some(format!("Candidate {id}")),
        skills: skills.iter().map(|s| s.to_string()).collect(),
        experience_level: Some("intermediate".into()),
        hourly_rate: Some(rate),
        status: Some("available".into()),
        availability: Some("full-time".into()),
        embedding: Some(vector.to_vec()),
        ..Default::default()
    }
}
