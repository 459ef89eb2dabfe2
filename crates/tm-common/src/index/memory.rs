use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::{IndexFilters, SearchHit, SearchIndex, matches_filters, strip_embedding};
use crate::embedding::normalize_text;
use crate::error::{MatchError, Result};
use crate::vector::unit_similarity;

type Collection = BTreeMap<String, Value>;

/// Process-local index with brute-force kNN. Serves the CLI, tests and small deployments.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn snapshot(&self, collection: &str) -> Vec<(String, Value)> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .map(|docs| docs.iter().map(|(id, doc)| (id.clone(), doc.clone())).collect())
            .unwrap_or_default()
    }
}

fn document_vector(document: &Value) -> Option<Vec<f32>> {
    let values = document.get("embedding")?.as_array()?;
    values.iter().map(|v| v.as_f64().map(|x| x as f32)).collect()
}

fn tokens(text: &str) -> BTreeSet<String> {
    normalize_text(text)
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(field_text)
            .collect::<Vec<_>>()
            .join(" "),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn parse_field(spec: &str) -> (&str, f64) {
    match spec.split_once('^') {
        Some((name, boost)) => (name, boost.parse::<f64>().unwrap_or(1.0)),
        None => (spec, 1.0),
    }
}

fn rank(mut hits: Vec<SearchHit>, size: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(size);
    hits
}

#[async_trait]
impl SearchIndex for InMemoryIndex {
    async fn vector_search(
        &self,
        vector: &[f32],
        collection: &str,
        size: usize,
        min_score: f64,
        filters: &IndexFilters,
    ) -> Result<Vec<SearchHit>> {
        let hits = self
            .snapshot(collection)
            .into_iter()
            .filter(|(_, doc)| matches_filters(doc, filters))
            .filter_map(|(id, doc)| {
                let stored = document_vector(&doc)?;
                let score = f64::from(unit_similarity(vector, &stored));
                (score >= min_score).then(|| SearchHit {
                    id,
                    score,
                    data: strip_embedding(doc),
                })
            })
            .collect();
        Ok(rank(hits, size))
    }

    async fn text_search(
        &self,
        query: &str,
        collection: &str,
        fields: &[String],
        size: usize,
        filters: &IndexFilters,
    ) -> Result<Vec<SearchHit>> {
        let query_tokens = tokens(query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }
        let fields: Vec<(&str, f64)> = fields.iter().map(|f| parse_field(f)).collect();

        let hits = self
            .snapshot(collection)
            .into_iter()
            .filter(|(_, doc)| matches_filters(doc, filters))
            .filter_map(|(id, doc)| {
                let score: f64 = fields
                    .iter()
                    .map(|(name, boost)| {
                        let field_tokens = doc.get(*name).map(field_text).map(|t| tokens(&t)).unwrap_or_default();
                        let overlap = query_tokens.intersection(&field_tokens).count();
                        boost * overlap as f64 / query_tokens.len() as f64
                    })
                    .sum();
                (score > 0.0).then(|| SearchHit {
                    id,
                    score,
                    data: strip_embedding(doc),
                })
            })
            .collect();
        Ok(rank(hits, size))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Value> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
            .map(strip_embedding)
            .ok_or_else(|| MatchError::NotFound(format!("{collection}/{id}")))
    }

    async fn index(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        let slot = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| MatchError::NotFound(format!("{collection}/{id}")))?;

        match (slot, document) {
            (Value::Object(existing), Value::Object(patch)) => {
                for (key, value) in patch {
                    existing.insert(key, value);
                }
            }
            (slot, document) => *slot = document,
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or_else(|| MatchError::NotFound(format!("{collection}/{id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seeded() -> InMemoryIndex {
        let index = InMemoryIndex::new();
        index
            .index("jobs", "a", json!({"title": "Rust backend engineer", "status": "open", "embedding": [1.0, 0.0]}))
            .await
            .unwrap();
        index
            .index("jobs", "b", json!({"title": "Go engineer", "status": "closed", "embedding": [0.0, 1.0]}))
            .await
            .unwrap();
        index
            .index("jobs", "c", json!({"title": "Designer", "status": "open"}))
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn vector_search_ranks_and_strips_embeddings() {
        let index = seeded().await;

        let hits = index
            .vector_search(&[1.0, 0.0], "jobs", 10, 0.0, &IndexFilters::new())
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert!(hits[0].data.get("embedding").is_none());
    }

    #[tokio::test]
    async fn vector_search_applies_min_score_and_filters() {
        let index = seeded().await;
        let mut filters = IndexFilters::new();
        filters.insert("status".into(), json!("open"));

        let hits = index.vector_search(&[0.0, 1.0], "jobs", 10, 0.0, &filters).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");

        let hits = index
            .vector_search(&[0.0, 1.0], "jobs", 10, 0.9, &IndexFilters::new())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");
    }

    #[tokio::test]
    async fn text_search_honors_boosts() {
        let index = seeded().await;
        index
            .index("jobs", "d", json!({"title": "Writer", "description": "engineer docs"}))
            .await
            .unwrap();

        let hits = index
            .text_search(
                "engineer",
                "jobs",
                &["title^3".to_string(), "description".to_string()],
                10,
                &IndexFilters::new(),
            )
            .await
            .unwrap();

        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "d"]);
        assert!(hits[0].score > hits[2].score);
    }

    #[tokio::test]
    async fn update_requires_existing_document() {
        let index = seeded().await;

        let err = index.update("jobs", "zzz", json!({"status": "open"})).await.unwrap_err();
        assert!(matches!(err, MatchError::NotFound(_)));

        index.update("jobs", "b", json!({"status": "open"})).await.unwrap();
        let doc = index.get("jobs", "b").await.unwrap();
        assert_eq!(doc["status"], json!("open"));
        assert_eq!(doc["title"], json!("Go engineer"));
    }

    #[tokio::test]
    async fn delete_removes_documents() {
        let index = seeded().await;
        index.delete("jobs", "a").await.unwrap();
        assert_eq!(index.len("jobs"), 2);
        assert!(index.get("jobs", "a").await.is_err());
        assert!(index.delete("jobs", "a").await.is_err());
        assert!(index.is_empty("profiles"));
    }
}
