//! Search index seam: vector kNN and text search over stored entity documents.

mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub use memory::InMemoryIndex;

use crate::error::Result;

/// Exact-match terms: `field -> value`, or `field -> [values]` for any-of.
pub type IndexFilters = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
    /// Stored document with the vector field removed
    pub data: Value,
}

/// Backing store for entity documents, e.g. an Elasticsearch cluster.
///
/// Transient failures are reported as
/// [`MatchError::IndexUnavailable`](crate::MatchError::IndexUnavailable).
/// `update` on a missing document fails with
/// [`MatchError::NotFound`](crate::MatchError::NotFound).
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn vector_search(
        &self,
        vector: &[f32],
        collection: &str,
        size: usize,
        min_score: f64,
        filters: &IndexFilters,
    ) -> Result<Vec<SearchHit>>;

    /// `fields` accept `name^boost`, e.g. `title^3`.
    async fn text_search(
        &self,
        query: &str,
        collection: &str,
        fields: &[String],
        size: usize,
        filters: &IndexFilters,
    ) -> Result<Vec<SearchHit>>;

    async fn get(&self, collection: &str, id: &str) -> Result<Value>;

    async fn index(&self, collection: &str, id: &str, document: Value) -> Result<()>;

    async fn update(&self, collection: &str, id: &str, document: Value) -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// Document without its `embedding` field.
pub fn strip_embedding(mut document: Value) -> Value {
    if let Value::Object(map) = &mut document {
        map.remove("embedding");
    }
    document
}

/// Whether `document` satisfies every filter term.
pub fn matches_filters(document: &Value, filters: &IndexFilters) -> bool {
    filters.iter().all(|(field, expected)| {
        let actual = document.get(field).unwrap_or(&Value::Null);
        match expected {
            Value::Array(options) => options.iter().any(|option| term_matches(actual, option)),
            single => term_matches(actual, single),
        }
    })
}

fn term_matches(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(|item| item == expected),
        other => other == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filters_match_terms_and_any_of() {
        let doc = json!({"status": "open", "skills": ["rust", "go"], "location": "remote"});

        let mut filters = IndexFilters::new();
        filters.insert("status".into(), json!("open"));
        assert!(matches_filters(&doc, &filters));

        filters.insert("location".into(), json!(["onsite", "remote"]));
        assert!(matches_filters(&doc, &filters));

        filters.insert("skills".into(), json!("go"));
        assert!(matches_filters(&doc, &filters));

        filters.insert("missing".into(), json!("x"));
        assert!(!matches_filters(&doc, &filters));
    }

    #[test]
    fn strip_embedding_removes_vector_field() {
        let doc = strip_embedding(json!({"id": "1", "embedding": [0.1, 0.2]}));
        assert_eq!(doc, json!({"id": "1"}));
    }
}
