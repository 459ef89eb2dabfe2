pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod explain;
pub mod index;
pub mod logging;
pub mod matching;
pub mod recommender;
pub mod retry;
pub mod run_id;
pub mod telemetry;
pub mod vector;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub use config::EngineConfig;
pub use error::{ErrorReport, MatchError, Result};

/// Which side of the marketplace a record sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRole {
    Job,
    Profile,
}

impl EntityRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityRole::Job => "job",
            EntityRole::Profile => "profile",
        }
    }
}

/// One past position on a freelancer profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// A job posting or a freelancer profile.
///
/// Both sides share one loose record shape: every field is optional and
/// unknown attributes are kept in `extra` so they survive the round trip
/// through recommendations and the search index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default, deserialize_with = "deserialize_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64", skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64", skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64", skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_availability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type Job = Entity;
pub type Profile = Entity;

impl Entity {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Skills a job asks for: `required_skills`, or `skills` when that is empty.
    pub fn job_skills(&self) -> &[String] {
        if self.required_skills.is_empty() {
            &self.skills
        } else {
            &self.required_skills
        }
    }

    pub fn profile_skills(&self) -> &[String] {
        &self.skills
    }

    /// Supplied embedding if it is usable: non-empty, finite, and of the expected dimension.
    pub fn usable_embedding(&self, dimension: Option<usize>) -> Option<&[f32]> {
        let embedding = self.embedding.as_deref()?;
        if embedding.is_empty() || embedding.iter().any(|x| !x.is_finite()) {
            return None;
        }
        match dimension {
            Some(dim) if dim != embedding.len() => None,
            _ => Some(embedding),
        }
    }

    /// JSON view handed to callers and the search index, without the embedding.
    pub fn to_transport(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.remove("embedding");
                Value::Object(map)
            }
            Ok(other) => other,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize entity");
                Value::Object(Map::new())
            }
        }
    }

    /// Parse a transport document, filling in `id` when the document lacks one.
    pub fn from_document(id: Option<&str>, document: Value) -> Result<Self> {
        let mut entity: Entity = serde_json::from_value(document)
            .map_err(|err| MatchError::InvalidArgument(format!("malformed document: {err}")))?;
        if entity.id.is_none() {
            entity.id = id.map(str::to_string);
        }
        Ok(entity)
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn deserialize_lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_ids_are_accepted() {
        let entity: Entity = serde_json::from_value(json!({"id": 42, "title": "Rust dev"})).unwrap();
        assert_eq!(entity.id(), Some("42"));
    }

    #[test]
    fn unknown_fields_are_preserved() {
        let entity: Entity =
            serde_json::from_value(json!({"id": "j1", "company": "Acme", "remote": true})).unwrap();
        assert_eq!(entity.extra.get("company"), Some(&json!("Acme")));

        let transport = entity.to_transport();
        assert_eq!(transport["company"], json!("Acme"));
        assert_eq!(transport["remote"], json!(true));
    }

    #[test]
    fn lenient_numbers_accept_strings() {
        let entity: Entity = serde_json::from_value(json!({
            "budget": "100",
            "hourly_rate": 80.5,
            "experience_years": "n/a"
        }))
        .unwrap();
        assert_eq!(entity.budget, Some(100.0));
        assert_eq!(entity.hourly_rate, Some(80.5));
        assert_eq!(entity.experience_years, None);
    }

    #[test]
    fn job_skills_fall_back_to_skills() {
        let job = Entity {
            skills: vec!["python".into()],
            ..Default::default()
        };
        assert_eq!(job.job_skills(), ["python".to_string()]);

        let job = Entity {
            skills: vec!["python".into()],
            required_skills: vec!["rust".into()],
            ..Default::default()
        };
        assert_eq!(job.job_skills(), ["rust".to_string()]);
    }

    #[test]
    fn transport_strips_embedding() {
        let entity = Entity {
            id: Some("p1".into()),
            embedding: Some(vec![0.1, 0.2]),
            ..Default::default()
        };
        let transport = entity.to_transport();
        assert!(transport.get("embedding").is_none());
        assert_eq!(transport["id"], json!("p1"));
    }

    #[test]
    fn usable_embedding_rejects_malformed_vectors() {
        let mut entity = Entity {
            embedding: Some(vec![0.1, 0.2]),
            ..Default::default()
        };
        assert!(entity.usable_embedding(Some(2)).is_some());
        assert!(entity.usable_embedding(Some(3)).is_none());

        entity.embedding = Some(vec![]);
        assert!(entity.usable_embedding(None).is_none());

        entity.embedding = Some(vec![f32::NAN, 1.0]);
        assert!(entity.usable_embedding(None).is_none());
    }

    #[test]
    fn from_document_fills_missing_id() {
        let entity = Entity::from_document(Some("hit-7"), json!({"title": "Designer"})).unwrap();
        assert_eq!(entity.id(), Some("hit-7"));

        let entity = Entity::from_document(Some("hit-7"), json!({"id": "own", "title": "x"})).unwrap();
        assert_eq!(entity.id(), Some("own"));
    }
}
