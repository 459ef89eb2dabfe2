use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::ScoredCandidate;

/// Attribute filters applied after the score threshold.
///
/// Unrecognized keys in caller input are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationFilters {
    /// Case-insensitive equality on `location`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Exact equality on `availability`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    /// Lower bound on `experience_years`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_experience: Option<f64>,
}

impl RecommendationFilters {
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let mut filters = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "location" => filters.location = value.as_str().map(str::to_string),
                "availability" => filters.availability = value.as_str().map(str::to_string),
                "min_experience" => filters.min_experience = number(value),
                other => debug!(filter = other, "ignoring unrecognized filter key"),
            }
        }
        filters
    }

    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.availability.is_none() && self.min_experience.is_none()
    }

    /// Whether a transport document passes every configured filter.
    pub fn accepts(&self, data: &Value) -> bool {
        if let Some(location) = &self.location {
            let actual = data.get("location").and_then(Value::as_str).unwrap_or("");
            if actual.to_lowercase() != location.to_lowercase() {
                return false;
            }
        }

        if let Some(availability) = &self.availability {
            if data.get("availability").and_then(Value::as_str) != Some(availability.as_str()) {
                return false;
            }
        }

        if let Some(min_years) = self.min_experience {
            let years = data.get("experience_years").and_then(number).unwrap_or(0.0);
            if years < min_years {
                return false;
            }
        }

        true
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Threshold, attribute filters, then a stable descending sort by score.
pub fn filter_recommendations(
    candidates: Vec<ScoredCandidate>,
    threshold: f64,
    filters: &RecommendationFilters,
) -> Vec<ScoredCandidate> {
    let before = candidates.len();
    let mut kept: Vec<ScoredCandidate> = candidates
        .into_iter()
        .filter(|candidate| candidate.score >= threshold)
        .filter(|candidate| filters.accepts(&candidate.data))
        .collect();

    kept.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    debug!(before, after = kept.len(), threshold, "filtered recommendations");
    kept
}
