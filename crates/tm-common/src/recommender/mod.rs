//! Policy layers over [`RecommendationEngine`](crate::engine::RecommendationEngine)
//! for the two sides of the marketplace.

mod freelancer;
mod job;

pub use freelancer::FreelancerRecommender;
pub use job::JobRecommender;

use crate::Entity;

/// Canonical availability label: lowercase, with `fulltime`/`full time` and
/// `parttime`/`part time` folded to their hyphenated forms.
pub fn normalize_availability(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    match lowered.as_str() {
        "fulltime" | "full time" => "full-time".to_string(),
        "parttime" | "part time" => "part-time".to_string(),
        _ => lowered,
    }
}

/// Whether a candidate's declared availability covers a requirement.
///
/// Full-time covers part-time; part-time never covers full-time.
pub fn availability_satisfies(candidate: &str, required: &str) -> bool {
    let candidate = normalize_availability(candidate);
    let required = normalize_availability(required);
    candidate == required || (candidate == "full-time" && required == "part-time")
}

fn has_status(entity: &Entity, allowed: &[&str]) -> bool {
    entity
        .status
        .as_deref()
        .map(|status| status.trim().to_lowercase())
        .is_some_and(|status| allowed.contains(&status.as_str()))
}

/// Entities whose `status` is one of `allowed` (case-insensitive), in input order.
pub(crate) fn with_status(pool: &[Entity], allowed: &[&str]) -> Vec<Entity> {
    pool.iter()
        .filter(|entity| has_status(entity, allowed))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_aliases_are_folded() {
        assert_eq!(normalize_availability("Full Time"), "full-time");
        assert_eq!(normalize_availability("PARTTIME"), "part-time");
        assert_eq!(normalize_availability("Contract"), "contract");
    }

    #[test]
    fn full_time_covers_part_time_only_one_way() {
        assert!(availability_satisfies("full-time", "part-time"));
        assert!(!availability_satisfies("part-time", "full-time"));
        assert!(availability_satisfies("fulltime", "Full-Time"));
        assert!(!availability_satisfies("contract", "part-time"));
    }

    #[test]
    fn status_filter_is_case_insensitive() {
        let pool = vec![
            Entity {
                id: Some("1".into()),
                status: Some("Open".into()),
                ..Default::default()
            },
            Entity {
                id: Some("2".into()),
                status: Some("closed".into()),
                ..Default::default()
            },
            Entity {
                id: Some("3".into()),
                ..Default::default()
            },
        ];
        let kept = with_status(&pool, &["open", "active"]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id(), Some("1"));
    }
}
