//! Pure scoring rules: skill overlap, experience fit, rate fit and their weighted blend.

pub mod experience;
pub mod rate;
pub mod scoring;
pub mod skills;
pub mod weights;

pub use experience::{ExperienceLevel, ExperienceVerdict, experience_compatibility};
pub use rate::{is_rate_compatible, rate_compatibility, rate_difference};
pub use scoring::{ScoreBreakdown, adjusted_score, adjusted_score_with};
pub use skills::{SkillOverlap, normalize_skill_set, skill_match_score, skill_overlap};
pub use weights::{DEFAULT_WEIGHTS, ScoreWeights};
