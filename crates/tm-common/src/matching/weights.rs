use serde::{Deserialize, Serialize};

/// Default blend: semantic similarity dominates, skills next, then experience and rate.
pub const DEFAULT_WEIGHTS: ScoreWeights = ScoreWeights {
    similarity: 0.5,
    skills: 0.3,
    experience: 0.1,
    rate: 0.1,
};

const SUM_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub similarity: f64,
    pub skills: f64,
    pub experience: f64,
    pub rate: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.similarity + self.skills + self.experience + self.rate
    }

    /// Rescale so the weights sum to 1.
    ///
    /// Weights already within 0.001 of 1 are returned as-is. Negative or
    /// non-finite weights, or an all-zero set, fall back to the defaults.
    pub fn normalized(self) -> Self {
        let parts = [self.similarity, self.skills, self.experience, self.rate];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) || self.sum() <= 0.0 {
            tracing::warn!(weights = ?self, "invalid score weights; using defaults");
            return DEFAULT_WEIGHTS;
        }

        let sum = self.sum();
        if (sum - 1.0).abs() <= SUM_TOLERANCE {
            return self;
        }

        tracing::warn!(sum, "score weights do not sum to 1; normalizing");
        Self {
            similarity: self.similarity / sum,
            skills: self.skills / sum,
            experience: self.experience / sum,
            rate: self.rate / sum,
        }
    }
}
