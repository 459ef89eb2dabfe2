//! Dense vector math used by the matcher: norms, cosine similarity, top-k ranking.
//!
//! Vectors are plain `f32` slices. Operations that compare two vectors of
//! different lengths either return a neutral value with a warning (similarity)
//! or an [`MatchError::InvalidArgument`] (distance and aggregation).

use std::cmp::Ordering;

use sha2::{Digest, Sha256};

use crate::error::{MatchError, Result};

const FINGERPRINT_LEN: usize = 32;

/// Euclidean length, scaled by the largest component so that large finite
/// vectors do not overflow and tiny ones do not underflow to zero.
pub fn l2_norm(v: &[f32]) -> f32 {
    let scale = v.iter().fold(0.0_f32, |max, x| max.max(x.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return scale;
    }
    scale * v.iter().map(|x| (x / scale) * (x / scale)).sum::<f32>().sqrt()
}

/// Unit-length copy of `v`. A zero vector comes back unchanged.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    normalize_in_place(&mut out);
    out
}

pub fn normalize_in_place(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 && norm.is_finite() {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity in `[-1, 1]`.
///
/// Zero vectors and dimension mismatches yield `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        tracing::warn!(
            a_len = a.len(),
            b_len = b.len(),
            "embedding dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }

    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let cos: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x / norm_a) * (y / norm_b))
        .sum();
    if cos.is_finite() { cos.clamp(-1.0, 1.0) } else { 0.0 }
}

/// Cosine similarity mapped onto `[0, 1]` as `(cos + 1) / 2`.
pub fn unit_similarity(a: &[f32], b: &[f32]) -> f32 {
    (cosine_similarity(a, b) + 1.0) / 2.0
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(MatchError::InvalidArgument(format!(
            "cannot measure distance between vectors of length {} and {}",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt())
}

/// Indices and scores of the `k` candidates most similar to `query`, best first.
///
/// With `normalize` the score is the cosine similarity. Without it the raw dot
/// product is used, which is only meaningful for vectors that are already unit length.
/// Ties keep candidate order.
pub fn top_k_similarities<V: AsRef<[f32]>>(
    query: &[f32],
    candidates: &[V],
    k: usize,
    normalize: bool,
) -> Vec<(usize, f32)> {
    if k == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(idx, candidate)| {
            let candidate = candidate.as_ref();
            let score = if normalize {
                cosine_similarity(query, candidate)
            } else if query.len() == candidate.len() {
                let raw = dot(query, candidate);
                if raw.is_finite() { raw.clamp(-1.0, 1.0) } else { 0.0 }
            } else {
                0.0
            };
            (idx, score)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    scored
}

/// Pairwise similarities; row `i` holds `a[i]` against every vector of `b`.
///
/// With `normalize` every vector is scaled to unit length first and the cells are
/// cosine similarities; without it the cells are clamped dot products.
pub fn batch_similarity_matrix<A: AsRef<[f32]>, B: AsRef<[f32]>>(
    a: &[A],
    b: &[B],
    normalize: bool,
) -> Vec<Vec<f32>> {
    let prepare = |v: &[f32]| if normalize { self::normalize(v) } else { v.to_vec() };
    let columns: Vec<Vec<f32>> = b.iter().map(|v| prepare(v.as_ref())).collect();

    a.iter()
        .map(|row| {
            let row = prepare(row.as_ref());
            columns
                .iter()
                .map(|col| {
                    if row.len() != col.len() {
                        return cosine_similarity(&row, col);
                    }
                    let cell = dot(&row, col);
                    if cell.is_finite() { cell.clamp(-1.0, 1.0) } else { 0.0 }
                })
                .collect()
        })
        .collect()
}

/// Weighted mean of equally sized vectors, re-normalized to unit length.
/// Weights default to uniform.
pub fn aggregate_vectors<V: AsRef<[f32]>>(vectors: &[V], weights: Option<&[f32]>) -> Result<Vec<f32>> {
    let Some(first) = vectors.first() else {
        return Err(MatchError::InvalidArgument(
            "cannot aggregate an empty vector list".into(),
        ));
    };
    let dimension = first.as_ref().len();

    if let Some(bad) = vectors.iter().find(|v| v.as_ref().len() != dimension) {
        return Err(MatchError::InvalidArgument(format!(
            "cannot aggregate vectors of length {dimension} and {}",
            bad.as_ref().len()
        )));
    }

    let uniform;
    let weights = match weights {
        Some(w) if w.len() != vectors.len() => {
            return Err(MatchError::InvalidArgument(format!(
                "{} weights supplied for {} vectors",
                w.len(),
                vectors.len()
            )));
        }
        Some(w) => w,
        None => {
            uniform = vec![1.0 / vectors.len() as f32; vectors.len()];
            &uniform[..]
        }
    };

    let mut out = vec![0.0f32; dimension];
    for (vector, weight) in vectors.iter().zip(weights) {
        for (acc, x) in out.iter_mut().zip(vector.as_ref()) {
            *acc += x * weight;
        }
    }
    normalize_in_place(&mut out);
    Ok(out)
}

/// Stable short identifier for a vector: SHA-256 over the little-endian bytes, first 32 hex chars.
pub fn vector_fingerprint(v: &[f32]) -> String {
    let mut hasher = Sha256::new();
    for x in v {
        hasher.update(x.to_le_bytes());
    }
    let mut hex: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    hex.truncate(FINGERPRINT_LEN);
    hex
}
