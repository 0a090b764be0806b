//! Compatibility Engine
//!
//! Pairwise similarity of feature vectors and genre labels.
//!
//! # Vector Similarity
//! Both vectors are multiplied elementwise by the weight table, then:
//! - `euclidean = 1 − ‖wa − wb‖ / ‖w‖` (‖w‖ is the largest possible weighted distance)
//! - `cosine = (wa · wb) / (‖wa‖ · ‖wb‖)`; when a norm is 0 the cosine is 1
//!   for identical vectors and 0 otherwise
//! - `overall = 0.6 · euclidean + 0.4 · cosine`
//!
//! # Tiers
//! - Excellent: overall ≥ 0.9
//! - Good: overall ≥ 0.8
//! - Fair: overall ≥ 0.7
//! - Poor: overall ≥ 0.6
//! - Incompatible: otherwise

pub mod genre_matrix;

pub use genre_matrix::{GenreCompatibilityMatrix, GenrePairEntry, NEUTRAL_GENRE_COMPATIBILITY};

use crate::error::FeatureError;
use crate::features::{FeatureVector, WeightTable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

const EUCLIDEAN_BLEND: f64 = 0.6;
const COSINE_BLEND: f64 = 0.4;

/// Discrete compatibility rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CompatibilityTier {
    Incompatible,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl CompatibilityTier {
    pub fn from_score(overall: f64) -> Self {
        if overall >= 0.9 {
            CompatibilityTier::Excellent
        } else if overall >= 0.8 {
            CompatibilityTier::Good
        } else if overall >= 0.7 {
            CompatibilityTier::Fair
        } else if overall >= 0.6 {
            CompatibilityTier::Poor
        } else {
            CompatibilityTier::Incompatible
        }
    }
}

impl fmt::Display for CompatibilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatibilityTier::Excellent => write!(f, "Excellent"),
            CompatibilityTier::Good => write!(f, "Good"),
            CompatibilityTier::Fair => write!(f, "Fair"),
            CompatibilityTier::Poor => write!(f, "Poor"),
            CompatibilityTier::Incompatible => write!(f, "Incompatible"),
        }
    }
}

/// Result of comparing two feature vectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityScore {
    pub euclidean: f64,
    pub cosine: f64,
    pub overall: f64,
    pub tier: CompatibilityTier,
}

/// A candidate that survived ranking
#[derive(Debug, Clone)]
pub struct RankedCandidate<T> {
    pub item: T,
    pub vector: FeatureVector,
    pub score: CompatibilityScore,
}

/// Vector and genre compatibility scoring
#[derive(Debug, Clone)]
pub struct CompatibilityEngine {
    weights: Arc<WeightTable>,
    genre_matrix: Arc<GenreCompatibilityMatrix>,
}

impl CompatibilityEngine {
    pub fn new(weights: Arc<WeightTable>, genre_matrix: Arc<GenreCompatibilityMatrix>) -> Self {
        Self {
            weights,
            genre_matrix,
        }
    }

    pub fn genre_matrix(&self) -> &Arc<GenreCompatibilityMatrix> {
        &self.genre_matrix
    }

    /// Weighted similarity of two vectors
    ///
    /// # Errors
    /// `FeatureError` if either vector has the wrong length, NaN/Infinity, or
    /// values outside 0.0-1.0
    pub fn similarity(&self, a: &FeatureVector, b: &FeatureVector) -> Result<CompatibilityScore, FeatureError> {
        a.validate()?;
        b.validate()?;

        let weights = self.weights.as_array();
        let max_distance = self.weights.norm();

        let mut distance_sq = 0.0;
        let mut dot = 0.0;
        let mut norm_a_sq = 0.0;
        let mut norm_b_sq = 0.0;
        for ((w, x), y) in weights.iter().zip(a.values()).zip(b.values()) {
            let wa = w * x;
            let wb = w * y;
            distance_sq += (wa - wb) * (wa - wb);
            dot += wa * wb;
            norm_a_sq += wa * wa;
            norm_b_sq += wb * wb;
        }

        let euclidean = (1.0 - distance_sq.sqrt() / max_distance).clamp(0.0, 1.0);
        let cosine = if norm_a_sq > 0.0 && norm_b_sq > 0.0 {
            (dot / (norm_a_sq.sqrt() * norm_b_sq.sqrt())).clamp(0.0, 1.0)
        } else if distance_sq == 0.0 {
            1.0
        } else {
            0.0
        };
        let overall = (EUCLIDEAN_BLEND * euclidean + COSINE_BLEND * cosine).clamp(0.0, 1.0);

        if !overall.is_finite() {
            return Err(FeatureError::invalid("similarity is not finite"));
        }

        Ok(CompatibilityScore {
            euclidean,
            cosine,
            overall,
            tier: CompatibilityTier::from_score(overall),
        })
    }

    /// Score, threshold, sort and truncate candidates against a seed
    ///
    /// Candidates scoring below `threshold` are discarded. Survivors are sorted
    /// by `overall` descending (ties keep input order) and truncated to
    /// `limit`. A candidate whose similarity fails is logged and skipped.
    pub fn rank_candidates<T>(
        &self,
        seed: &FeatureVector,
        candidates: Vec<(T, FeatureVector)>,
        threshold: f64,
        limit: usize,
    ) -> Vec<RankedCandidate<T>> {
        let total = candidates.len();
        let mut skipped = 0usize;

        let mut ranked: Vec<RankedCandidate<T>> = candidates
            .into_iter()
            .enumerate()
            .filter_map(|(index, (item, vector))| match self.similarity(seed, &vector) {
                Ok(score) => Some(RankedCandidate { item, vector, score }),
                Err(e) => {
                    warn!(candidate_index = index, error = %e, "Skipping candidate with invalid vector");
                    skipped += 1;
                    None
                }
            })
            .filter(|ranked| ranked.score.overall >= threshold)
            .collect();

        ranked.sort_by(|a, b| b.score.overall.total_cmp(&a.score.overall));
        ranked.truncate(limit);

        debug!(
            total,
            skipped,
            kept = ranked.len(),
            threshold,
            limit,
            "Ranked candidates"
        );

        ranked
    }

    /// Matrix compatibility of two genre labels (0.5 for unknown)
    pub fn genre_compatibility(&self, a: &str, b: &str) -> f64 {
        self.genre_matrix.compatibility(a, b)
    }
}

impl Default for CompatibilityEngine {
    fn default() -> Self {
        Self::new(WeightTable::builtin(), GenreCompatibilityMatrix::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureVectorEngine, DIMENSIONS};
    use segue_common::TrackDescriptor;

    const EPS: f64 = 1e-9;

    fn vector(values: Vec<f64>) -> FeatureVector {
        FeatureVector::new(values, WeightTable::builtin(), 0.8).unwrap()
    }

    fn track_vector(tempo: f64, key: &str, energy: f64, genre: &str) -> FeatureVector {
        FeatureVectorEngine::default()
            .compute_vector(
                &TrackDescriptor::new("t")
                    .with_tempo(tempo)
                    .with_key(key)
                    .with_energy(energy)
                    .with_genre(genre),
            )
            .unwrap()
    }

    #[test]
    fn test_self_similarity_is_maximal() {
        let engine = CompatibilityEngine::default();
        let v = track_vector(124.0, "Am", 0.7, "house");
        let score = engine.similarity(&v, &v).unwrap();

        assert!((score.euclidean - 1.0).abs() < EPS);
        assert!((score.cosine - 1.0).abs() < EPS);
        assert!((score.overall - 1.0).abs() < EPS);
        assert_eq!(score.tier, CompatibilityTier::Excellent);
    }

    #[test]
    fn test_all_zero_vector_is_fully_self_similar() {
        let engine = CompatibilityEngine::default();
        let zeros = vector(vec![0.0; DIMENSIONS]);
        let score = engine.similarity(&zeros, &zeros).unwrap();

        assert_eq!(score.cosine, 1.0);
        assert!((score.overall - 1.0).abs() < EPS);
        assert_eq!(score.tier, CompatibilityTier::Excellent);

        let mut values = vec![0.0; DIMENSIONS];
        values[0] = 0.5;
        let other = engine.similarity(&zeros, &vector(values)).unwrap();
        assert_eq!(other.cosine, 0.0);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let engine = CompatibilityEngine::default();
        let a = track_vector(124.0, "Am", 0.7, "house");
        let b = track_vector(90.0, "F#", 0.2, "jazz");
        let ab = engine.similarity(&a, &b).unwrap();
        let ba = engine.similarity(&b, &a).unwrap();
        assert!((ab.overall - ba.overall).abs() < EPS);
    }

    #[test]
    fn test_opposite_vectors_are_incompatible() {
        let engine = CompatibilityEngine::default();
        let score = engine
            .similarity(&vector(vec![0.0; DIMENSIONS]), &vector(vec![1.0; DIMENSIONS]))
            .unwrap();
        assert!(score.euclidean.abs() < EPS);
        assert_eq!(score.cosine, 0.0);
        assert_eq!(score.tier, CompatibilityTier::Incompatible);
    }

    #[test]
    fn test_similar_tracks_beat_dissimilar_tracks() {
        let engine = CompatibilityEngine::default();
        let seed = track_vector(124.0, "Am", 0.7, "house");
        let close = track_vector(125.0, "Em", 0.72, "deep house");
        let far = track_vector(70.0, "Eb", 0.1, "classical");
        assert!(
            engine.similarity(&seed, &close).unwrap().overall
                > engine.similarity(&seed, &far).unwrap().overall
        );
    }

    #[test]
    fn test_invalid_vector_is_rejected() {
        let engine = CompatibilityEngine::default();
        let good = vector(vec![0.5; DIMENSIONS]);
        let mut values = vec![0.5; DIMENSIONS];
        values[2] = f64::NAN;
        let bad = FeatureVector::from_raw(values, WeightTable::builtin(), 0.8);
        let short = FeatureVector::from_raw(vec![0.5; 4], WeightTable::builtin(), 0.8);

        assert!(matches!(engine.similarity(&good, &bad), Err(FeatureError::InvalidVector { .. })));
        assert!(matches!(
            engine.similarity(&short, &good),
            Err(FeatureError::DimensionMismatch { expected: 12, actual: 4 })
        ));
    }

    #[test]
    fn test_tier_breakpoints() {
        assert_eq!(CompatibilityTier::from_score(0.95), CompatibilityTier::Excellent);
        assert_eq!(CompatibilityTier::from_score(0.9), CompatibilityTier::Excellent);
        assert_eq!(CompatibilityTier::from_score(0.85), CompatibilityTier::Good);
        assert_eq!(CompatibilityTier::from_score(0.7), CompatibilityTier::Fair);
        assert_eq!(CompatibilityTier::from_score(0.65), CompatibilityTier::Poor);
        assert_eq!(CompatibilityTier::from_score(0.59), CompatibilityTier::Incompatible);
    }

    #[test]
    fn test_rank_candidates_thresholds_sorts_and_truncates() {
        let engine = CompatibilityEngine::default();
        let seed = track_vector(124.0, "Am", 0.7, "house");
        let candidates = vec![
            ("far", track_vector(70.0, "Eb", 0.1, "classical")),
            ("same", track_vector(124.0, "Am", 0.7, "house")),
            ("close", track_vector(126.0, "Em", 0.65, "tech house")),
            ("closer", track_vector(124.0, "Am", 0.68, "house")),
        ];

        let ranked = engine.rank_candidates(&seed, candidates, 0.8, 2);
        let ids: Vec<_> = ranked.iter().map(|r| r.item).collect();
        assert_eq!(ids, vec!["same", "closer"]);
        assert!(ranked[0].score.overall >= ranked[1].score.overall);
    }

    #[test]
    fn test_rank_candidates_skips_invalid_vectors() {
        let engine = CompatibilityEngine::default();
        let seed = vector(vec![0.5; DIMENSIONS]);
        let mut corrupt = vec![0.5; DIMENSIONS];
        corrupt[0] = f64::INFINITY;

        let candidates = vec![
            ("corrupt", FeatureVector::from_raw(corrupt, WeightTable::builtin(), 0.8)),
            ("valid", vector(vec![0.5; DIMENSIONS])),
        ];

        let ranked = engine.rank_candidates(&seed, candidates, 0.0, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].item, "valid");
    }

    #[test]
    fn test_genre_compatibility_uses_matrix() {
        let engine = CompatibilityEngine::default();
        assert_eq!(engine.genre_compatibility("house", "techno"), 0.8);
        assert_eq!(engine.genre_compatibility("house", "unheard-of"), NEUTRAL_GENRE_COMPATIBILITY);
    }
}
