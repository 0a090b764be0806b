//! Feature vectors
//!
//! A `FeatureVector` is the fixed 12-dimension fingerprint of a track. Every
//! dimension is a value in 0.0-1.0; the vector carries the global weight table
//! used by compatibility scoring and a confidence score.
//!
//! # Dimensions (in order)
//! | # | Dimension            | Weight |
//! |---|----------------------|--------|
//! | 0 | tempo                | 1.5    |
//! | 1 | key                  | 1.2    |
//! | 2 | energy               | 1.3    |
//! | 3 | danceability         | 1.0    |
//! | 4 | valence              | 0.9    |
//! | 5 | acousticness         | 0.8    |
//! | 6 | instrumentalness     | 0.7    |
//! | 7 | rhythmic complexity  | 0.8    |
//! | 8 | spectral brightness  | 0.7    |
//! | 9 | tempo stability      | 0.6    |
//! | 10| harmonic complexity  | 0.7    |
//! | 11| dynamic range        | 0.6    |
//!
//! Weights are heuristic and tunable, not derived from listener data.

pub mod cache;
pub mod engine;
pub mod genre_keywords;
pub mod normalize;

pub use cache::{CacheStats, Fingerprint, VectorCache};
pub use engine::{FeatureTables, FeatureVectorEngine, VectorAssessment};
pub use genre_keywords::{GenreProfile, KeywordTable};

use crate::error::FeatureError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Number of dimensions in every feature vector
pub const DIMENSIONS: usize = 12;

/// Tolerance used when testing for uniform (degenerate) vectors
const DEGENERATE_EPSILON: f64 = 1e-9;

const DEFAULT_WEIGHTS: [f64; DIMENSIONS] = [
    1.5, 1.2, 1.3, 1.0, 0.9, 0.8, 0.7, 0.8, 0.7, 0.6, 0.7, 0.6,
];

static BUILTIN_WEIGHTS: Lazy<Arc<WeightTable>> =
    Lazy::new(|| Arc::new(WeightTable { weights: DEFAULT_WEIGHTS }));

/// Named vector dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Tempo,
    Key,
    Energy,
    Danceability,
    Valence,
    Acousticness,
    Instrumentalness,
    RhythmicComplexity,
    SpectralBrightness,
    TempoStability,
    HarmonicComplexity,
    DynamicRange,
}

impl Dimension {
    /// All dimensions in vector order
    pub const ALL: [Dimension; DIMENSIONS] = [
        Dimension::Tempo,
        Dimension::Key,
        Dimension::Energy,
        Dimension::Danceability,
        Dimension::Valence,
        Dimension::Acousticness,
        Dimension::Instrumentalness,
        Dimension::RhythmicComplexity,
        Dimension::SpectralBrightness,
        Dimension::TempoStability,
        Dimension::HarmonicComplexity,
        Dimension::DynamicRange,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Tempo => "tempo",
            Dimension::Key => "key",
            Dimension::Energy => "energy",
            Dimension::Danceability => "danceability",
            Dimension::Valence => "valence",
            Dimension::Acousticness => "acousticness",
            Dimension::Instrumentalness => "instrumentalness",
            Dimension::RhythmicComplexity => "rhythmic_complexity",
            Dimension::SpectralBrightness => "spectral_brightness",
            Dimension::TempoStability => "tempo_stability",
            Dimension::HarmonicComplexity => "harmonic_complexity",
            Dimension::DynamicRange => "dynamic_range",
        }
    }
}

/// Per-dimension weights (all > 0), shared by every vector
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    weights: [f64; DIMENSIONS],
}

impl WeightTable {
    /// Create a custom weight table
    ///
    /// # Errors
    /// `FeatureError::InvalidVector` if any weight is non-finite or not positive
    pub fn new(weights: [f64; DIMENSIONS]) -> Result<Self, FeatureError> {
        if let Some((i, w)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w <= 0.0)
        {
            return Err(FeatureError::invalid(format!(
                "weight for {} must be positive, got {}",
                Dimension::ALL[i].name(),
                w
            )));
        }
        Ok(Self { weights })
    }

    /// Shared built-in table
    pub fn builtin() -> Arc<WeightTable> {
        Arc::clone(&BUILTIN_WEIGHTS)
    }

    pub fn as_array(&self) -> &[f64; DIMENSIONS] {
        &self.weights
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        self.weights[dimension.index()]
    }

    /// Euclidean norm of the weights (maximum possible weighted distance)
    pub fn norm(&self) -> f64 {
        self.weights.iter().map(|w| w * w).sum::<f64>().sqrt()
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS,
        }
    }
}

/// Fixed-length weighted track fingerprint
///
/// Vectors produced by `FeatureVectorEngine` are always valid. Vectors
/// supplied from outside (deserialized, `from_raw`) are validated where they
/// are used, so comparison still fails cleanly on corrupt input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f64>,
    confidence: f64,
    #[serde(skip)]
    weights: Arc<WeightTable>,
}

impl FeatureVector {
    /// Create a validated vector
    ///
    /// # Errors
    /// - `FeatureError::DimensionMismatch` if `values.len() != 12`
    /// - `FeatureError::InvalidVector` for NaN/Infinity or values outside 0.0-1.0
    pub fn new(
        values: Vec<f64>,
        weights: Arc<WeightTable>,
        confidence: f64,
    ) -> Result<Self, FeatureError> {
        check_values(&values)?;
        Ok(Self {
            values,
            confidence: confidence.clamp(0.0, 1.0),
            weights,
        })
    }

    /// Wrap externally supplied values without validation
    pub fn from_raw(values: Vec<f64>, weights: Arc<WeightTable>, confidence: f64) -> Self {
        Self {
            values,
            confidence,
            weights,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn get(&self, dimension: Dimension) -> Option<f64> {
        self.values.get(dimension.index()).copied()
    }

    /// Validate dimensionality and value range
    pub fn validate(&self) -> Result<(), FeatureError> {
        check_values(&self.values)
    }

    /// True if every value is 0.0 or every value is 1.0
    pub fn is_degenerate(&self) -> bool {
        is_uniform_extreme(&self.values)
    }
}

/// Check that `values` is a structurally valid feature vector
pub fn check_values(values: &[f64]) -> Result<(), FeatureError> {
    if values.len() != DIMENSIONS {
        return Err(FeatureError::DimensionMismatch {
            expected: DIMENSIONS,
            actual: values.len(),
        });
    }

    for (dimension, value) in Dimension::ALL.iter().zip(values) {
        if !value.is_finite() {
            return Err(FeatureError::invalid(format!(
                "{} is not finite ({})",
                dimension.name(),
                value
            )));
        }
        if !(0.0..=1.0).contains(value) {
            return Err(FeatureError::invalid(format!(
                "{} out of range ({})",
                dimension.name(),
                value
            )));
        }
    }

    Ok(())
}

pub(crate) fn is_uniform_extreme(values: &[f64]) -> bool {
    !values.is_empty()
        && (values.iter().all(|v| v.abs() < DEGENERATE_EPSILON)
            || values.iter().all(|v| (v - 1.0).abs() < DEGENERATE_EPSILON))
}
