//! Feature Vector Engine
//!
//! Combines the dimension normalizers and the genre-derived heuristics into a
//! 12-dimension `FeatureVector` with a confidence score.
//!
//! # Confidence
//! Starts at 0.8 and loses a fixed penalty per missing input:
//! - tempo missing/invalid: −0.20
//! - key missing/unrecognized: −0.15
//! - energy missing/non-finite: −0.10
//! - genre missing: −0.10
//!
//! A uniformly-0 or uniformly-1 vector halves the confidence. A vector with
//! NaN/Infinity is rejected with `FeatureError::InvalidVector`. Missing
//! optional fields never fail the computation.
//!
//! `assess` additionally runs the vector gate and returns its report with
//! the vector.

use super::cache::{Fingerprint, VectorCache};
use super::genre_keywords::{builtin_profiles, GenreProfile, KeywordTable};
use super::normalize::{self, HeuristicInputs};
use super::{is_uniform_extreme, FeatureVector, WeightTable, DIMENSIONS};
use crate::error::FeatureError;
use crate::quality::{vector_gate, QualityGate, QualityReport};
use segue_common::TrackDescriptor;
use std::sync::Arc;
use tracing::{debug, trace};

const BASE_CONFIDENCE: f64 = 0.8;
const MISSING_TEMPO_PENALTY: f64 = 0.20;
const MISSING_KEY_PENALTY: f64 = 0.15;
const MISSING_ENERGY_PENALTY: f64 = 0.10;
const MISSING_GENRE_PENALTY: f64 = 0.10;
const DEGENERATE_FACTOR: f64 = 0.5;

/// Static lookup tables shared by every engine instance
#[derive(Debug, Clone)]
pub struct FeatureTables {
    pub weights: Arc<WeightTable>,
    pub genre_profiles: Arc<KeywordTable<GenreProfile>>,
}

impl FeatureTables {
    /// Built-in weights and genre profiles
    pub fn builtin() -> Self {
        Self {
            weights: WeightTable::builtin(),
            genre_profiles: builtin_profiles(),
        }
    }
}

impl Default for FeatureTables {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A vector together with its vector-gate report
#[derive(Debug, Clone)]
pub struct VectorAssessment {
    pub vector: FeatureVector,
    pub report: QualityReport,
}

impl VectorAssessment {
    pub fn passed(&self) -> bool {
        self.report.passed
    }
}

/// Computes feature vectors from track descriptors
///
/// Stateless apart from the optional shared cache; cheap to clone and safe to
/// move into worker tasks.
#[derive(Debug, Clone)]
pub struct FeatureVectorEngine {
    tables: FeatureTables,
    cache: Option<Arc<VectorCache>>,
    gate: Arc<QualityGate<FeatureVector>>,
}

impl FeatureVectorEngine {
    pub fn new(tables: FeatureTables) -> Self {
        Self {
            tables,
            cache: None,
            gate: Arc::new(vector_gate()),
        }
    }

    /// Memoize vectors in `cache`, keyed by descriptor fingerprint
    pub fn with_cache(mut self, cache: Arc<VectorCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn weights(&self) -> Arc<WeightTable> {
        Arc::clone(&self.tables.weights)
    }

    pub fn cache(&self) -> Option<&Arc<VectorCache>> {
        self.cache.as_ref()
    }

    /// Vector for `descriptor`, served from the cache when one is attached
    pub fn vector_for(&self, descriptor: &TrackDescriptor) -> Result<FeatureVector, FeatureError> {
        match &self.cache {
            Some(cache) => {
                cache.get_or_compute(Fingerprint::of(descriptor), || self.compute_vector(descriptor))
            }
            None => self.compute_vector(descriptor),
        }
    }

    /// Vector for `descriptor` plus the vector gate's verdict on it
    ///
    /// # Errors
    /// `FeatureError::InvalidVector` if the vector cannot be computed
    pub fn assess(&self, descriptor: &TrackDescriptor) -> Result<VectorAssessment, FeatureError> {
        let vector = self.vector_for(descriptor)?;
        let report = self.gate.run(&vector);
        if !report.passed {
            debug!(track = %descriptor.id, score = report.score, issues = ?report.issues, "Vector failed vector gate");
        }
        Ok(VectorAssessment { vector, report })
    }

    /// Compute the feature vector for one descriptor (uncached)
    ///
    /// # Errors
    /// `FeatureError::InvalidVector` if any dimension is NaN/Infinity
    pub fn compute_vector(&self, descriptor: &TrackDescriptor) -> Result<FeatureVector, FeatureError> {
        let tempo = descriptor.usable_tempo();
        let key = descriptor.musical_key();
        let energy = descriptor.finite_energy();
        let genre = descriptor.genre_label();

        let (matched_keyword, profile) = match genre.and_then(|g| self.tables.genre_profiles.lookup(g)) {
            Some((keyword, profile)) => (Some(keyword), *profile),
            None => (None, GenreProfile::NEUTRAL),
        };

        let inputs = HeuristicInputs {
            tempo_bpm: tempo,
            mode: key.map(|k| k.mode()),
            energy,
            loudness_lufs: descriptor.loudness_lufs,
            spectral_centroid_hz: descriptor.spectral_centroid_hz,
        };

        let values: Vec<f64> = vec![
            normalize::normalize_tempo(tempo),
            normalize::normalize_key(key),
            normalize::normalize_energy(energy),
            normalize::danceability(&profile, &inputs),
            normalize::valence(&profile, &inputs),
            normalize::acousticness(&profile, &inputs),
            normalize::instrumentalness(&profile, &inputs),
            normalize::rhythmic_complexity(&profile, &inputs),
            normalize::spectral_brightness(&profile, &inputs),
            normalize::tempo_stability(&profile, &inputs),
            normalize::harmonic_complexity(&profile, &inputs),
            normalize::dynamic_range(&profile, &inputs),
        ];
        debug_assert_eq!(values.len(), DIMENSIONS);

        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(FeatureError::invalid(format!(
                "track '{}': dimension {} is not finite",
                descriptor.id, i
            )));
        }

        let mut confidence = BASE_CONFIDENCE;
        if tempo.is_none() {
            confidence -= MISSING_TEMPO_PENALTY;
        }
        if key.is_none() {
            confidence -= MISSING_KEY_PENALTY;
        }
        if energy.is_none() {
            confidence -= MISSING_ENERGY_PENALTY;
        }
        if genre.is_none() {
            confidence -= MISSING_GENRE_PENALTY;
        }
        if is_uniform_extreme(&values) {
            debug!(track = %descriptor.id, "Degenerate feature vector, halving confidence");
            confidence *= DEGENERATE_FACTOR;
        }

        trace!(
            track = %descriptor.id,
            genre_keyword = matched_keyword.unwrap_or("-"),
            confidence,
            "Computed feature vector"
        );

        FeatureVector::new(values, self.weights(), confidence.clamp(0.0, 1.0))
    }
}

impl Default for FeatureVectorEngine {
    fn default() -> Self {
        Self::new(FeatureTables::builtin())
    }
}
