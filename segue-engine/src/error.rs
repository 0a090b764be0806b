//! Error types for segue-engine
//!
//! `FeatureError` is fatal to a single vector operation only. `AssemblyError`
//! is the typed, non-partial outcome of a rejected playlist assembly; every
//! variant is recoverable by adjusting parameters and retrying.

use crate::playlist::AssemblyStage;
use thiserror::Error;

/// Feature vector construction / comparison error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Vector contains NaN/Infinity or values outside 0.0-1.0
    #[error("Invalid feature vector: {reason}")]
    InvalidVector { reason: String },

    /// Vector does not have the expected number of dimensions
    #[error("Feature vector has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl FeatureError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        FeatureError::InvalidVector {
            reason: reason.into(),
        }
    }
}

/// Playlist assembly error
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Seed track has no usable tempo
    #[error("Seed track '{seed_id}' has no usable tempo")]
    SeedIncomplete { seed_id: String },

    /// Filtering removed every candidate
    #[error("No compatible candidates: {pool_size} collected, none within {tolerance} tempo tolerance and quality filters")]
    NoCompatibleCandidates { pool_size: usize, tolerance: f64 },

    /// Seed vector is numerically invalid
    #[error(transparent)]
    InvalidVector(#[from] FeatureError),

    /// Assembly parameters rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Cancellation signal observed
    #[error("Assembly cancelled during {stage}")]
    Cancelled { stage: AssemblyStage },

    /// Candidate collection collaborator failed
    #[error("Candidate source failed: {0}")]
    CandidateSource(#[from] segue_common::Error),
}
