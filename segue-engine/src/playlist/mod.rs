//! Playlist assembly
//!
//! # Pipeline
//! SeedValidation → CandidateCollection → Filtering → CompatibilityRanking →
//! EnergyOrdering → FinalQualityCheck → Emitted | Rejected
//!
//! The seed anchors the playlist: it is the tempo and similarity reference
//! and the first transition runs from the seed into the first member, but
//! the seed is not itself a member. `length` counts members only.
//!
//! Filtering and ranking are strictly ordered: an empty filtered set rejects
//! the assembly with `NoCompatibleCandidates`. The candidate list from an
//! earlier stage is never reused.

pub mod assembler;
pub mod filtering;
pub mod ordering;

pub use assembler::PlaylistAssembler;
pub use filtering::{filter_candidates, within_tolerance, FilterOutcome, FilterStats, FilteredCandidate};
pub use ordering::order_by_curve;

use crate::compatibility::CompatibilityScore;
use crate::error::AssemblyError;
use crate::features::normalize::normalize_energy;
use crate::quality::QualityReport;
use chrono::{DateTime, Utc};
use segue_common::TrackDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Requested energy progression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyCurve {
    Ascending,
    Descending,
    /// Alternating peak / valley
    Wave,
    /// Closest to the seed's energy first
    #[default]
    Plateau,
}

impl fmt::Display for EnergyCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnergyCurve::Ascending => "ascending",
            EnergyCurve::Descending => "descending",
            EnergyCurve::Wave => "wave",
            EnergyCurve::Plateau => "plateau",
        };
        f.write_str(name)
    }
}

impl FromStr for EnergyCurve {
    type Err = AssemblyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ascending" => Ok(EnergyCurve::Ascending),
            "descending" => Ok(EnergyCurve::Descending),
            "wave" => Ok(EnergyCurve::Wave),
            "plateau" => Ok(EnergyCurve::Plateau),
            other => Err(AssemblyError::InvalidConfiguration(format!(
                "Unknown energy curve '{}'",
                other
            ))),
        }
    }
}

/// Caller-supplied assembly parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Number of tracks to select, seed not counted
    pub length: usize,
    /// Maximum fractional tempo deviation from the seed (0 < t ≤ 1)
    pub tempo_tolerance: f64,
    /// Minimum overall similarity to the seed (0-1)
    pub min_similarity: f64,
    pub energy_curve: EnergyCurve,
    /// Playlist gate pass threshold (0-1)
    pub certification_threshold: f64,
    /// Minimum descriptor gate score for a candidate (0-1)
    pub min_descriptor_score: f64,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            length: 20,
            tempo_tolerance: 0.02,
            min_similarity: 0.6,
            energy_curve: EnergyCurve::Plateau,
            certification_threshold: 0.80,
            min_descriptor_score: 0.7,
        }
    }
}

impl AssemblyConfig {
    /// Reject unusable parameters
    ///
    /// # Errors
    /// `AssemblyError::InvalidConfiguration` for length 0, tolerance outside
    /// (0, 1], or any threshold outside 0.0-1.0
    pub fn validate(&self) -> Result<(), AssemblyError> {
        if self.length == 0 {
            return Err(AssemblyError::InvalidConfiguration(
                "Playlist length must be at least 1".to_string(),
            ));
        }
        if !(self.tempo_tolerance > 0.0 && self.tempo_tolerance <= 1.0) {
            return Err(AssemblyError::InvalidConfiguration(format!(
                "Tempo tolerance must be within (0, 1], got {}",
                self.tempo_tolerance
            )));
        }
        for (name, value) in [
            ("min_similarity", self.min_similarity),
            ("certification_threshold", self.certification_threshold),
            ("min_descriptor_score", self.min_descriptor_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AssemblyError::InvalidConfiguration(format!(
                    "{} must be within 0.0-1.0, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Pipeline stage, used for logging and cancellation reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyStage {
    SeedValidation,
    CandidateCollection,
    Filtering,
    CompatibilityRanking,
    EnergyOrdering,
    FinalQualityCheck,
}

impl fmt::Display for AssemblyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssemblyStage::SeedValidation => "seed validation",
            AssemblyStage::CandidateCollection => "candidate collection",
            AssemblyStage::Filtering => "filtering",
            AssemblyStage::CompatibilityRanking => "compatibility ranking",
            AssemblyStage::EnergyOrdering => "energy ordering",
            AssemblyStage::FinalQualityCheck => "final quality check",
        };
        f.write_str(name)
    }
}

/// Progress notification from a running assembly
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum AssemblyEvent {
    /// Cancellation check passed and `stage` is starting
    StageStarted { playlist_id: Uuid, stage: AssemblyStage },
    /// A batch of candidate vectors finished
    VectorBatchCompleted {
        playlist_id: Uuid,
        /// 1-based batch number
        batch: usize,
        /// Usable vectors so far
        computed: usize,
        /// Candidates entering ranking
        total: usize,
    },
}

/// Supplies the candidate pool for a seed
pub trait CandidateSource: Send + Sync {
    /// Up to `limit` candidates for `seed`
    fn collect(&self, seed: &TrackDescriptor, limit: usize) -> segue_common::Result<Vec<TrackDescriptor>>;
}

impl CandidateSource for [TrackDescriptor] {
    fn collect(&self, _seed: &TrackDescriptor, limit: usize) -> segue_common::Result<Vec<TrackDescriptor>> {
        Ok(self.iter().take(limit).cloned().collect())
    }
}

impl CandidateSource for Vec<TrackDescriptor> {
    fn collect(&self, seed: &TrackDescriptor, limit: usize) -> segue_common::Result<Vec<TrackDescriptor>> {
        self.as_slice().collect(seed, limit)
    }
}

/// One playlist track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistEntry {
    /// Descriptor as supplied by the caller
    pub descriptor: TrackDescriptor,
    /// Similarity to the seed
    pub compatibility: CompatibilityScore,
}

/// Aggregate statistics of an emitted playlist
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistSummary {
    pub track_count: usize,
    pub mean_tempo_bpm: f64,
    /// Highest minus lowest energy
    pub energy_span: f64,
    /// Sum of known durations
    pub total_duration_secs: f64,
}

impl PlaylistSummary {
    pub fn from_tracks<'a>(tracks: impl IntoIterator<Item = &'a TrackDescriptor>) -> Self {
        let mut track_count = 0;
        let mut tempo_sum = 0.0;
        let mut tempo_count = 0;
        let mut min_energy = f64::INFINITY;
        let mut max_energy = f64::NEG_INFINITY;
        let mut total_duration_secs = 0.0;

        for track in tracks {
            track_count += 1;
            if let Some(bpm) = track.usable_tempo() {
                tempo_sum += bpm;
                tempo_count += 1;
            }
            let energy = normalize_energy(track.finite_energy());
            min_energy = min_energy.min(energy);
            max_energy = max_energy.max(energy);
            total_duration_secs += track.usable_duration().unwrap_or(0.0);
        }

        Self {
            track_count,
            mean_tempo_bpm: if tempo_count > 0 { tempo_sum / tempo_count as f64 } else { 0.0 },
            energy_span: if track_count > 0 { max_energy - min_energy } else { 0.0 },
            total_duration_secs,
        }
    }
}

/// Ordered playlist anchored on a seed, with its quality report
#[derive(Debug, Clone, Serialize)]
pub struct Playlist {
    pub playlist_id: Uuid,
    pub assembled_at: DateTime<Utc>,
    /// Anchor track; precedes `entries` but is not one of them
    pub seed: TrackDescriptor,
    pub energy_curve: EnergyCurve,
    pub requested_length: usize,
    pub entries: Vec<PlaylistEntry>,
    pub summary: PlaylistSummary,
    pub quality: QualityReport,
}

impl Playlist {
    pub fn seed_id(&self) -> &str {
        &self.seed.id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &TrackDescriptor> + '_ {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn track_ids(&self) -> Vec<&str> {
        self.tracks().map(|t| t.id.as_str()).collect()
    }

    pub fn is_underfilled(&self) -> bool {
        self.quality.underfilled
    }

    /// Pretty JSON for export collaborators
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AssemblyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let cases = [
            AssemblyConfig { length: 0, ..Default::default() },
            AssemblyConfig { tempo_tolerance: 0.0, ..Default::default() },
            AssemblyConfig { tempo_tolerance: -0.1, ..Default::default() },
            AssemblyConfig { tempo_tolerance: 1.5, ..Default::default() },
            AssemblyConfig { tempo_tolerance: f64::NAN, ..Default::default() },
            AssemblyConfig { min_similarity: 1.2, ..Default::default() },
            AssemblyConfig { certification_threshold: -0.5, ..Default::default() },
            AssemblyConfig { min_descriptor_score: f64::NAN, ..Default::default() },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(AssemblyError::InvalidConfiguration(_))),
                "{:?}",
                config
            );
        }
    }

    #[test]
    fn test_energy_curve_parse_and_serde() {
        assert_eq!("Wave".parse::<EnergyCurve>().unwrap(), EnergyCurve::Wave);
        assert!("zigzag".parse::<EnergyCurve>().is_err());
        assert_eq!(serde_json::to_string(&EnergyCurve::Ascending).unwrap(), "\"ascending\"");
    }

    #[test]
    fn test_slice_source_respects_limit() {
        let pool = vec![TrackDescriptor::new("a"), TrackDescriptor::new("b"), TrackDescriptor::new("c")];
        let seed = TrackDescriptor::new("seed");
        assert_eq!(pool.collect(&seed, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_summary() {
        let tracks = [
            TrackDescriptor::new("a").with_tempo(120.0).with_energy(0.2).with_duration(200.0),
            TrackDescriptor::new("b").with_tempo(124.0).with_energy(0.8),
        ];
        let summary = PlaylistSummary::from_tracks(&tracks);
        assert_eq!(summary.track_count, 2);
        assert!((summary.mean_tempo_bpm - 122.0).abs() < 1e-12);
        assert!((summary.energy_span - 0.6).abs() < 1e-12);
        assert_eq!(summary.total_duration_secs, 200.0);
    }
}
