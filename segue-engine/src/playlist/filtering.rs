//! Candidate filtering
//!
//! Drops, in order:
//! 1. candidates without a usable tempo (no default tempo is ever substituted)
//! 2. candidates whose tempo deviates from the seed by more than the tolerance
//! 3. candidates scoring below the minimum on the descriptor gate
//!
//! The tolerance bound is inclusive: `|candidate − seed| ≤ seed × tolerance`.
//! Survivors keep their input order and carry the sanitized descriptor used
//! for vector computation.

use crate::quality::DescriptorGate;
use segue_common::TrackDescriptor;
use serde::Serialize;
use tracing::debug;

/// Absorbs rounding in `seed × tolerance` so tracks exactly on the bound pass
const TOLERANCE_EPSILON: f64 = 1e-9;

/// True if `candidate_bpm` is within `tolerance` (fraction) of `seed_bpm`
pub fn within_tolerance(seed_bpm: f64, candidate_bpm: f64, tolerance: f64) -> bool {
    (candidate_bpm - seed_bpm).abs() <= seed_bpm * tolerance + TOLERANCE_EPSILON
}

/// A candidate that passed every filter
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredCandidate {
    /// Descriptor as supplied
    pub original: TrackDescriptor,
    /// Descriptor with unusable optional fields replaced
    pub sanitized: TrackDescriptor,
    pub descriptor_score: f64,
}

/// Drop counters per filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FilterStats {
    pub examined: usize,
    pub missing_tempo: usize,
    pub out_of_tolerance: usize,
    pub below_quality: usize,
    pub kept: usize,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub kept: Vec<FilteredCandidate>,
    pub stats: FilterStats,
}

impl FilterOutcome {
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }

    /// Original descriptors of the survivors
    pub fn descriptors(&self) -> Vec<TrackDescriptor> {
        self.kept.iter().map(|c| c.original.clone()).collect()
    }
}

/// Apply the tempo and descriptor-quality filters
pub fn filter_candidates(
    seed_bpm: f64,
    candidates: Vec<TrackDescriptor>,
    tolerance: f64,
    gate: &DescriptorGate,
    min_descriptor_score: f64,
) -> FilterOutcome {
    let mut stats = FilterStats {
        examined: candidates.len(),
        ..Default::default()
    };
    let mut kept = Vec::new();

    for candidate in candidates {
        let bpm = match candidate.usable_tempo() {
            Some(bpm) => bpm,
            None => {
                debug!(candidate = %candidate.id, "Dropped: no usable tempo");
                stats.missing_tempo += 1;
                continue;
            }
        };

        if !within_tolerance(seed_bpm, bpm, tolerance) {
            debug!(candidate = %candidate.id, bpm, seed_bpm, tolerance, "Dropped: outside tempo tolerance");
            stats.out_of_tolerance += 1;
            continue;
        }

        let inspection = gate.inspect(&candidate);
        if inspection.report.score < min_descriptor_score {
            debug!(
                candidate = %candidate.id,
                score = inspection.report.score,
                min_descriptor_score,
                "Dropped: descriptor quality"
            );
            stats.below_quality += 1;
            continue;
        }

        kept.push(FilteredCandidate {
            sanitized: inspection.sanitized,
            descriptor_score: inspection.report.score,
            original: candidate,
        });
    }

    stats.kept = kept.len();
    FilterOutcome { kept, stats }
}
