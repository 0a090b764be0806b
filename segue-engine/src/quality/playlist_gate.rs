//! Playlist Gate
//!
//! Final certification of an assembled playlist. Consecutive-pair metrics run
//! from the seed into the first member, then along the members.
//!
//! # Validators
//! - **tempo_adherence** (0.30): per track `1 − 0.5·deviation/tolerance`
//!   inside tolerance, 0 outside (with an issue)
//! - **genre_flow** (0.25): mean genre-matrix compatibility of consecutive pairs
//! - **energy_smoothness** (0.25): mean `1 − |Δenergy|` of consecutive pairs;
//!   steps above 0.4 are recorded as issues
//! - **data_completeness** (0.10): mean member descriptor completeness
//! - **harmonic_transition** (0.10): mean harmonic-wheel compatibility of
//!   consecutive pairs
//!
//! A playlist without members has no pairs; pair metrics then score 1.0,
//! while tempo adherence and data completeness fail with an issue.

use super::{QualityGate, ValidationError, Validator, ValidatorOutcome};
use crate::compatibility::GenreCompatibilityMatrix;
use crate::features::normalize::normalize_energy;
use segue_common::key::harmonic_compatibility;
use segue_common::TrackDescriptor;
use std::sync::Arc;

/// Validator weights, in validator order
pub const PLAYLIST_GATE_WEIGHTS: [(&str, f64); 5] = [
    ("tempo_adherence", 0.30),
    ("genre_flow", 0.25),
    ("energy_smoothness", 0.25),
    ("data_completeness", 0.10),
    ("harmonic_transition", 0.10),
];

/// Largest adjacent energy step that is not reported
pub const MAX_ENERGY_STEP: f64 = 0.4;

const LOW_GENRE_PAIR: f64 = 0.3;

/// Playlist under certification
#[derive(Debug, Clone)]
pub struct PlaylistDraft {
    /// Tempo reference and opening track of the transition chain
    pub seed: TrackDescriptor,
    /// Ordered members, seed excluded
    pub tracks: Vec<TrackDescriptor>,
    pub tempo_tolerance: f64,
    pub genre_matrix: Arc<GenreCompatibilityMatrix>,
}

impl PlaylistDraft {
    fn pairs(&self) -> impl Iterator<Item = (&TrackDescriptor, &TrackDescriptor)> + '_ {
        std::iter::once(&self.seed)
            .chain(self.tracks.iter())
            .zip(self.tracks.iter())
    }

    fn pair_count(&self) -> usize {
        self.tracks.len()
    }
}

/// Build the playlist gate with the given certification threshold
pub fn playlist_gate(certification_threshold: f64) -> QualityGate<PlaylistDraft> {
    QualityGate::new("playlist", certification_threshold)
        .with_validator(Box::new(TempoAdherence))
        .with_validator(Box::new(GenreFlow))
        .with_validator(Box::new(EnergySmoothness))
        .with_validator(Box::new(DataCompleteness))
        .with_validator(Box::new(HarmonicTransition))
}

fn weight_of(name: &str) -> f64 {
    PLAYLIST_GATE_WEIGHTS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, w)| *w)
        .unwrap_or(0.0)
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        1.0
    } else {
        sum / count as f64
    }
}

struct TempoAdherence;

impl Validator<PlaylistDraft> for TempoAdherence {
    fn name(&self) -> &str {
        "tempo_adherence"
    }

    fn weight(&self) -> f64 {
        weight_of(self.name())
    }

    fn validate(&self, draft: &PlaylistDraft) -> Result<ValidatorOutcome, ValidationError> {
        let seed_bpm = draft
            .seed
            .usable_tempo()
            .ok_or_else(|| ValidationError::UnusableInput("seed has no usable tempo".to_string()))?;
        if draft.tracks.is_empty() {
            return Err(ValidationError::UnusableInput("playlist has no tracks".to_string()));
        }
        if draft.tempo_tolerance.is_nan() || draft.tempo_tolerance <= 0.0 {
            return Err(ValidationError::UnusableInput(format!(
                "tempo tolerance must be positive, got {}",
                draft.tempo_tolerance
            )));
        }

        let mut outcome = ValidatorOutcome::default();
        let mut sum = 0.0;
        for track in &draft.tracks {
            match track.usable_tempo() {
                Some(bpm) => {
                    let deviation = (bpm - seed_bpm).abs() / seed_bpm;
                    if deviation <= draft.tempo_tolerance {
                        sum += 1.0 - 0.5 * deviation / draft.tempo_tolerance;
                    } else {
                        outcome.issues.push(format!(
                            "Track '{}' at {:.1} BPM is outside tempo tolerance",
                            track.id, bpm
                        ));
                    }
                }
                None => outcome
                    .issues
                    .push(format!("Track '{}' has no usable tempo", track.id)),
            }
        }

        outcome.score = mean(sum, draft.tracks.len());
        Ok(outcome)
    }
}

struct GenreFlow;

impl Validator<PlaylistDraft> for GenreFlow {
    fn name(&self) -> &str {
        "genre_flow"
    }

    fn weight(&self) -> f64 {
        weight_of(self.name())
    }

    fn validate(&self, draft: &PlaylistDraft) -> Result<ValidatorOutcome, ValidationError> {
        let mut outcome = ValidatorOutcome::default();
        let mut sum = 0.0;

        for (a, b) in draft.pairs() {
            let compat = draft
                .genre_matrix
                .compatibility_opt(a.genre_label(), b.genre_label());
            if compat < LOW_GENRE_PAIR {
                outcome.warnings.push(format!(
                    "Genre clash between '{}' and '{}' ({:.2})",
                    a.id, b.id, compat
                ));
            }
            sum += compat;
        }

        outcome.score = mean(sum, draft.pair_count());
        Ok(outcome)
    }
}

struct EnergySmoothness;

impl Validator<PlaylistDraft> for EnergySmoothness {
    fn name(&self) -> &str {
        "energy_smoothness"
    }

    fn weight(&self) -> f64 {
        weight_of(self.name())
    }

    fn validate(&self, draft: &PlaylistDraft) -> Result<ValidatorOutcome, ValidationError> {
        let mut outcome = ValidatorOutcome::default();
        let mut sum = 0.0;

        for (a, b) in draft.pairs() {
            let step = (normalize_energy(a.finite_energy()) - normalize_energy(b.finite_energy())).abs();
            if step > MAX_ENERGY_STEP {
                outcome.issues.push(format!(
                    "Energy jump of {:.2} between '{}' and '{}'",
                    step, a.id, b.id
                ));
            }
            sum += 1.0 - step;
        }

        outcome.score = mean(sum, draft.pair_count());
        Ok(outcome)
    }
}

struct DataCompleteness;

impl Validator<PlaylistDraft> for DataCompleteness {
    fn name(&self) -> &str {
        "data_completeness"
    }

    fn weight(&self) -> f64 {
        weight_of(self.name())
    }

    fn validate(&self, draft: &PlaylistDraft) -> Result<ValidatorOutcome, ValidationError> {
        if draft.tracks.is_empty() {
            return Err(ValidationError::UnusableInput("playlist has no tracks".to_string()));
        }
        let sum: f64 = draft.tracks.iter().map(TrackDescriptor::completeness).sum();
        Ok(ValidatorOutcome::new(mean(sum, draft.tracks.len())))
    }
}

struct HarmonicTransition;

impl Validator<PlaylistDraft> for HarmonicTransition {
    fn name(&self) -> &str {
        "harmonic_transition"
    }

    fn weight(&self) -> f64 {
        weight_of(self.name())
    }

    fn validate(&self, draft: &PlaylistDraft) -> Result<ValidatorOutcome, ValidationError> {
        let sum: f64 = draft
            .pairs()
            .map(|(a, b)| harmonic_compatibility(a.musical_key(), b.musical_key()))
            .sum();
        Ok(ValidatorOutcome::new(mean(sum, draft.pair_count())))
    }
}
