//! Descriptor Gate
//!
//! Plausibility checks on a raw `TrackDescriptor` (threshold 0.7):
//!
//! | Validator | Weight | Pass | Degraded |
//! |-----------|--------|------|----------|
//! | tempo     | 0.35   | 40-250 BPM → 1.0 | outside range 0.3, missing 0.0 |
//! | key       | 0.25   | recognized → 1.0 | unknown/missing 0.5, unrecognized 0.0 |
//! | energy    | 0.25   | inside 0.0-1.0 → 1.0 | missing 0.5, out of range 0.4, non-finite 0.0 |
//! | duration  | 0.15   | 30-1800 s → 1.0 | missing 0.7, implausible 0.2 |
//!
//! A failed check also yields a safe substitute through `sanitize`: an
//! unrecognized key becomes unknown, energy is clamped (non-finite becomes
//! missing), an implausible duration becomes missing. Tempo is never
//! substituted.

use super::{QualityGate, QualityReport, ValidationError, Validator, ValidatorOutcome};
use segue_common::key::MusicalKey;
use segue_common::TrackDescriptor;
use std::ops::RangeInclusive;
use tracing::debug;

/// Default pass threshold
pub const DESCRIPTOR_GATE_THRESHOLD: f64 = 0.7;

const PLAUSIBLE_TEMPO_BPM: RangeInclusive<f64> = 40.0..=250.0;
const PLAUSIBLE_DURATION_SECS: RangeInclusive<f64> = 30.0..=1800.0;

/// Report plus the sanitized descriptor for downstream use
#[derive(Debug, Clone)]
pub struct DescriptorInspection {
    pub report: QualityReport,
    pub sanitized: TrackDescriptor,
}

/// Descriptor plausibility gate
#[derive(Debug)]
pub struct DescriptorGate {
    gate: QualityGate<TrackDescriptor>,
}

impl DescriptorGate {
    pub fn new() -> Self {
        Self::with_threshold(DESCRIPTOR_GATE_THRESHOLD)
    }

    pub fn with_threshold(threshold: f64) -> Self {
        let gate = QualityGate::new("descriptor", threshold)
            .with_validator(Box::new(TempoCheck))
            .with_validator(Box::new(KeyCheck))
            .with_validator(Box::new(EnergyCheck))
            .with_validator(Box::new(DurationCheck));
        Self { gate }
    }

    pub fn threshold(&self) -> f64 {
        self.gate.threshold()
    }

    /// Run the gate
    pub fn check(&self, descriptor: &TrackDescriptor) -> QualityReport {
        self.gate.run(descriptor)
    }

    /// Run the gate and produce the sanitized descriptor
    pub fn inspect(&self, descriptor: &TrackDescriptor) -> DescriptorInspection {
        let report = self.check(descriptor);
        let sanitized = sanitize(descriptor);
        if sanitized != *descriptor {
            debug!(track = %descriptor.id, score = report.score, "Descriptor sanitized");
        }
        DescriptorInspection { report, sanitized }
    }
}

impl Default for DescriptorGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of `descriptor` with unusable optional fields replaced by safe defaults
pub fn sanitize(descriptor: &TrackDescriptor) -> TrackDescriptor {
    let mut sanitized = descriptor.clone();

    if sanitized.key.is_some() && descriptor.musical_key().is_none() {
        sanitized.key = None;
    }

    sanitized.energy = descriptor.finite_energy().map(|e| e.clamp(0.0, 1.0));

    sanitized.duration_secs = descriptor
        .duration_secs
        .filter(|d| PLAUSIBLE_DURATION_SECS.contains(d));

    sanitized
}

struct TempoCheck;

impl Validator<TrackDescriptor> for TempoCheck {
    fn name(&self) -> &str {
        "tempo"
    }

    fn weight(&self) -> f64 {
        0.35
    }

    fn validate(&self, d: &TrackDescriptor) -> Result<ValidatorOutcome, ValidationError> {
        Ok(match d.usable_tempo() {
            Some(bpm) if PLAUSIBLE_TEMPO_BPM.contains(&bpm) => ValidatorOutcome::new(1.0),
            Some(bpm) => ValidatorOutcome::new(0.3)
                .with_issue(format!("Track '{}': implausible tempo {:.1} BPM", d.id, bpm)),
            None => ValidatorOutcome::new(0.0).with_issue(format!("Track '{}': no usable tempo", d.id)),
        })
    }
}

struct KeyCheck;

impl Validator<TrackDescriptor> for KeyCheck {
    fn name(&self) -> &str {
        "key"
    }

    fn weight(&self) -> f64 {
        0.25
    }

    fn validate(&self, d: &TrackDescriptor) -> Result<ValidatorOutcome, ValidationError> {
        let label = match d.key.as_deref() {
            Some(label) => label,
            None => {
                return Ok(ValidatorOutcome::new(0.5).with_warning(format!("Track '{}': key missing", d.id)))
            }
        };

        Ok(match MusicalKey::parse(label) {
            Ok(Some(_)) => ValidatorOutcome::new(1.0),
            Ok(None) => ValidatorOutcome::new(0.5).with_warning(format!("Track '{}': key unknown", d.id)),
            Err(_) => ValidatorOutcome::new(0.0)
                .with_issue(format!("Track '{}': unrecognized key label '{}'", d.id, label)),
        })
    }
}

struct EnergyCheck;

impl Validator<TrackDescriptor> for EnergyCheck {
    fn name(&self) -> &str {
        "energy"
    }

    fn weight(&self) -> f64 {
        0.25
    }

    fn validate(&self, d: &TrackDescriptor) -> Result<ValidatorOutcome, ValidationError> {
        Ok(match d.energy {
            None => ValidatorOutcome::new(0.5).with_warning(format!("Track '{}': energy missing", d.id)),
            Some(e) if !e.is_finite() => {
                ValidatorOutcome::new(0.0).with_issue(format!("Track '{}': energy is not finite", d.id))
            }
            Some(e) if !(0.0..=1.0).contains(&e) => ValidatorOutcome::new(0.4)
                .with_issue(format!("Track '{}': energy {:.3} outside 0.0-1.0", d.id, e)),
            Some(_) => ValidatorOutcome::new(1.0),
        })
    }
}

struct DurationCheck;

impl Validator<TrackDescriptor> for DurationCheck {
    fn name(&self) -> &str {
        "duration"
    }

    fn weight(&self) -> f64 {
        0.15
    }

    fn validate(&self, d: &TrackDescriptor) -> Result<ValidatorOutcome, ValidationError> {
        Ok(match d.duration_secs {
            None => ValidatorOutcome::new(0.7),
            Some(secs) if PLAUSIBLE_DURATION_SECS.contains(&secs) => ValidatorOutcome::new(1.0),
            Some(secs) => ValidatorOutcome::new(0.2)
                .with_issue(format!("Track '{}': implausible duration {}s", d.id, secs)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> TrackDescriptor {
        TrackDescriptor::new("ok")
            .with_tempo(124.0)
            .with_key("8A")
            .with_energy(0.6)
            .with_genre("house")
            .with_duration(300.0)
    }

    #[test]
    fn test_complete_descriptor_scores_full() {
        let report = DescriptorGate::new().check(&complete());
        assert!((report.score - 1.0).abs() < 1e-12);
        assert!(report.passed);
        assert!(report.issues.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_missing_tempo_fails_gate() {
        let mut d = complete();
        d.tempo_bpm = None;
        let report = DescriptorGate::new().check(&d);
        assert!((report.score - 0.65).abs() < 1e-12);
        assert!(!report.passed);
    }

    #[test]
    fn test_tempo_only_descriptor_passes_default_threshold() {
        let d = TrackDescriptor::new("bare").with_tempo(128.0);
        let report = DescriptorGate::new().check(&d);
        assert!(report.passed, "score {}", report.score);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_unrecognized_key_is_issue_and_sanitized() {
        let d = complete().with_key("H sharp dorian");
        let inspection = DescriptorGate::new().inspect(&d);
        assert_eq!(inspection.report.validator_score("key"), Some(0.0));
        assert_eq!(inspection.report.issues.len(), 1);
        assert_eq!(inspection.sanitized.key, None);
    }

    #[test]
    fn test_energy_out_of_range_is_clamped() {
        let inspection = DescriptorGate::new().inspect(&complete().with_energy(1.4));
        assert_eq!(inspection.report.validator_score("energy"), Some(0.4));
        assert_eq!(inspection.sanitized.energy, Some(1.0));

        let inspection = DescriptorGate::new().inspect(&complete().with_energy(f64::NAN));
        assert_eq!(inspection.report.validator_score("energy"), Some(0.0));
        assert_eq!(inspection.sanitized.energy, None);
    }

    #[test]
    fn test_implausible_duration_removed() {
        let inspection = DescriptorGate::new().inspect(&complete().with_duration(5.0));
        assert_eq!(inspection.report.validator_score("duration"), Some(0.2));
        assert_eq!(inspection.sanitized.duration_secs, None);
    }

    #[test]
    fn test_sanitize_never_touches_tempo() {
        let d = complete().with_tempo(900.0);
        assert_eq!(sanitize(&d).tempo_bpm, Some(900.0));

        let mut missing = complete();
        missing.tempo_bpm = None;
        assert_eq!(sanitize(&missing).tempo_bpm, None);
    }

    #[test]
    fn test_sanitize_keeps_valid_descriptor() {
        assert_eq!(sanitize(&complete()), complete());
    }
}
