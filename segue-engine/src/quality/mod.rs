//! Quality Gate Framework
//!
//! A gate is a named set of weighted validators run over one input. Each
//! validator maps the input to a score in 0.0-1.0 plus issue and warning
//! strings; the gate combines them into a `QualityReport`.
//!
//! # Scoring
//! - score = Σ(weight × validator score) / Σ(weight)
//! - level: Excellent ≥ 0.9, Good ≥ 0.8, Fair ≥ 0.7, Poor ≥ 0.5, Failed otherwise
//! - passed = score ≥ gate threshold
//!
//! A validator returning `ValidationError` scores 0 and contributes an issue
//! naming the error. The remaining validators still run.
//!
//! # Gates
//! - **vector_gate**: structural checks on a single `FeatureVector` (threshold 0.8)
//! - **descriptor_gate**: plausibility checks on a `TrackDescriptor` (threshold 0.7)
//! - **playlist_gate**: final certification of an assembled playlist (threshold configurable)

pub mod descriptor_gate;
pub mod playlist_gate;
pub mod vector_gate;

pub use descriptor_gate::{sanitize, DescriptorGate, DescriptorInspection};
pub use playlist_gate::{playlist_gate, PlaylistDraft, PLAYLIST_GATE_WEIGHTS};
pub use vector_gate::{vector_gate, VECTOR_GATE_THRESHOLD};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Internal validator failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Input cannot be assessed at all
    #[error("Input cannot be validated: {0}")]
    UnusableInput(String),

    /// Validator bug or unexpected state
    #[error("Validator internal error: {0}")]
    Internal(String),
}

/// Output of one validator
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatorOutcome {
    pub score: f64,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidatorOutcome {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            ..Default::default()
        }
    }

    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issues.push(issue.into());
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// One weighted check of a gate
pub trait Validator<T: ?Sized>: Send + Sync {
    /// Stable name used in reports
    fn name(&self) -> &str;

    /// Relative weight (> 0)
    fn weight(&self) -> f64;

    /// Assess `data`
    fn validate(&self, data: &T) -> Result<ValidatorOutcome, ValidationError>;
}

/// Discrete quality level derived from the aggregate score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityLevel {
    Failed,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            QualityLevel::Excellent
        } else if score >= 0.8 {
            QualityLevel::Good
        } else if score >= 0.7 {
            QualityLevel::Fair
        } else if score >= 0.5 {
            QualityLevel::Poor
        } else {
            QualityLevel::Failed
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QualityLevel::Excellent => "Excellent",
            QualityLevel::Good => "Good",
            QualityLevel::Fair => "Fair",
            QualityLevel::Poor => "Poor",
            QualityLevel::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// Score of a single validator within a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorScore {
    pub name: String,
    pub weight: f64,
    pub score: f64,
}

/// Result of running a gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Gate name
    pub gate: String,
    /// Weighted mean of validator scores (0.0-1.0)
    pub score: f64,
    pub level: QualityLevel,
    /// `score >= threshold`
    pub passed: bool,
    pub threshold: f64,
    pub validator_scores: Vec<ValidatorScore>,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    /// Playlist contains fewer tracks than requested
    #[serde(default)]
    pub underfilled: bool,
}

impl QualityReport {
    /// Score recorded for `validator`, if it ran
    pub fn validator_score(&self, validator: &str) -> Option<f64> {
        self.validator_scores
            .iter()
            .find(|v| v.name == validator)
            .map(|v| v.score)
    }

    /// Flag the report as underfilled with an explanatory warning
    pub fn mark_underfilled(&mut self, selected: usize, requested: usize) {
        self.underfilled = true;
        self.warnings.push(format!(
            "Playlist underfilled: {} of {} requested tracks",
            selected, requested
        ));
    }
}

/// Named, weighted set of validators with a pass threshold
pub struct QualityGate<T: ?Sized> {
    name: String,
    threshold: f64,
    validators: Vec<Box<dyn Validator<T>>>,
}

impl<T: ?Sized> QualityGate<T> {
    pub fn new(name: impl Into<String>, threshold: f64) -> Self {
        Self {
            name: name.into(),
            threshold,
            validators: Vec::new(),
        }
    }

    pub fn with_validator(mut self, validator: Box<dyn Validator<T>>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// Run every validator and aggregate
    pub fn run(&self, data: &T) -> QualityReport {
        let mut validator_scores = Vec::with_capacity(self.validators.len());
        let mut issues = Vec::new();
        let mut warnings = Vec::new();
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;

        for validator in &self.validators {
            let weight = validator.weight().max(0.0);
            let score = match validator.validate(data) {
                Ok(outcome) => {
                    issues.extend(outcome.issues);
                    warnings.extend(outcome.warnings);
                    if outcome.score.is_finite() {
                        outcome.score.clamp(0.0, 1.0)
                    } else {
                        issues.push(format!("{}: produced a non-finite score", validator.name()));
                        0.0
                    }
                }
                Err(e) => {
                    warn!(gate = %self.name, validator = validator.name(), error = %e, "Validator failed");
                    issues.push(format!("{}: {}", validator.name(), e));
                    0.0
                }
            };

            weighted_sum += weight * score;
            total_weight += weight;
            validator_scores.push(ValidatorScore {
                name: validator.name().to_string(),
                weight,
                score,
            });
        }

        let score = if total_weight > 0.0 {
            (weighted_sum / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let passed = score >= self.threshold;

        debug!(
            gate = %self.name,
            score,
            threshold = self.threshold,
            passed,
            issues = issues.len(),
            warnings = warnings.len(),
            "Quality gate evaluated"
        );

        QualityReport {
            gate: self.name.clone(),
            score,
            level: QualityLevel::from_score(score),
            passed,
            threshold: self.threshold,
            validator_scores,
            issues,
            warnings,
            underfilled: false,
        }
    }
}

impl<T: ?Sized> fmt::Debug for QualityGate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QualityGate")
            .field("name", &self.name)
            .field("threshold", &self.threshold)
            .field(
                "validators",
                &self.validators.iter().map(|v| v.name().to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
