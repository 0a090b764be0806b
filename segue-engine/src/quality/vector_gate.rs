//! Vector Gate
//!
//! Structural checks on a single `FeatureVector`:
//! - **dimensionality** (0.30): exactly 12 values
//! - **finite** (0.30): no NaN/Infinity
//! - **range** (0.25): every value inside 0.0-1.0
//! - **distribution** (0.15): uniformly 0 or 1 scores 0.5; variance below
//!   0.002 is a warning only
//!
//! Pass threshold 0.8.

use super::{QualityGate, ValidationError, Validator, ValidatorOutcome};
use crate::features::{FeatureVector, DIMENSIONS};

/// Pass threshold of the vector gate
pub const VECTOR_GATE_THRESHOLD: f64 = 0.8;

const LOW_VARIANCE: f64 = 0.002;
const DEGENERATE_SCORE: f64 = 0.5;

/// Build the vector gate
pub fn vector_gate() -> QualityGate<FeatureVector> {
    QualityGate::new("vector", VECTOR_GATE_THRESHOLD)
        .with_validator(Box::new(Dimensionality))
        .with_validator(Box::new(FiniteValues))
        .with_validator(Box::new(ValueRange))
        .with_validator(Box::new(Distribution))
}

struct Dimensionality;

impl Validator<FeatureVector> for Dimensionality {
    fn name(&self) -> &str {
        "dimensionality"
    }

    fn weight(&self) -> f64 {
        0.30
    }

    fn validate(&self, vector: &FeatureVector) -> Result<ValidatorOutcome, ValidationError> {
        let len = vector.values().len();
        if len == 0 {
            return Err(ValidationError::UnusableInput("vector has no values".to_string()));
        }
        if len == DIMENSIONS {
            Ok(ValidatorOutcome::new(1.0))
        } else {
            Ok(ValidatorOutcome::new(0.0)
                .with_issue(format!("Vector has {} dimensions, expected {}", len, DIMENSIONS)))
        }
    }
}

struct FiniteValues;

impl Validator<FeatureVector> for FiniteValues {
    fn name(&self) -> &str {
        "finite"
    }

    fn weight(&self) -> f64 {
        0.30
    }

    fn validate(&self, vector: &FeatureVector) -> Result<ValidatorOutcome, ValidationError> {
        let values = vector.values();
        if values.is_empty() {
            return Ok(ValidatorOutcome::new(0.0));
        }

        let bad: Vec<usize> = positions(values, |v| !v.is_finite());
        if bad.is_empty() {
            Ok(ValidatorOutcome::new(1.0))
        } else {
            Ok(ValidatorOutcome::new(0.0).with_issue(format!("Non-finite values at dimensions {:?}", bad)))
        }
    }
}

struct ValueRange;

impl Validator<FeatureVector> for ValueRange {
    fn name(&self) -> &str {
        "range"
    }

    fn weight(&self) -> f64 {
        0.25
    }

    fn validate(&self, vector: &FeatureVector) -> Result<ValidatorOutcome, ValidationError> {
        let values = vector.values();
        if values.is_empty() {
            return Ok(ValidatorOutcome::new(0.0));
        }

        let bad: Vec<usize> = positions(values, |v| !(0.0..=1.0).contains(&v));
        if bad.is_empty() {
            Ok(ValidatorOutcome::new(1.0))
        } else {
            Ok(ValidatorOutcome::new(0.0)
                .with_issue(format!("Values outside 0.0-1.0 at dimensions {:?}", bad)))
        }
    }
}

struct Distribution;

impl Validator<FeatureVector> for Distribution {
    fn name(&self) -> &str {
        "distribution"
    }

    fn weight(&self) -> f64 {
        0.15
    }

    fn validate(&self, vector: &FeatureVector) -> Result<ValidatorOutcome, ValidationError> {
        let finite: Vec<f64> = vector.values().iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Ok(ValidatorOutcome::new(0.0));
        }

        if vector.is_degenerate() {
            return Ok(ValidatorOutcome::new(DEGENERATE_SCORE)
                .with_warning("Vector is uniformly 0 or uniformly 1"));
        }

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let outcome = ValidatorOutcome::new(1.0);
        if variance < LOW_VARIANCE {
            Ok(outcome.with_warning(format!("Low variance across dimensions ({:.4})", variance)))
        } else {
            Ok(outcome)
        }
    }
}

fn positions(values: &[f64], predicate: impl Fn(f64) -> bool) -> Vec<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| predicate(**v))
        .map(|(i, _)| i)
        .collect()
}
