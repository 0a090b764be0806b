//! Dimension normalizers
//!
//! Pure functions mapping one raw descriptor value into 0.0-1.0. Out-of-range
//! numbers are clamped, missing or non-finite values map to a documented
//! neutral value. None of these functions can fail.
//!
//! # Derived heuristics
//! Each heuristic blends a genre-derived sub-score (`GenreProfile`) with one or
//! two of tempo, key mode and energy using fixed coefficients:
//!
//! | Dimension           | Blend                                                      |
//! |---------------------|------------------------------------------------------------|
//! | danceability        | 0.5·genre + 0.3·tempo_groove + 0.2·energy                  |
//! | valence             | 0.5·genre + 0.25·mode_brightness + 0.25·energy             |
//! | acousticness        | 0.7·genre + 0.3·(1 − energy)                               |
//! | instrumentalness    | 0.8·genre + 0.2·(1 − energy)                               |
//! | rhythmic complexity | 0.6·genre + 0.4·tempo                                      |
//! | spectral brightness | 0.6·genre + 0.4·energy (0.5/0.5 with a centroid hint)      |
//! | tempo stability     | 0.7·genre + 0.3·steady_band                                |
//! | harmonic complexity | 0.7·genre + 0.3·mode_complexity                            |
//! | dynamic range       | 0.7·genre + 0.3·(1 − energy) (0.6/0.4 with a loudness hint)|
//!
//! Coefficients are heuristic and tunable.

use super::genre_keywords::GenreProfile;
use segue_common::key::{Mode, MusicalKey};
use std::ops::RangeInclusive;

/// Value used for missing or unknown inputs
pub const NEUTRAL: f64 = 0.5;

/// Tempo range mapped linearly onto 0.0-1.0
pub const TEMPO_RANGE_BPM: RangeInclusive<f64> = 60.0..=200.0;

/// Tempo with maximum groove for danceability
const GROOVE_CENTER_BPM: f64 = 120.0;
/// Distance from the groove center at which groove reaches 0
const GROOVE_WIDTH_BPM: f64 = 60.0;

/// Tempo band considered steady for club mixing
const STEADY_BAND_BPM: RangeInclusive<f64> = 110.0..=135.0;
const STEADY_IN_BAND: f64 = 1.0;
const STEADY_OUT_OF_BAND: f64 = 0.6;

const LOUDNESS_RANGE_LUFS: RangeInclusive<f64> = -30.0..=-5.0;
const CENTROID_RANGE_HZ: RangeInclusive<f64> = 500.0..=8000.0;

/// Clamp into 0.0-1.0; non-finite input yields `NEUTRAL`
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        NEUTRAL
    }
}

/// Linear map of `range` onto 0.0-1.0 with clamping
///
/// Missing or non-finite values (and degenerate ranges) yield `NEUTRAL`.
pub fn normalize_range(value: Option<f64>, range: RangeInclusive<f64>) -> f64 {
    let (min, max) = (*range.start(), *range.end());
    match value {
        Some(v) if v.is_finite() && max > min => (v.clamp(min, max) - min) / (max - min),
        _ => NEUTRAL,
    }
}

/// Tempo: 60-200 BPM → 0.0-1.0
pub fn normalize_tempo(bpm: Option<f64>) -> f64 {
    normalize_range(bpm, TEMPO_RANGE_BPM)
}

/// Key: harmonic-wheel index / 24
///
/// Minor keys land in 0.0-0.5, major keys in 0.5-1.0. Unknown → `NEUTRAL`.
pub fn normalize_key(key: Option<MusicalKey>) -> f64 {
    match key {
        Some(key) => key.wheel_index() as f64 / 24.0,
        None => NEUTRAL,
    }
}

/// Energy: clamp only
pub fn normalize_energy(energy: Option<f64>) -> f64 {
    energy.map(clamp_unit).unwrap_or(NEUTRAL)
}

/// Raw inputs the derived heuristics blend with the genre profile
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicInputs {
    pub tempo_bpm: Option<f64>,
    pub mode: Option<Mode>,
    pub energy: Option<f64>,
    pub loudness_lufs: Option<f64>,
    pub spectral_centroid_hz: Option<f64>,
}

impl HeuristicInputs {
    fn energy(&self) -> f64 {
        normalize_energy(self.energy)
    }

    fn tempo(&self) -> f64 {
        normalize_tempo(self.tempo_bpm)
    }

    /// 1.0 at 120 BPM, falling linearly to 0.0 at ±60 BPM
    fn tempo_groove(&self) -> f64 {
        match self.tempo_bpm {
            Some(bpm) if bpm.is_finite() => {
                clamp_unit(1.0 - (bpm - GROOVE_CENTER_BPM).abs() / GROOVE_WIDTH_BPM)
            }
            _ => NEUTRAL,
        }
    }

    fn steady_band(&self) -> f64 {
        match self.tempo_bpm {
            Some(bpm) if STEADY_BAND_BPM.contains(&bpm) => STEADY_IN_BAND,
            Some(bpm) if bpm.is_finite() => STEADY_OUT_OF_BAND,
            _ => NEUTRAL,
        }
    }

    fn mode_brightness(&self) -> f64 {
        match self.mode {
            Some(Mode::Major) => 1.0,
            Some(Mode::Minor) => 0.3,
            None => NEUTRAL,
        }
    }

    fn mode_complexity(&self) -> f64 {
        match self.mode {
            Some(Mode::Minor) => 0.7,
            Some(Mode::Major) => 0.4,
            None => NEUTRAL,
        }
    }
}

pub fn danceability(genre: &GenreProfile, inputs: &HeuristicInputs) -> f64 {
    clamp_unit(0.5 * genre.danceability + 0.3 * inputs.tempo_groove() + 0.2 * inputs.energy())
}

pub fn valence(genre: &GenreProfile, inputs: &HeuristicInputs) -> f64 {
    clamp_unit(0.5 * genre.valence + 0.25 * inputs.mode_brightness() + 0.25 * inputs.energy())
}

pub fn acousticness(genre: &GenreProfile, inputs: &HeuristicInputs) -> f64 {
    clamp_unit(0.7 * genre.acousticness + 0.3 * (1.0 - inputs.energy()))
}

pub fn instrumentalness(genre: &GenreProfile, inputs: &HeuristicInputs) -> f64 {
    clamp_unit(0.8 * genre.instrumentalness + 0.2 * (1.0 - inputs.energy()))
}

pub fn rhythmic_complexity(genre: &GenreProfile, inputs: &HeuristicInputs) -> f64 {
    clamp_unit(0.6 * genre.rhythmic_complexity + 0.4 * inputs.tempo())
}

pub fn spectral_brightness(genre: &GenreProfile, inputs: &HeuristicInputs) -> f64 {
    match inputs.spectral_centroid_hz.filter(|hz| hz.is_finite()) {
        Some(hz) => clamp_unit(
            0.5 * genre.spectral_brightness + 0.5 * normalize_range(Some(hz), CENTROID_RANGE_HZ),
        ),
        None => clamp_unit(0.6 * genre.spectral_brightness + 0.4 * inputs.energy()),
    }
}

pub fn tempo_stability(genre: &GenreProfile, inputs: &HeuristicInputs) -> f64 {
    clamp_unit(0.7 * genre.tempo_stability + 0.3 * inputs.steady_band())
}

pub fn harmonic_complexity(genre: &GenreProfile, inputs: &HeuristicInputs) -> f64 {
    clamp_unit(0.7 * genre.harmonic_complexity + 0.3 * inputs.mode_complexity())
}

pub fn dynamic_range(genre: &GenreProfile, inputs: &HeuristicInputs) -> f64 {
    match inputs.loudness_lufs.filter(|l| l.is_finite()) {
        Some(lufs) => {
            let loudness = normalize_range(Some(lufs), LOUDNESS_RANGE_LUFS);
            clamp_unit(0.6 * genre.dynamic_range + 0.4 * (1.0 - loudness))
        }
        None => clamp_unit(0.7 * genre.dynamic_range + 0.3 * (1.0 - inputs.energy())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_linear_map_and_clamp() {
        assert_eq!(normalize_tempo(Some(60.0)), 0.0);
        assert_eq!(normalize_tempo(Some(200.0)), 1.0);
        assert!((normalize_tempo(Some(130.0)) - 0.5).abs() < 1e-12);
        assert_eq!(normalize_tempo(Some(20.0)), 0.0);
        assert_eq!(normalize_tempo(Some(400.0)), 1.0);
        assert_eq!(normalize_tempo(None), NEUTRAL);
        assert_eq!(normalize_tempo(Some(f64::NAN)), NEUTRAL);
    }

    #[test]
    fn test_key_halves() {
        let minor = MusicalKey::parse("Am").unwrap();
        let major = MusicalKey::parse("C").unwrap();
        let minor_value = normalize_key(minor);
        let major_value = normalize_key(major);
        assert!((0.0..0.5).contains(&minor_value));
        assert!((0.5..1.0).contains(&major_value));
        assert_eq!(normalize_key(None), NEUTRAL);
    }

    #[test]
    fn test_energy_clamp_only() {
        assert_eq!(normalize_energy(Some(0.7)), 0.7);
        assert_eq!(normalize_energy(Some(1.7)), 1.0);
        assert_eq!(normalize_energy(Some(-0.3)), 0.0);
        assert_eq!(normalize_energy(Some(f64::INFINITY)), NEUTRAL);
        assert_eq!(normalize_energy(None), NEUTRAL);
    }

    #[test]
    fn test_heuristics_stay_in_unit_range_for_extremes() {
        let profiles = [GenreProfile::uniform(0.0), GenreProfile::uniform(1.0), GenreProfile::NEUTRAL];
        let inputs = [
            HeuristicInputs::default(),
            HeuristicInputs {
                tempo_bpm: Some(1000.0),
                mode: Some(Mode::Major),
                energy: Some(5.0),
                loudness_lufs: Some(10.0),
                spectral_centroid_hz: Some(1e9),
            },
            HeuristicInputs {
                tempo_bpm: Some(-5.0),
                mode: Some(Mode::Minor),
                energy: Some(-5.0),
                loudness_lufs: Some(f64::NEG_INFINITY),
                spectral_centroid_hz: Some(f64::NAN),
            },
        ];

        for genre in &profiles {
            for input in &inputs {
                for value in [
                    danceability(genre, input),
                    valence(genre, input),
                    acousticness(genre, input),
                    instrumentalness(genre, input),
                    rhythmic_complexity(genre, input),
                    spectral_brightness(genre, input),
                    tempo_stability(genre, input),
                    harmonic_complexity(genre, input),
                    dynamic_range(genre, input),
                ] {
                    assert!(value.is_finite() && (0.0..=1.0).contains(&value));
                }
            }
        }
    }

    #[test]
    fn test_danceability_peaks_at_groove_center() {
        let genre = GenreProfile::NEUTRAL;
        let at_center = HeuristicInputs { tempo_bpm: Some(120.0), energy: Some(0.5), ..Default::default() };
        let slow = HeuristicInputs { tempo_bpm: Some(70.0), energy: Some(0.5), ..Default::default() };
        assert!(danceability(&genre, &at_center) > danceability(&genre, &slow));
    }

    #[test]
    fn test_major_mode_raises_valence() {
        let genre = GenreProfile::NEUTRAL;
        let major = HeuristicInputs { mode: Some(Mode::Major), ..Default::default() };
        let minor = HeuristicInputs { mode: Some(Mode::Minor), ..Default::default() };
        assert!(valence(&genre, &major) > valence(&genre, &minor));
    }
}
