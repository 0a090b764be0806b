//! Per-track audio descriptor
//!
//! `TrackDescriptor` is the boundary record produced by the external
//! audio-analysis / tag-reading collaborator. Every field except the
//! identifier is optional and untrusted: values may be missing, out of range,
//! or non-finite. Accessors on this type expose the *usable* view of each
//! field without mutating the record.

use crate::key::MusicalKey;
use serde::{Deserialize, Serialize};

/// Number of descriptor fields counted for data completeness
const COMPLETENESS_FIELDS: f64 = 5.0;

/// Raw per-track input
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Track identifier (opaque to the engine)
    pub id: String,
    /// Tempo in beats per minute
    #[serde(default)]
    pub tempo_bpm: Option<f64>,
    /// Key label (e.g. "Am", "8A", "unknown")
    #[serde(default)]
    pub key: Option<String>,
    /// Energy, advertised 0.0-1.0
    #[serde(default)]
    pub energy: Option<f64>,
    /// Free-text genre
    #[serde(default)]
    pub genre: Option<String>,
    /// Duration in seconds
    #[serde(default)]
    pub duration_secs: Option<f64>,
    /// Integrated loudness hint (LUFS)
    #[serde(default)]
    pub loudness_lufs: Option<f64>,
    /// Spectral centroid hint (Hz)
    #[serde(default)]
    pub spectral_centroid_hz: Option<f64>,
}

impl TrackDescriptor {
    /// Create an empty descriptor with the given identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_tempo(mut self, bpm: f64) -> Self {
        self.tempo_bpm = Some(bpm);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = Some(energy);
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_secs = Some(seconds);
        self
    }

    pub fn with_loudness(mut self, lufs: f64) -> Self {
        self.loudness_lufs = Some(lufs);
        self
    }

    pub fn with_spectral_centroid(mut self, hz: f64) -> Self {
        self.spectral_centroid_hz = Some(hz);
        self
    }

    /// Tempo if present, finite and positive
    pub fn usable_tempo(&self) -> Option<f64> {
        self.tempo_bpm.filter(|t| t.is_finite() && *t > 0.0)
    }

    /// Recognized key, `None` for missing, unknown or unrecognized labels
    pub fn musical_key(&self) -> Option<MusicalKey> {
        self.key
            .as_deref()
            .and_then(|label| MusicalKey::parse(label).ok().flatten())
    }

    /// Energy if present and finite (not clamped)
    pub fn finite_energy(&self) -> Option<f64> {
        self.energy.filter(|e| e.is_finite())
    }

    /// Trimmed, non-empty genre text
    pub fn genre_label(&self) -> Option<&str> {
        self.genre
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }

    /// Duration if present, finite and positive
    pub fn usable_duration(&self) -> Option<f64> {
        self.duration_secs.filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Fraction of core fields (tempo, key, energy, genre, duration) that are usable
    pub fn completeness(&self) -> f64 {
        let present = [
            self.usable_tempo().is_some(),
            self.musical_key().is_some(),
            self.finite_energy().is_some(),
            self.genre_label().is_some(),
            self.usable_duration().is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count();

        present as f64 / COMPLETENESS_FIELDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_tempo_rejects_non_finite_and_non_positive() {
        assert_eq!(TrackDescriptor::new("a").with_tempo(128.0).usable_tempo(), Some(128.0));
        assert_eq!(TrackDescriptor::new("a").with_tempo(f64::NAN).usable_tempo(), None);
        assert_eq!(TrackDescriptor::new("a").with_tempo(0.0).usable_tempo(), None);
        assert_eq!(TrackDescriptor::new("a").usable_tempo(), None);
    }

    #[test]
    fn test_completeness() {
        let full = TrackDescriptor::new("full")
            .with_tempo(120.0)
            .with_key("Am")
            .with_energy(0.7)
            .with_genre("house")
            .with_duration(300.0);
        assert_eq!(full.completeness(), 1.0);

        let partial = TrackDescriptor::new("partial")
            .with_tempo(120.0)
            .with_key("not a key")
            .with_genre("   ");
        assert!((partial.completeness() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let d: TrackDescriptor = serde_json::from_str(r#"{"id": "t1", "tempo_bpm": 124.0}"#).unwrap();
        assert_eq!(d.id, "t1");
        assert_eq!(d.tempo_bpm, Some(124.0));
        assert!(d.key.is_none());
    }
}
